//! Report output writer.
//!
//! Writes a report to stdout or a file, as text tables or pretty JSON.

use super::Report;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Serialize a report as pretty JSON. NaN means become `null`.
pub fn to_json_string(report: &Report) -> Result<String, OutputError> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write `report` to `output_path`, or stdout when no path is given.
///
/// # Errors
/// * `OutputError::InvalidPath` - path is empty, a directory, or its parent
///   cannot be created
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
pub fn write_report(
    report: &Report,
    format: OutputFormat,
    output_path: Option<&Path>,
) -> Result<(), OutputError> {
    let rendered = match format {
        OutputFormat::Text => report.to_string(),
        OutputFormat::Json => to_json_string(report)?,
    };

    let Some(output_path) = output_path else {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(rendered.as_bytes())?;
        if !rendered.ends_with('\n') {
            writeln!(handle)?;
        }
        return Ok(());
    };

    validate_output_path(output_path)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let mut writer = BufWriter::new(File::create(output_path)?);
    writer.write_all(rendered.as_bytes())?;
    writer.flush()?;

    info!(
        "Report written to {} ({} bytes)",
        output_path.display(),
        rendered.len()
    );
    Ok(())
}

fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }
    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::UsageSection;
    use crate::stats::FamilyMean;
    use tempfile::TempDir;

    fn report() -> Report {
        let mut report = Report::new("c24.csv", 3);
        let means = vec![FamilyMean {
            group: None,
            code: "GAIT".into(),
            mean: f64::NAN,
            count: 0,
        }];
        report.usage = Some(UsageSection::new("Usage", &means, &Default::default()));
        report
    }

    #[test]
    fn test_json_nan_is_null() {
        let json = to_json_string(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["respondents"], 3);
        assert!(value["usage"]["entries"][0]["mean"].is_null());
        assert!(value.get("gaps").is_none());
        assert!(value.get("comparison").is_none());
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out").join("report.json");

        write_report(&report(), OutputFormat::Json, Some(&path)).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"source\": \"c24.csv\""));
    }

    #[test]
    fn test_write_rejects_directory() {
        let temp = TempDir::new().unwrap();
        let err = write_report(&report(), OutputFormat::Text, Some(temp.path())).unwrap_err();
        assert!(matches!(err, OutputError::InvalidPath(_)));
    }
}
