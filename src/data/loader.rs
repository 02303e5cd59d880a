//! Survey CSV Loader Module
//! Handles survey table loading and schema listing using Polars.

use crate::data::SurveyTable;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Survey file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to load CSV {path}: {source}")]
    CsvError {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
    #[error("Survey file {0} has no columns")]
    NoColumns(PathBuf),
}

/// Loads one survey wave from disk with Polars.
pub struct SurveyLoader {
    infer_schema_length: usize,
}

impl Default for SurveyLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SurveyLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: 10_000,
        }
    }

    /// Rows scanned when inferring column types.
    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = rows.max(1);
        self
    }

    /// Load a CSV file into a [`SurveyTable`].
    ///
    /// Cells that fail to parse are read as missing rather than aborting the
    /// load; a file that cannot be read or parsed at all is fatal.
    pub fn load_csv(&self, file_path: &Path) -> Result<SurveyTable, LoaderError> {
        if !file_path.is_file() {
            return Err(LoaderError::NotFound(file_path.to_path_buf()));
        }

        debug!("Reading survey table from {}", file_path.display());
        let to_error = |source| LoaderError::CsvError {
            path: file_path.to_path_buf(),
            source,
        };

        let df = LazyCsvReader::new(file_path)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_ignore_errors(true)
            .finish()
            .map_err(to_error)?
            .collect()
            .map_err(to_error)?;

        if df.width() == 0 {
            return Err(LoaderError::NoColumns(file_path.to_path_buf()));
        }

        info!(
            "Loaded {} rows, {} columns from {}",
            df.height(),
            df.width(),
            file_path.display()
        );

        Ok(SurveyTable::new(df))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_csv_reads_columns_and_rows() {
        let file = write_csv("IMP_A,DS_A,ADIV\n4,2,S\n2,4,T\n");
        let table = SurveyLoader::new().load_csv(file.path()).unwrap();

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.columns(), vec!["IMP_A", "DS_A", "ADIV"]);
    }

    #[test]
    fn test_empty_cells_become_missing() {
        let file = write_csv("IMP_A,DS_A\n4,\n,3\n");
        let table = SurveyLoader::new().load_csv(file.path()).unwrap();

        assert_eq!(table.numeric("IMP_A").unwrap(), vec![Some(4.0), None]);
        assert_eq!(table.numeric("DS_A").unwrap(), vec![None, Some(3.0)]);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = SurveyLoader::new()
            .load_csv(Path::new("/definitely/not/here.csv"))
            .unwrap_err();
        assert!(matches!(err, LoaderError::NotFound(_)));
    }
}
