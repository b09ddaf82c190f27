use std::borrow::Cow;
use std::path::PathBuf;

use csv::{ByteRecord, ReaderBuilder};
use tracing::debug;

use crate::constants::source::DEFAULT_DELIMITER;
use crate::data::Record;
use crate::errors::RewriteError;
use crate::source::RecordSource;
use crate::types::SourceId;

/// Configuration for a delimited text file source.
#[derive(Clone, Debug)]
pub struct DelimitedSourceConfig {
    /// File to read.
    pub path: PathBuf,
    /// Single-byte field delimiter.
    pub delimiter: u8,
    /// Whether double quotes delimit fields. Off means every byte is taken verbatim.
    pub quoting: bool,
    /// Whether the first row is a header and should be ignored.
    pub skip_header: bool,
}

impl DelimitedSourceConfig {
    /// Tab-separated, unquoted, header-less file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: DEFAULT_DELIMITER,
            quoting: false,
            skip_header: false,
        }
    }

    /// Override the field delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Enable or disable quote handling.
    pub fn with_quoting(mut self, quoting: bool) -> Self {
        self.quoting = quoting;
        self
    }

    /// Enable or disable skipping the first row.
    pub fn with_skip_header(mut self, skip_header: bool) -> Self {
        self.skip_header = skip_header;
        self
    }
}

/// Source reading one record per row of a delimited file.
///
/// Rows may have different lengths; short rows are kept as-is and resolved
/// downstream. Bytes that are not valid UTF-8 are replaced rather than
/// rejected.
pub struct DelimitedFileSource {
    id: SourceId,
    config: DelimitedSourceConfig,
}

impl DelimitedFileSource {
    /// Source reading the file described by `config`.
    pub fn new(config: DelimitedSourceConfig) -> Self {
        let id = config.path.display().to_string();
        Self { id, config }
    }

    fn unavailable(&self, reason: impl Into<String>) -> RewriteError {
        RewriteError::SourceUnavailable {
            source_id: self.id.clone(),
            reason: reason.into(),
        }
    }
}

impl RecordSource for DelimitedFileSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn records(&self) -> Result<Vec<Record>, RewriteError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.config.delimiter)
            .quoting(self.config.quoting)
            .has_headers(self.config.skip_header)
            .flexible(true)
            .from_path(&self.config.path)
            .map_err(|err| self.unavailable(err.to_string()))?;

        let mut records: Vec<Record> = Vec::new();
        let mut row = ByteRecord::new();
        loop {
            let more = reader
                .read_byte_record(&mut row)
                .map_err(|err| self.unavailable(format!("row {}: {err}", records.len() + 1)))?;
            if !more {
                break;
            }
            records.push(row.iter().map(String::from_utf8_lossy).map(Cow::into_owned).collect());
        }
        debug!(
            "[rewrites:source] loaded source='{}' records={}",
            self.id,
            records.len()
        );
        Ok(records)
    }
}
