//! Record source interfaces.
//!
//! A source hands the pipeline every row of one table, in table order. How
//! the rows are stored or parsed stays behind the trait.

use crate::data::Record;
use crate::errors::RewriteError;
use crate::types::SourceId;

/// Delimited text file source.
pub mod delimited_file;

pub use delimited_file::{DelimitedFileSource, DelimitedSourceConfig};

/// Pipeline-facing record source.
///
/// For a fixed dataset, `records` should return the same rows in the same
/// order on every call.
pub trait RecordSource: Send + Sync {
    /// Stable source identifier used in logs and errors.
    fn id(&self) -> &str;
    /// Load every record in input order.
    fn records(&self) -> Result<Vec<Record>, RewriteError>;
}

/// Source serving a fixed list of records from memory.
#[derive(Clone, Debug)]
pub struct InMemorySource {
    id: SourceId,
    records: Vec<Record>,
}

impl InMemorySource {
    /// Create a source named `id` over `records`.
    pub fn new(id: impl Into<SourceId>, records: Vec<Record>) -> Self {
        Self {
            id: id.into(),
            records,
        }
    }

    /// Build a source from raw rows of string-like values.
    pub fn from_rows<R, S>(id: impl Into<SourceId>, rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(id, rows.into_iter().map(Record::new).collect())
    }
}

impl RecordSource for InMemorySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn records(&self) -> Result<Vec<Record>, RewriteError> {
        Ok(self.records.clone())
    }
}
