use std::time::Duration;

use crate::constants::cluster::{DEFAULT_FIELDS_OF_INTEREST, DEFAULT_IDENTIFIER_POSITION};
use crate::errors::RewriteError;
use crate::types::FieldPosition;

/// Controls whether candidate pairs with an empty side reach the oracle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EmptyValuePolicy {
    /// Empty values pair like any other value ("value present" -> "value absent").
    #[default]
    Include,
    /// Drop candidates whose source or target is the empty string.
    Skip,
}

/// Top-level pipeline configuration.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Column whose exact value groups records into clusters.
    pub identifier_position: FieldPosition,
    /// Columns mined for rewrites, in report order. May overlap the identifier.
    pub fields_of_interest: Vec<FieldPosition>,
    /// Treatment of candidate pairs with an empty side.
    pub empty_values: EmptyValuePolicy,
    /// Number of concurrent oracle calls (1 runs everything on the caller thread).
    pub workers: usize,
    /// Per-call oracle timeout; an elapsed call counts as not learned.
    pub oracle_timeout: Option<Duration>,
    /// Extra attempts after an oracle transport failure.
    pub oracle_retries: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            identifier_position: DEFAULT_IDENTIFIER_POSITION,
            fields_of_interest: DEFAULT_FIELDS_OF_INTEREST.to_vec(),
            empty_values: EmptyValuePolicy::Include,
            workers: 1,
            oracle_timeout: None,
            oracle_retries: 0,
        }
    }
}

impl PipelineConfig {
    /// Create a config for an identifier column and the fields to mine.
    pub fn new(
        identifier_position: FieldPosition,
        fields_of_interest: impl IntoIterator<Item = FieldPosition>,
    ) -> Self {
        Self {
            identifier_position,
            fields_of_interest: fields_of_interest.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Override the empty-value policy.
    pub fn with_empty_values(mut self, policy: EmptyValuePolicy) -> Self {
        self.empty_values = policy;
        self
    }

    /// Override the number of concurrent oracle calls.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set a per-call oracle timeout.
    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = Some(timeout);
        self
    }

    /// Set how many times a failed oracle transport is retried.
    pub fn with_oracle_retries(mut self, retries: usize) -> Self {
        self.oracle_retries = retries;
        self
    }

    /// Reject configurations the pipeline cannot run.
    pub fn validate(&self) -> Result<(), RewriteError> {
        if self.fields_of_interest.is_empty() {
            return Err(RewriteError::Configuration(
                "at least one field of interest is required".into(),
            ));
        }
        if self.workers == 0 {
            return Err(RewriteError::Configuration(
                "workers must be at least 1".into(),
            ));
        }
        if self.oracle_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(RewriteError::Configuration(
                "oracle timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
