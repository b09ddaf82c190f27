use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::cluster::MISSING_IDENTIFIER_LABEL;
use crate::constants::report::{EXAMPLE_ARROW, NOT_LEARNED_LABEL};

pub use crate::types::{FieldPosition, FieldValue, Identifier, ProgramId};

/// One row of the input table: an ordered list of field values.
///
/// Records are immutable once loaded; downstream stages only borrow them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<FieldValue>,
}

impl Record {
    /// Build a record from its field values in column order.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<FieldValue>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Value at `position`, or `None` when the row is shorter than that.
    pub fn field(&self, position: FieldPosition) -> Option<&str> {
        self.fields.get(position).map(String::as_str)
    }

    /// All field values in column order.
    pub fn fields(&self) -> &[FieldValue] {
        &self.fields
    }

    /// Number of fields in this row.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the row has no fields at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S: Into<FieldValue>> FromIterator<S> for Record {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Grouping key of a cluster.
///
/// Rows too short to hold the identifier column group under `Missing`, which
/// never collides with a real identifier (including the empty string).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterKey {
    /// Identifier text found at the identifier position.
    Present(Identifier),
    /// The record was too short to carry an identifier.
    Missing,
}

impl ClusterKey {
    /// Identifier text, or `None` for the missing-identifier cluster.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            ClusterKey::Present(identifier) => Some(identifier),
            ClusterKey::Missing => None,
        }
    }
}

impl fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterKey::Present(identifier) => f.write_str(identifier),
            ClusterKey::Missing => f.write_str(MISSING_IDENTIFIER_LABEL),
        }
    }
}

/// A directed rewrite example: `source` should become `target`.
///
/// Candidates produced by the pair generator always have `source != target`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateExample {
    /// Observed form to rewrite from.
    pub source: FieldValue,
    /// Observed form to rewrite into.
    pub target: FieldValue,
}

impl CandidateExample {
    /// Example rewriting `source` into `target`.
    pub fn new(source: impl Into<FieldValue>, target: impl Into<FieldValue>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// True if either side is the empty string.
    pub fn has_empty_side(&self) -> bool {
        self.source.is_empty() || self.target.is_empty()
    }
}

impl fmt::Display for CandidateExample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.source, EXAMPLE_ARROW, self.target)
    }
}

/// Outcome of asking an oracle to learn one example.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgramResult {
    /// The oracle produced a program; equal ids mean the same rule.
    Program(ProgramId),
    /// The oracle could not produce a program for this example.
    NotLearned,
}

/// Key of one aggregation group.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramKey {
    /// Group of examples explained by this program.
    Program(ProgramId),
    /// Group of examples no program was learned for.
    NotLearned,
}

impl ProgramKey {
    /// Program text, or `None` for the not-learned group.
    pub fn program(&self) -> Option<&str> {
        match self {
            ProgramKey::Program(id) => Some(id),
            ProgramKey::NotLearned => None,
        }
    }
}

impl From<ProgramResult> for ProgramKey {
    fn from(result: ProgramResult) -> Self {
        match result {
            ProgramResult::Program(id) => ProgramKey::Program(id),
            ProgramResult::NotLearned => ProgramKey::NotLearned,
        }
    }
}

impl fmt::Display for ProgramKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramKey::Program(id) => f.write_str(id),
            ProgramKey::NotLearned => f.write_str(NOT_LEARNED_LABEL),
        }
    }
}

/// A candidate example together with where it was observed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinedExample {
    /// Cluster the two values were observed in.
    pub cluster: ClusterKey,
    /// Column the two values were taken from.
    pub field_position: FieldPosition,
    /// The directed rewrite itself.
    pub example: CandidateExample,
}
