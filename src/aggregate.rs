//! Program-keyed accumulation of learned examples.

use indexmap::IndexMap;

use crate::data::{CandidateExample, MinedExample, ProgramKey, ProgramResult};

/// Program key -> examples that induced it.
///
/// Groups are kept in the order their key was first seen and examples inside
/// a group in the order they were recorded. Nothing is de-duplicated here;
/// every recorded example lands in exactly one group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AggregationMap {
    groups: IndexMap<ProgramKey, Vec<MinedExample>>,
}

impl AggregationMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// File `example` under the key derived from `result`.
    pub fn record(&mut self, result: ProgramResult, example: MinedExample) {
        self.groups
            .entry(ProgramKey::from(result))
            .or_default()
            .push(example);
    }

    /// Examples recorded under `key`, if any.
    pub fn get(&self, key: &ProgramKey) -> Option<&[MinedExample]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// Examples the oracle could not learn.
    pub fn not_learned(&self) -> &[MinedExample] {
        self.get(&ProgramKey::NotLearned).unwrap_or(&[])
    }

    /// Groups in first-occurrence order.
    pub fn groups(&self) -> impl Iterator<Item = (&ProgramKey, &[MinedExample])> {
        self.groups
            .iter()
            .map(|(key, examples)| (key, examples.as_slice()))
    }

    /// Bare `(source, target)` pairs of one group.
    pub fn examples_for(&self, key: &ProgramKey) -> Vec<&CandidateExample> {
        self.get(key)
            .map(|examples| examples.iter().map(|mined| &mined.example).collect())
            .unwrap_or_default()
    }

    /// Number of distinct program keys.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of examples across all groups.
    pub fn example_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// True if no example has been recorded.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups holding at least `min_examples` examples, largest first.
    ///
    /// Ties keep first-occurrence order. The not-learned group is excluded.
    pub fn recurring(&self, min_examples: usize) -> Vec<(&ProgramKey, &[MinedExample])> {
        let mut recurring: Vec<_> = self
            .groups()
            .filter(|(key, examples)| {
                **key != ProgramKey::NotLearned && examples.len() >= min_examples
            })
            .collect();
        recurring.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
        recurring
    }

    /// Append every group of `other`, keeping this map's key order first.
    pub fn merge(&mut self, other: AggregationMap) {
        for (key, examples) in other.groups {
            self.groups.entry(key).or_default().extend(examples);
        }
    }
}

impl FromIterator<(ProgramResult, MinedExample)> for AggregationMap {
    fn from_iter<I: IntoIterator<Item = (ProgramResult, MinedExample)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl Extend<(ProgramResult, MinedExample)> for AggregationMap {
    fn extend<I: IntoIterator<Item = (ProgramResult, MinedExample)>>(&mut self, iter: I) {
        for (result, example) in iter {
            self.record(result, example);
        }
    }
}
