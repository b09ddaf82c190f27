//! Candidate rewrite generation.
//!
//! Every ordered pair of positions `(i, j)` with `i != j` contributes
//! `(values[i], values[j])` unless the two values are equal. The result is a
//! set ordered by first generation: two records showing the same rewrite
//! produce a single candidate, so the oracle is asked once.

use indexmap::IndexSet;

use crate::config::EmptyValuePolicy;
use crate::data::CandidateExample;

/// Ordered, de-duplicated candidate examples for one field projection.
pub type CandidateSet = IndexSet<CandidateExample>;

/// Generate every directed rewrite between unequal observed values.
pub fn generate_pairs<S: AsRef<str>>(values: &[S]) -> CandidateSet {
    generate_pairs_with(values, EmptyValuePolicy::Include)
}

/// Generate candidates, applying `policy` to pairs with an empty side.
pub fn generate_pairs_with<S: AsRef<str>>(values: &[S], policy: EmptyValuePolicy) -> CandidateSet {
    let mut pairs = CandidateSet::new();
    if values.len() < 2 {
        return pairs;
    }
    for (i, source) in values.iter().enumerate() {
        let source = source.as_ref();
        for (j, target) in values.iter().enumerate() {
            let target = target.as_ref();
            if i == j || source == target {
                continue;
            }
            if policy == EmptyValuePolicy::Skip && (source.is_empty() || target.is_empty()) {
                continue;
            }
            pairs.insert(CandidateExample::new(source, target));
        }
    }
    pairs
}
