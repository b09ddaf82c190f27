//! Exact-identifier clustering of records.
//!
//! Clusters borrow the loaded records; nothing here copies or mutates a row.
//! Iteration order is the order in which each identifier first appears, and
//! records inside a cluster keep their input order.

use indexmap::IndexMap;

use crate::data::{ClusterKey, Record};
use crate::types::FieldPosition;

/// Records sharing one identifier, in input order.
#[derive(Clone, Debug)]
pub struct Cluster<'a> {
    key: ClusterKey,
    records: Vec<&'a Record>,
}

impl<'a> Cluster<'a> {
    /// Grouping key of this cluster.
    pub fn key(&self) -> &ClusterKey {
        &self.key
    }

    /// Member records in input order.
    pub fn records(&self) -> &[&'a Record] {
        &self.records
    }

    /// Number of member records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the cluster has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True if the cluster can yield candidate pairs at all.
    pub fn has_peers(&self) -> bool {
        self.records.len() >= 2
    }
}

/// All clusters of one input, keyed by identifier.
#[derive(Clone, Debug, Default)]
pub struct Clusters<'a> {
    by_key: IndexMap<ClusterKey, Cluster<'a>>,
}

impl<'a> Clusters<'a> {
    /// Cluster for `key`, if any record carried it.
    pub fn get(&self, key: &ClusterKey) -> Option<&Cluster<'a>> {
        self.by_key.get(key)
    }

    /// Clusters in first-occurrence order.
    pub fn iter(&self) -> impl Iterator<Item = &Cluster<'a>> {
        self.by_key.values()
    }

    /// Number of distinct identifiers (plus the missing-identifier cluster, if present).
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// True if no records were clustered.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Total records across all clusters.
    pub fn record_count(&self) -> usize {
        self.by_key.values().map(Cluster::len).sum()
    }
}

impl<'c, 'a> IntoIterator for &'c Clusters<'a> {
    type Item = &'c Cluster<'a>;
    type IntoIter = indexmap::map::Values<'c, ClusterKey, Cluster<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.by_key.values()
    }
}

/// Grouping key for `record` given the identifier column.
pub fn cluster_key(record: &Record, identifier_position: FieldPosition) -> ClusterKey {
    match record.field(identifier_position) {
        Some(identifier) => ClusterKey::Present(identifier.to_string()),
        None => ClusterKey::Missing,
    }
}

/// Group `records` by the exact value at `identifier_position`.
///
/// Every record lands in exactly one cluster. Rows shorter than the
/// identifier column are grouped under [`ClusterKey::Missing`].
pub fn build_clusters<'a, I>(records: I, identifier_position: FieldPosition) -> Clusters<'a>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut by_key: IndexMap<ClusterKey, Cluster<'a>> = IndexMap::new();
    for record in records {
        let key = cluster_key(record, identifier_position);
        by_key
            .entry(key)
            .or_insert_with_key(|key| Cluster {
                key: key.clone(),
                records: Vec::new(),
            })
            .records
            .push(record);
    }
    Clusters { by_key }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(raw: &[&[&str]]) -> Vec<Record> {
        raw.iter().map(|row| Record::new(row.iter().copied())).collect()
    }

    #[test]
    fn groups_by_exact_identifier_in_first_occurrence_order() {
        let records = rows(&[
            &["1", "B", "x"],
            &["2", "A", "y"],
            &["3", "B", "z"],
            &["4", "b", "w"],
        ]);
        let clusters = build_clusters(&records, 1);
        let keys: Vec<String> = clusters.iter().map(|c| c.key().to_string()).collect();
        assert_eq!(keys, vec!["B", "A", "b"]);
        let b = clusters
            .get(&ClusterKey::Present("B".into()))
            .expect("cluster B");
        let members: Vec<&str> = b.records().iter().filter_map(|r| r.field(0)).collect();
        assert_eq!(members, vec!["1", "3"]);
    }

    #[test]
    fn short_rows_go_to_the_missing_cluster() {
        let records = rows(&[&["1"], &["2", ""], &["3"]]);
        let clusters = build_clusters(&records, 1);
        assert_eq!(clusters.len(), 2);
        assert_eq!(
            clusters.get(&ClusterKey::Missing).map(Cluster::len),
            Some(2)
        );
        assert_eq!(
            clusters
                .get(&ClusterKey::Present(String::new()))
                .map(Cluster::len),
            Some(1)
        );
    }

    #[test]
    fn empty_input_has_no_clusters() {
        let records: Vec<Record> = Vec::new();
        let clusters = build_clusters(&records, 0);
        assert!(clusters.is_empty());
        assert_eq!(clusters.record_count(), 0);
    }

    #[test]
    fn singleton_cluster_has_no_peers() {
        let records = rows(&[&["1", "A"], &["2", "B"], &["3", "B"]]);
        let clusters = build_clusters(&records, 1);
        let peers: Vec<bool> = clusters.iter().map(Cluster::has_peers).collect();
        assert_eq!(peers, vec![false, true]);
        assert_eq!(clusters.record_count(), 3);
    }
}
