//! Per-field views over a cluster.

use crate::cluster::Cluster;
use crate::types::FieldPosition;

/// Values observed at one column across every record of a cluster.
///
/// `values.len()` always equals the cluster size; duplicates are kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldProjection<'a> {
    /// Column the values were read from.
    pub position: FieldPosition,
    /// One value per record, in record order (`""` where the row is short).
    pub values: Vec<&'a str>,
}

/// Project a single column of `cluster`.
pub fn project_field<'a>(cluster: &Cluster<'a>, position: FieldPosition) -> FieldProjection<'a> {
    let values = cluster
        .records()
        .iter()
        .map(|&record| record.field(position).unwrap_or(""))
        .collect();
    FieldProjection { position, values }
}

/// Project every requested column of `cluster`, in the order given.
pub fn project<'a>(
    cluster: &Cluster<'a>,
    field_positions: &[FieldPosition],
) -> Vec<FieldProjection<'a>> {
    field_positions
        .iter()
        .map(|&position| project_field(cluster, position))
        .collect()
}
