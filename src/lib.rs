#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

/// Program-keyed accumulation of learned examples.
pub mod aggregate;
/// Command-line runner used by the `rewrites` binary.
pub mod app;
/// Candidate rewrite generation.
pub mod candidates;
/// Exact-identifier clustering.
pub mod cluster;
/// Pipeline configuration types.
pub mod config;
/// Centralized constants used across clustering, oracles, and reports.
pub mod constants;
/// Record, example, and program types.
pub mod data;
/// Learning-oracle interfaces and adapters.
pub mod oracle;
/// End-to-end mining runs.
pub mod pipeline;
/// Per-field projections of clusters.
pub mod projection;
/// Report rendering.
pub mod report;
/// Record source traits and built-in sources.
pub mod source;
/// Shared type aliases.
pub mod types;

mod errors;

pub use aggregate::AggregationMap;
pub use candidates::{CandidateSet, generate_pairs, generate_pairs_with};
pub use cluster::{Cluster, Clusters, build_clusters};
pub use config::{EmptyValuePolicy, PipelineConfig};
pub use data::{CandidateExample, ClusterKey, MinedExample, ProgramKey, ProgramResult, Record};
pub use errors::RewriteError;
pub use oracle::{CommandOracle, CommandOracleConfig, FnOracle, Oracle, OracleClient, OracleStats};
pub use pipeline::{FieldCandidates, Pipeline, RunReport, RunStats, collect_candidates};
pub use projection::{FieldProjection, project, project_field};
pub use report::ReportFormat;
pub use source::{DelimitedFileSource, DelimitedSourceConfig, InMemorySource, RecordSource};
pub use types::{FieldPosition, FieldValue, Identifier, OracleName, ProgramId, SourceId};
