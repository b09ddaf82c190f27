//! End-to-end mining run.
//!
//! Records are clustered, each cluster is projected onto the fields of
//! interest, candidate rewrites are generated per projection, and every
//! candidate is submitted to the oracle. Oracle calls may run on a bounded
//! worker pool; their answers are joined back in generation order and written
//! by a single writer, so the resulting map does not depend on the worker
//! count.

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::AggregationMap;
use crate::candidates::{CandidateSet, generate_pairs_with};
use crate::cluster::{Clusters, build_clusters};
use crate::config::PipelineConfig;
use crate::data::{ClusterKey, MinedExample, ProgramResult, Record};
use crate::errors::RewriteError;
use crate::oracle::{Oracle, OracleClient};
use crate::projection::project;
use crate::source::RecordSource;
use crate::types::FieldPosition;

/// Candidate rewrites generated for one (cluster, field) projection.
#[derive(Clone, Debug)]
pub struct FieldCandidates {
    /// Cluster the projection was taken from.
    pub cluster: ClusterKey,
    /// Column that was projected.
    pub field_position: FieldPosition,
    /// De-duplicated candidates in generation order.
    pub candidates: CandidateSet,
}

/// Counters describing one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Records read from the input.
    pub records: usize,
    /// Distinct clusters, including the missing-identifier cluster.
    pub clusters: usize,
    /// Clusters with at least two records.
    pub multi_record_clusters: usize,
    /// (cluster, field) projections examined.
    pub projections: usize,
    /// Candidate examples submitted to the oracle.
    pub candidates: usize,
    /// Examples that produced a program.
    pub learned: usize,
    /// Examples filed under the not-learned key.
    pub not_learned: usize,
    /// Oracle transport failures, counted per attempt.
    pub oracle_failures: usize,
    /// Oracle calls abandoned after the per-call timeout.
    pub oracle_timeouts: usize,
}

/// Output of one run: the aggregation map plus its counters.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Program key -> examples.
    pub aggregation: AggregationMap,
    /// Run counters.
    pub stats: RunStats,
}

/// Generate candidates for every multi-record cluster and field of interest.
///
/// Projections whose candidate set is empty are omitted. Order follows
/// cluster first-occurrence order, then `config.fields_of_interest` order.
pub fn collect_candidates(clusters: &Clusters<'_>, config: &PipelineConfig) -> Vec<FieldCandidates> {
    let mut collected = Vec::new();
    for cluster in clusters {
        if !cluster.has_peers() {
            continue;
        }
        debug!(
            "[rewrites:pipeline] processing identifier='{}' records={}",
            cluster.key(),
            cluster.len()
        );
        for projection in project(cluster, &config.fields_of_interest) {
            let candidates = generate_pairs_with(&projection.values, config.empty_values);
            if candidates.is_empty() {
                continue;
            }
            collected.push(FieldCandidates {
                cluster: cluster.key().clone(),
                field_position: projection.position,
                candidates,
            });
        }
    }
    collected
}

/// Flatten per-projection candidates into provenance-tagged examples.
pub fn flatten_candidates(field_candidates: Vec<FieldCandidates>) -> Vec<MinedExample> {
    field_candidates
        .into_iter()
        .flat_map(|group| {
            let FieldCandidates {
                cluster,
                field_position,
                candidates,
            } = group;
            candidates.into_iter().map(move |example| MinedExample {
                cluster: cluster.clone(),
                field_position,
                example,
            })
        })
        .collect()
}

/// Configured mining pipeline bound to one oracle.
pub struct Pipeline {
    config: PipelineConfig,
    client: OracleClient,
    pool: Option<ThreadPool>,
}

impl Pipeline {
    /// Validate `config` and bind it to `oracle`.
    pub fn new(config: PipelineConfig, oracle: Arc<dyn Oracle>) -> Result<Self, RewriteError> {
        config.validate()?;
        let pool = if config.workers > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.workers)
                .thread_name(|idx| format!("rewrites-oracle-{idx}"))
                .build()
                .map_err(|err| {
                    RewriteError::Configuration(format!("failed to start oracle workers: {err}"))
                })?;
            Some(pool)
        } else {
            None
        };
        let client = OracleClient::from_config(oracle, &config);
        Ok(Self {
            config,
            client,
            pool,
        })
    }

    /// Validated configuration this pipeline runs with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load every record from `source` and run.
    pub fn run_source(&self, source: &dyn RecordSource) -> Result<RunReport, RewriteError> {
        let records = source.records()?;
        info!(
            "[rewrites:pipeline] source='{}' records={}",
            source.id(),
            records.len()
        );
        Ok(self.run(&records))
    }

    /// Run over already loaded records.
    ///
    /// Oracle trouble never fails a run; affected examples are filed under
    /// the not-learned key.
    pub fn run(&self, records: &[Record]) -> RunReport {
        let started = Instant::now();
        let oracle_before = self.client.stats();

        let clusters = build_clusters(records, self.config.identifier_position);
        let multi_record_clusters = clusters.iter().filter(|c| c.has_peers()).count();
        let projections = multi_record_clusters * self.config.fields_of_interest.len();
        let examples = flatten_candidates(collect_candidates(&clusters, &self.config));
        debug!(
            "[rewrites:pipeline] clusters={} candidates={} oracle='{}' workers={}",
            clusters.len(),
            examples.len(),
            self.client.oracle_name(),
            self.config.workers
        );

        let results = self.learn_all(&examples);
        let learned = results
            .iter()
            .filter(|result| matches!(result, ProgramResult::Program(_)))
            .count();

        let mut aggregation = AggregationMap::new();
        aggregation.extend(results.into_iter().zip(examples));

        let oracle_after = self.client.stats();
        let stats = RunStats {
            records: records.len(),
            clusters: clusters.len(),
            multi_record_clusters,
            projections,
            candidates: aggregation.example_count(),
            learned,
            not_learned: aggregation.example_count() - learned,
            oracle_failures: oracle_after.failures - oracle_before.failures,
            oracle_timeouts: oracle_after.timeouts - oracle_before.timeouts,
        };
        info!(
            "[rewrites:pipeline] done records={} clusters={} candidates={} programs={} not_learned={} elapsed={:.2}s",
            stats.records,
            stats.clusters,
            stats.candidates,
            aggregation.group_count() - usize::from(!aggregation.not_learned().is_empty()),
            stats.not_learned,
            started.elapsed().as_secs_f64()
        );
        RunReport { aggregation, stats }
    }

    fn learn_all(&self, examples: &[MinedExample]) -> Vec<ProgramResult> {
        match &self.pool {
            Some(pool) => pool.install(|| {
                examples
                    .par_iter()
                    .map(|mined| self.client.learn(&mined.example))
                    .collect()
            }),
            None => examples
                .iter()
                .map(|mined| self.client.learn(&mined.example))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmptyValuePolicy;
    use crate::data::{CandidateExample, ProgramKey};
    use crate::oracle::FnOracle;

    fn length_oracle() -> Arc<dyn Oracle> {
        Arc::new(FnOracle::new(|source: &str, target: &str| {
            if source.is_empty() || target.is_empty() {
                Ok(ProgramResult::NotLearned)
            } else {
                Ok(ProgramResult::Program(format!(
                    "len {} -> {}",
                    source.len(),
                    target.len()
                )))
            }
        }))
    }

    fn records(raw: &[&[&str]]) -> Vec<Record> {
        raw.iter().map(|row| Record::new(row.iter().copied())).collect()
    }

    #[test]
    fn collect_candidates_skips_singletons_and_uniform_fields() {
        let input = records(&[
            &["1", "A", "x", "same"],
            &["2", "A", "y", "same"],
            &["3", "B", "z", "solo"],
        ]);
        let clusters = build_clusters(&input, 1);
        let config = PipelineConfig::new(1, [2, 3]);
        let collected = collect_candidates(&clusters, &config);
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].cluster, ClusterKey::Present("A".into()));
        assert_eq!(collected[0].field_position, 2);
        assert_eq!(collected[0].candidates.len(), 2);
    }

    #[test]
    fn run_files_every_candidate_once() {
        let input = records(&[
            &["1", "A", "ab", "Smith, J."],
            &["2", "A", "abc", "J. Smith"],
            &["3", "B", "", "Jones"],
            &["4", "B", "foo", "Jones"],
        ]);
        let pipeline =
            Pipeline::new(PipelineConfig::new(1, [2, 3]), length_oracle()).expect("pipeline");
        let report = pipeline.run(&input);
        assert_eq!(report.stats.records, 4);
        assert_eq!(report.stats.clusters, 2);
        assert_eq!(report.stats.projections, 4);
        assert_eq!(report.stats.candidates, 6);
        assert_eq!(report.aggregation.example_count(), 6);
        assert_eq!(report.stats.not_learned, 2);
        assert_eq!(report.stats.learned, 4);
        let not_learned: Vec<&CandidateExample> = report
            .aggregation
            .not_learned()
            .iter()
            .map(|mined| &mined.example)
            .collect();
        assert_eq!(
            not_learned,
            vec![
                &CandidateExample::new("", "foo"),
                &CandidateExample::new("foo", "")
            ]
        );
    }

    #[test]
    fn skip_policy_keeps_empty_pairs_away_from_the_oracle() {
        let input = records(&[&["1", "B", ""], &["2", "B", "foo"]]);
        let config = PipelineConfig::new(1, [2]).with_empty_values(EmptyValuePolicy::Skip);
        let pipeline = Pipeline::new(config, length_oracle()).expect("pipeline");
        let report = pipeline.run(&input);
        assert!(report.aggregation.is_empty());
        assert_eq!(report.stats.candidates, 0);
    }

    #[test]
    fn worker_pool_matches_sequential_run() {
        let mut rows = Vec::new();
        for cluster in 0..12 {
            for variant in 0..4 {
                rows.push(Record::new([
                    format!("{cluster}-{variant}"),
                    format!("id-{cluster}"),
                    "x".repeat(variant + 1),
                ]));
            }
        }
        let sequential = Pipeline::new(PipelineConfig::new(1, [2]), length_oracle())
            .expect("pipeline")
            .run(&rows);
        let parallel = Pipeline::new(PipelineConfig::new(1, [2]).with_workers(4), length_oracle())
            .expect("pipeline")
            .run(&rows);
        assert_eq!(sequential.aggregation, parallel.aggregation);
        assert_eq!(sequential.stats, parallel.stats);
        assert_eq!(
            sequential
                .aggregation
                .examples_for(&ProgramKey::Program("len 1 -> 2".into()))
                .len(),
            12
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PipelineConfig::new(1, Vec::<FieldPosition>::new());
        assert!(matches!(
            Pipeline::new(config, length_oracle()),
            Err(RewriteError::Configuration(_))
        ));
    }
}
