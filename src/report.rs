//! Rendering of aggregation maps and candidate listings.
//!
//! The text layout is one `Program:` line per group followed by one indented
//! `Transformation: <source> -> <target>` line per example. JSON output
//! carries the same groups plus run counters and provenance.
//!
//! Either format can carry a ranking of the programs that explain at least a
//! minimum number of examples.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::AggregationMap;
use crate::constants::report::{PROGRAM_PREFIX, RECURRING_HEADER, TRANSFORMATION_PREFIX};
use crate::data::MinedExample;
use crate::errors::RewriteError;
use crate::pipeline::{FieldCandidates, RunReport, RunStats};

/// Output format for run reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable program/transformation listing.
    #[default]
    Text,
    /// Pretty-printed JSON document.
    Json,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Utc>,
    stats: &'a RunStats,
    groups: Vec<JsonGroup<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recurring: Option<Vec<JsonRecurring<'a>>>,
}

#[derive(Serialize)]
struct JsonRecurring<'a> {
    program: &'a str,
    examples: usize,
}

#[derive(Serialize)]
struct JsonGroup<'a> {
    /// `None` for the not-learned group.
    program: Option<&'a str>,
    examples: &'a [MinedExample],
}

/// Write the text listing of `aggregation`.
pub fn write_text<W: Write>(aggregation: &AggregationMap, writer: &mut W) -> io::Result<()> {
    for (key, examples) in aggregation.groups() {
        writeln!(writer, "{PROGRAM_PREFIX}{key}")?;
        for mined in examples {
            writeln!(writer, "{TRANSFORMATION_PREFIX}{}", mined.example)?;
        }
    }
    Ok(())
}

/// Write the programs explaining at least `min_examples` examples, largest first.
pub fn write_recurring<W: Write>(
    aggregation: &AggregationMap,
    min_examples: usize,
    writer: &mut W,
) -> io::Result<()> {
    writeln!(writer, "{RECURRING_HEADER} (at least {min_examples} examples):")?;
    for (key, examples) in aggregation.recurring(min_examples) {
        writeln!(writer, "  {:>5}  {key}", examples.len())?;
    }
    Ok(())
}

/// Write `report` as a JSON document.
pub fn write_json<W: Write>(report: &RunReport, writer: &mut W) -> Result<(), RewriteError> {
    write_json_document(report, None, writer)
}

fn write_json_document<W: Write>(
    report: &RunReport,
    min_examples: Option<usize>,
    writer: &mut W,
) -> Result<(), RewriteError> {
    let recurring = min_examples.map(|min_examples| {
        report
            .aggregation
            .recurring(min_examples)
            .into_iter()
            .filter_map(|(key, examples)| {
                key.program().map(|program| JsonRecurring {
                    program,
                    examples: examples.len(),
                })
            })
            .collect()
    });
    let document = JsonReport {
        generated_at: Utc::now(),
        stats: &report.stats,
        groups: report
            .aggregation
            .groups()
            .map(|(key, examples)| JsonGroup {
                program: key.program(),
                examples,
            })
            .collect(),
        recurring,
    };
    serde_json::to_writer_pretty(&mut *writer, &document)
        .map_err(|err| RewriteError::Report(err.to_string()))?;
    writeln!(writer)?;
    Ok(())
}

/// Write `report` in `format`.
pub fn write_report<W: Write>(
    report: &RunReport,
    format: ReportFormat,
    writer: &mut W,
) -> Result<(), RewriteError> {
    write_ranked_report(report, format, None, writer)
}

/// Write `report` in `format`, followed by the ranking of programs explaining
/// at least `min_examples` examples when one is given.
pub fn write_ranked_report<W: Write>(
    report: &RunReport,
    format: ReportFormat,
    min_examples: Option<usize>,
    writer: &mut W,
) -> Result<(), RewriteError> {
    match format {
        ReportFormat::Text => {
            write_text(&report.aggregation, writer)?;
            if let Some(min_examples) = min_examples {
                write_recurring(&report.aggregation, min_examples, writer)?;
            }
        }
        ReportFormat::Json => write_json_document(report, min_examples, writer)?,
    }
    writer.flush()?;
    Ok(())
}

/// Create (or truncate) the report file at `path`.
pub fn create_report_file(path: &Path) -> Result<BufWriter<File>, RewriteError> {
    let file = File::create(path).map_err(|err| {
        RewriteError::Report(format!("failed to create {}: {err}", path.display()))
    })?;
    Ok(BufWriter::new(file))
}

/// Write `report` in `format` to a new file at `path`.
pub fn write_report_to_path(
    report: &RunReport,
    format: ReportFormat,
    path: &Path,
) -> Result<(), RewriteError> {
    let mut writer = create_report_file(path)?;
    write_report(report, format, &mut writer)
}

/// Write candidate rewrites grouped by cluster and field, without learning them.
pub fn write_candidates<W: Write>(
    field_candidates: &[FieldCandidates],
    writer: &mut W,
) -> io::Result<()> {
    for group in field_candidates {
        writeln!(
            writer,
            "Identifier: {} (field {})",
            group.cluster, group.field_position
        )?;
        for example in &group.candidates {
            writeln!(writer, "  {example}")?;
        }
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::generate_pairs;
    use crate::data::{CandidateExample, ClusterKey, ProgramResult};

    fn sample_report() -> RunReport {
        let mut aggregation = AggregationMap::new();
        aggregation.record(
            ProgramResult::Program("P1".into()),
            MinedExample {
                cluster: ClusterKey::Present("A".into()),
                field_position: 3,
                example: CandidateExample::new("Smith, J.", "J. Smith"),
            },
        );
        aggregation.record(
            ProgramResult::NotLearned,
            MinedExample {
                cluster: ClusterKey::Missing,
                field_position: 2,
                example: CandidateExample::new("", "foo"),
            },
        );
        RunReport {
            aggregation,
            stats: RunStats {
                candidates: 2,
                learned: 1,
                not_learned: 1,
                ..RunStats::default()
            },
        }
    }

    #[test]
    fn text_report_lists_programs_and_transformations() {
        let mut out = Vec::new();
        write_report(&sample_report(), ReportFormat::Text, &mut out).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(
            text,
            "Program: P1\n  Transformation: Smith, J. -> J. Smith\nProgram: <not learned>\n  Transformation:  -> foo\n"
        );
    }

    #[test]
    fn json_report_keeps_source_target_and_provenance() {
        let mut out = Vec::new();
        write_report(&sample_report(), ReportFormat::Json, &mut out).expect("write");
        let value: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert_eq!(value["stats"]["candidates"], 2);
        let groups = value["groups"].as_array().expect("groups");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0]["program"], "P1");
        assert_eq!(groups[0]["examples"][0]["example"]["source"], "Smith, J.");
        assert_eq!(groups[0]["examples"][0]["example"]["target"], "J. Smith");
        assert_eq!(groups[0]["examples"][0]["cluster"]["present"], "A");
        assert!(groups[1]["program"].is_null());
        assert_eq!(groups[1]["examples"][0]["cluster"], "missing");
    }

    #[test]
    fn candidate_listing_names_cluster_and_field() {
        let listing = vec![FieldCandidates {
            cluster: ClusterKey::Present("A".into()),
            field_position: 2,
            candidates: generate_pairs(&["x", "y"]),
        }];
        let mut out = Vec::new();
        write_candidates(&listing, &mut out).expect("write");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "Identifier: A (field 2)\n  x -> y\n  y -> x\n"
        );
    }

    fn ranked_report() -> RunReport {
        let mut report = sample_report();
        for (cluster, source) in [("B", "Doe, A."), ("C", "Roe, B.")] {
            report.aggregation.record(
                ProgramResult::Program("P2".into()),
                MinedExample {
                    cluster: ClusterKey::Present(cluster.into()),
                    field_position: 3,
                    example: CandidateExample::new(source, "x"),
                },
            );
        }
        report
    }

    #[test]
    fn recurring_section_ranks_programs_and_skips_not_learned() {
        let mut out = Vec::new();
        write_recurring(&ranked_report().aggregation, 1, &mut out).expect("write");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "Recurring programs (at least 1 examples):\n      2  P2\n      1  P1\n"
        );
    }

    #[test]
    fn ranked_text_report_appends_recurring_section() {
        let mut out = Vec::new();
        write_ranked_report(&ranked_report(), ReportFormat::Text, Some(2), &mut out)
            .expect("write");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.starts_with("Program: P1\n"));
        assert!(text.ends_with("Recurring programs (at least 2 examples):\n      2  P2\n"));
    }

    #[test]
    fn ranked_json_report_lists_recurring_programs() {
        let mut out = Vec::new();
        write_ranked_report(&ranked_report(), ReportFormat::Json, Some(2), &mut out)
            .expect("write");
        let value: serde_json::Value = serde_json::from_slice(&out).expect("json");
        let recurring = value["recurring"].as_array().expect("recurring");
        assert_eq!(recurring.len(), 1);
        assert_eq!(recurring[0]["program"], "P2");
        assert_eq!(recurring[0]["examples"], 2);
    }

    #[test]
    fn plain_json_report_has_no_ranking() {
        let mut out = Vec::new();
        write_report(&sample_report(), ReportFormat::Json, &mut out).expect("write");
        let value: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert!(value.get("recurring").is_none());
    }

    #[test]
    fn report_file_is_written() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("programs.txt");
        write_report_to_path(&sample_report(), ReportFormat::Text, &path).expect("write");
        let text = std::fs::read_to_string(&path).expect("read");
        assert!(text.starts_with("Program: P1\n"));
    }
}
