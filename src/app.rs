//! Command-line runner.
//!
//! `run_cli` takes the argument list (without the binary name) so it can be
//! driven from tests as well as from `main`.

use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum, error::ErrorKind};

use crate::cluster::build_clusters;
use crate::config::{EmptyValuePolicy, PipelineConfig};
use crate::constants::cluster::{DEFAULT_FIELDS_OF_INTEREST, DEFAULT_IDENTIFIER_POSITION};
use crate::oracle::{CommandOracle, CommandOracleConfig};
use crate::pipeline::{Pipeline, collect_candidates};
use crate::errors::RewriteError;
use crate::report::{ReportFormat, create_report_file, write_candidates, write_ranked_report};
use crate::source::{DelimitedFileSource, DelimitedSourceConfig, RecordSource};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "rewrites",
    disable_help_subcommand = true,
    about = "Mine recurring field rewrite programs from records sharing an identifier",
    long_about = "Cluster rows of a delimited file by an identifier column, pair up differing values of the fields of interest inside each cluster, ask an external learner for a program per pair, and group pairs by the program they induced.",
    after_help = "The learner is spawned once per pair. It receives {\"source\": ..., \"target\": ...} as one JSON line on stdin and must answer {\"program\": \"...\"} or {\"program\": null} on stdout."
)]
struct RewritesCli {
    #[arg(value_name = "INPUT", help = "Delimited input file, one record per row")]
    input: PathBuf,
    #[arg(
        long = "identifier-position",
        default_value_t = DEFAULT_IDENTIFIER_POSITION,
        help = "Zero-based column holding the cluster identifier"
    )]
    identifier_position: usize,
    #[arg(
        long = "field",
        value_name = "POSITION",
        help = "Zero-based column to mine, repeat as needed in report order (default: 2 and 3)"
    )]
    fields: Vec<usize>,
    #[arg(
        long,
        default_value = "\t",
        value_parser = parse_delimiter,
        help = "Single-byte field delimiter"
    )]
    delimiter: u8,
    #[arg(long, help = "Treat double quotes as field quoting")]
    quoted: bool,
    #[arg(long = "skip-header", help = "Ignore the first row")]
    skip_header: bool,
    #[arg(
        long = "skip-empty",
        help = "Do not submit pairs where either value is empty"
    )]
    skip_empty: bool,
    #[arg(
        long = "oracle-command",
        value_name = "PROGRAM",
        required_unless_present = "candidates_only",
        help = "Learner executable spawned for each candidate pair"
    )]
    oracle_command: Option<PathBuf>,
    #[arg(
        long = "oracle-arg",
        value_name = "ARG",
        allow_hyphen_values = true,
        help = "Argument passed to the learner, repeat as needed"
    )]
    oracle_args: Vec<String>,
    #[arg(
        long,
        default_value_t = 1,
        value_parser = parse_positive_usize,
        help = "Number of concurrent learner calls"
    )]
    workers: usize,
    #[arg(
        long = "oracle-timeout-ms",
        value_name = "MS",
        value_parser = parse_positive_u64,
        help = "Per-call learner timeout; timed out pairs are reported as not learned"
    )]
    oracle_timeout_ms: Option<u64>,
    #[arg(
        long = "oracle-retries",
        default_value_t = 0,
        help = "Extra attempts after a learner transport failure"
    )]
    oracle_retries: usize,
    #[arg(long, value_enum, default_value = "text", help = "Report format")]
    format: FormatArg,
    #[arg(
        long,
        value_name = "PATH",
        help = "Write the report to PATH instead of stdout"
    )]
    output: Option<PathBuf>,
    #[arg(
        long = "min-examples",
        value_name = "N",
        value_parser = parse_positive_usize,
        conflicts_with = "candidates_only",
        help = "Append a ranking of programs explaining at least N pairs"
    )]
    min_examples: Option<usize>,
    #[arg(
        long = "candidates-only",
        help = "List candidate pairs per cluster and field without calling the learner"
    )]
    candidates_only: bool,
}

impl RewritesCli {
    fn pipeline_config(&self) -> PipelineConfig {
        let fields = if self.fields.is_empty() {
            DEFAULT_FIELDS_OF_INTEREST.to_vec()
        } else {
            self.fields.clone()
        };
        let empty_values = if self.skip_empty {
            EmptyValuePolicy::Skip
        } else {
            EmptyValuePolicy::Include
        };
        let mut config = PipelineConfig::new(self.identifier_position, fields)
            .with_empty_values(empty_values)
            .with_workers(self.workers)
            .with_oracle_retries(self.oracle_retries);
        if let Some(ms) = self.oracle_timeout_ms {
            config = config.with_oracle_timeout(Duration::from_millis(ms));
        }
        config
    }

    fn source_config(&self) -> DelimitedSourceConfig {
        DelimitedSourceConfig::new(&self.input)
            .with_delimiter(self.delimiter)
            .with_quoting(self.quoted)
            .with_skip_header(self.skip_header)
    }
}

/// Parse `args_iter` and run a full mining pass (or a candidate listing).
pub fn run_cli<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();

    let Some(cli) =
        parse_cli::<RewritesCli, _>(std::iter::once("rewrites".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };

    let config = cli.pipeline_config();
    config.validate()?;
    let source = DelimitedFileSource::new(cli.source_config());

    if cli.candidates_only {
        let records = source.records()?;
        let clusters = build_clusters(&records, config.identifier_position);
        let listing = collect_candidates(&clusters, &config);
        let mut sink = open_sink(cli.output.as_deref())?;
        write_candidates(&listing, &mut sink)?;
        return Ok(());
    }

    let Some(program) = cli.oracle_command.clone() else {
        return Err("--oracle-command is required unless --candidates-only is set".into());
    };
    let oracle =
        CommandOracle::new(CommandOracleConfig::new(program).with_args(cli.oracle_args.clone()));
    let pipeline = Pipeline::new(config, Arc::new(oracle))?;
    let report = pipeline.run_source(&source)?;

    let mut sink = open_sink(cli.output.as_deref())?;
    write_ranked_report(
        &report,
        ReportFormat::from(cli.format),
        cli.min_examples,
        &mut sink,
    )?;
    if let Some(path) = &cli.output {
        eprintln!(
            "Wrote {} programs covering {} candidate pairs to {}",
            report.aggregation.group_count(),
            report.stats.candidates,
            path.display()
        );
    }
    Ok(())
}

fn open_sink(output: Option<&Path>) -> Result<Box<dyn Write>, RewriteError> {
    match output {
        Some(path) => Ok(Box::new(create_report_file(path)?)),
        None => Ok(Box::new(io::stdout().lock())),
    }
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

fn parse_delimiter(raw: &str) -> Result<u8, String> {
    let unescaped = match raw {
        "\\t" | "tab" => "\t",
        other => other,
    };
    match unescaped.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(format!(
            "invalid delimiter '{raw}': must be a single byte (use '\\t' or 'tab' for tabs)"
        )),
    }
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let value = raw
        .parse::<usize>()
        .map_err(|_| format!("invalid value '{raw}': must be a positive integer"))?;
    if value == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(value)
}

fn parse_positive_u64(raw: &str) -> Result<u64, String> {
    let value = raw
        .parse::<u64>()
        .map_err(|_| format!("invalid value '{raw}': must be a positive integer"))?;
    if value == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(value)
}
