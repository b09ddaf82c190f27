//! Line-oriented JSON protocol over a child process.
//!
//! One process is spawned per example. The request is a single JSON line on
//! stdin, `{"source": "...", "target": "..."}`, and the learner answers with a
//! single JSON line on stdout, `{"program": "<text>"}` or `{"program": null}`.
//!
//! Under a deadline the learner is killed and reaped once the deadline
//! elapses, so a hung learner never outlives its call.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::constants::oracle::{CHILD_POLL_INTERVAL, COMMAND_ORACLE_PREFIX};
use crate::data::ProgramResult;
use crate::errors::RewriteError;
use crate::oracle::Oracle;
use crate::types::{OracleName, ProgramId};

/// Configuration for a process-backed oracle.
#[derive(Clone, Debug)]
pub struct CommandOracleConfig {
    /// Executable to spawn for each example.
    pub program: PathBuf,
    /// Arguments passed to every invocation.
    pub args: Vec<String>,
}

impl CommandOracleConfig {
    /// Create a config for `program` with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Replace the argument list.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Serialize)]
struct LearnRequest<'a> {
    source: &'a str,
    target: &'a str,
}

#[derive(Deserialize)]
struct LearnResponse {
    program: Option<ProgramId>,
}

/// Oracle that delegates each example to an external learner process.
pub struct CommandOracle {
    name: OracleName,
    config: CommandOracleConfig,
}

impl CommandOracle {
    /// Oracle named `command:<program>` that spawns `config` per example.
    pub fn new(config: CommandOracleConfig) -> Self {
        let name = format!("{}{}", COMMAND_ORACLE_PREFIX, config.program.display());
        Self { name, config }
    }

    fn unavailable(&self, reason: impl Into<String>) -> RewriteError {
        RewriteError::OracleUnavailable {
            oracle: self.name.clone(),
            reason: reason.into(),
        }
    }

    fn protocol(&self, details: impl Into<String>) -> RewriteError {
        RewriteError::OracleProtocol {
            oracle: self.name.clone(),
            details: details.into(),
        }
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn stop(child: &mut Child) {
    // Either call may fail if the child already exited; both are harmless then.
    let _ = child.kill();
    let _ = child.wait();
}

impl CommandOracle {
    fn run(
        &self,
        source: &str,
        target: &str,
        timeout: Option<Duration>,
    ) -> Result<ProgramResult, RewriteError> {
        let request = serde_json::to_string(&LearnRequest { source, target })
            .map_err(|err| self.protocol(format!("failed to encode request: {err}")))?;

        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| self.unavailable(format!("failed to spawn: {err}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(err) = writeln!(stdin, "{request}") {
                stop(&mut child);
                return Err(self.unavailable(format!("failed to write request: {err}")));
            }
        }

        let output = match timeout {
            None => child
                .wait_with_output()
                .map_err(|err| self.unavailable(format!("failed to read response: {err}")))?,
            Some(timeout) => self.wait_within(child, timeout)?,
        };
        self.parse(output)
    }

    fn wait_within(&self, mut child: Child, timeout: Duration) -> Result<Output, RewriteError> {
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);
        let deadline = Instant::now() + timeout;

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    stop(&mut child);
                    return Err(RewriteError::OracleTimeout {
                        oracle: self.name.clone(),
                        timeout_ms: timeout.as_millis(),
                    });
                }
                Ok(None) => thread::sleep(CHILD_POLL_INTERVAL),
                Err(err) => {
                    stop(&mut child);
                    return Err(self.unavailable(format!("failed to poll learner: {err}")));
                }
            }
        };

        let collect = |handle: Option<JoinHandle<Vec<u8>>>| {
            handle
                .map(|handle| handle.join().unwrap_or_default())
                .unwrap_or_default()
        };
        Ok(Output {
            status,
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }

    fn parse(&self, output: Output) -> Result<ProgramResult, RewriteError> {
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.unavailable(format!(
                "exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| self.protocol("empty response"))?;
        let response: LearnResponse = serde_json::from_str(line)
            .map_err(|err| self.protocol(format!("invalid response '{line}': {err}")))?;
        Ok(match response.program {
            Some(program) => ProgramResult::Program(program),
            None => ProgramResult::NotLearned,
        })
    }
}

impl Oracle for CommandOracle {
    fn name(&self) -> &str {
        &self.name
    }

    fn learn(&self, source: &str, target: &str) -> Result<ProgramResult, RewriteError> {
        self.run(source, target, None)
    }

    fn enforces_deadline(&self) -> bool {
        true
    }

    fn learn_within(
        &self,
        source: &str,
        target: &str,
        timeout: Duration,
    ) -> Result<ProgramResult, RewriteError> {
        self.run(source, target, Some(timeout))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str) -> CommandOracle {
        CommandOracle::new(CommandOracleConfig::new("sh").with_args(["-c", script]))
    }

    #[test]
    fn name_includes_program() {
        assert_eq!(shell("true").name(), "command:sh");
    }

    #[test]
    fn parses_program_response() {
        let oracle = shell(r#"cat > /dev/null; echo '{"program": "Upper(v)"}'"#);
        let result = oracle.learn("abc", "ABC").expect("response");
        assert_eq!(result, ProgramResult::Program("Upper(v)".into()));
    }

    #[test]
    fn null_program_is_not_learned() {
        let oracle = shell(r#"cat > /dev/null; echo '{"program": null}'"#);
        assert_eq!(
            oracle.learn("", "foo").expect("response"),
            ProgramResult::NotLearned
        );
    }

    #[test]
    fn request_is_a_single_json_line() {
        let oracle = shell(
            r#"read -r line; if [ "$line" = '{"source":"Smith, J.","target":"J. Smith"}' ]; then echo '{"program": "ok"}'; else echo '{"program": null}'; fi"#,
        );
        let result = oracle.learn("Smith, J.", "J. Smith").expect("response");
        assert_eq!(result, ProgramResult::Program("ok".into()));
    }

    #[test]
    fn non_zero_exit_is_unavailable() {
        let oracle = shell("cat > /dev/null; echo boom >&2; exit 3");
        let err = oracle.learn("a", "b").expect_err("failure");
        assert!(matches!(err, RewriteError::OracleUnavailable { .. }));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn garbage_output_is_a_protocol_error() {
        let oracle = shell("cat > /dev/null; echo not-json");
        let err = oracle.learn("a", "b").expect_err("failure");
        assert!(matches!(err, RewriteError::OracleProtocol { .. }));
    }

    #[test]
    fn missing_program_is_unavailable() {
        let oracle = CommandOracle::new(CommandOracleConfig::new(
            "/nonexistent/rewrites-learner-binary",
        ));
        let err = oracle.learn("a", "b").expect_err("failure");
        assert!(matches!(err, RewriteError::OracleUnavailable { .. }));
    }

    #[test]
    fn answers_within_deadline() {
        let oracle = shell(r#"cat > /dev/null; echo '{"program": "Upper(v)"}'"#);
        let result = oracle
            .learn_within("abc", "ABC", Duration::from_secs(10))
            .expect("response");
        assert_eq!(result, ProgramResult::Program("Upper(v)".into()));
    }

    #[test]
    fn failure_within_deadline_keeps_stderr() {
        let oracle = shell("cat > /dev/null; echo boom >&2; exit 3");
        let err = oracle
            .learn_within("a", "b", Duration::from_secs(10))
            .expect_err("failure");
        assert!(matches!(err, RewriteError::OracleUnavailable { .. }));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn hung_learner_is_killed_at_deadline() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pid_path = dir.path().join("learner.pid");
        let oracle = CommandOracle::new(CommandOracleConfig::new("sh").with_args([
            "-c",
            r#"echo $$ > "$1"; cat > /dev/null; exec sleep 30"#,
            "sh",
            pid_path.to_str().expect("utf-8 path"),
        ]));

        let started = Instant::now();
        let err = oracle
            .learn_within("a", "b", Duration::from_millis(200))
            .expect_err("timeout");
        assert!(matches!(err, RewriteError::OracleTimeout { timeout_ms: 200, .. }));
        assert!(started.elapsed() < Duration::from_secs(10));

        let pid = std::fs::read_to_string(&pid_path).expect("pid file");
        let alive = Command::new("kill")
            .args(["-0", pid.trim()])
            .stderr(Stdio::null())
            .status()
            .expect("kill -0");
        assert!(!alive.success(), "learner {} still running", pid.trim());
    }
}
