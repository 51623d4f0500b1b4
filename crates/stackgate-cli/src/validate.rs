//! # Validate Subcommand
//!
//! Pre-publish checks on a repository's stack template. Without explicit
//! paths the template and values files are discovered under `--root`.
//!
//! Every run leaves an errors log behind: one message per line, empty when
//! the template passed.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use stackgate_core::{EngineConfig, StackError, ValidationError};
use stackgate_engine::StackValidator;
use stackgate_schema::SchemaRegistry;

use crate::discover::{find_template, find_values, read_optional};

/// Errors log file name used when `--errors-log` is not given.
pub const DEFAULT_ERRORS_LOG: &str = "pre_publish_validate.errors.log";

pub const MISSING_TEMPLATE_MESSAGE: &str = "Template empty or not present.";
pub const PASSED_MESSAGE: &str = "Pre publish checks passed: you are good for a release.";
pub const FAILED_MESSAGE: &str = "Pre publish checks failed. Errors found:";

const OUTPUT_DELIMITER: &str = "STACKGATE_ERRORS_EOF";

/// Arguments for the validate subcommand.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Repository root searched for `.github/stacks/stack.yml`.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Stack template path. Skips discovery.
    #[arg(long)]
    pub stack: Option<PathBuf>,

    /// Values document path. Skips discovery.
    #[arg(long)]
    pub values: Option<PathBuf>,

    /// Where to write the errors log.
    #[arg(long, default_value = DEFAULT_ERRORS_LOG)]
    pub errors_log: PathBuf,

    /// Load `stack_schema-<version>.json` files from this directory instead
    /// of the bundled schemas.
    #[arg(long)]
    pub schema_dir: Option<PathBuf>,

    /// GitHub Actions step output file.
    #[arg(long, env = "GITHUB_OUTPUT", hide_env_values = true)]
    pub github_output: Option<PathBuf>,
}

/// Outcome of one validate run.
#[derive(Debug)]
pub enum Verdict {
    Passed,
    /// The template was validated and has findings.
    Failed(Vec<ValidationError>),
    /// The template could not be validated.
    Aborted(String),
}

impl Verdict {
    pub fn from_result(result: Result<Vec<ValidationError>, StackError>) -> Self {
        match result {
            Ok(errors) if errors.is_empty() => Self::Passed,
            Ok(errors) => Self::Failed(errors),
            Err(StackError::EmptyTemplate) => Self::Aborted(MISSING_TEMPLATE_MESSAGE.to_string()),
            Err(e) => Self::Aborted(e.to_string()),
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Passed => 0,
            Self::Failed(_) => 1,
            Self::Aborted(_) => 2,
        }
    }

    /// Errors log lines, in the order they were found.
    pub fn log_lines(&self) -> Vec<String> {
        match self {
            Self::Passed => Vec::new(),
            Self::Failed(errors) => errors.iter().map(|e| e.message.clone()).collect(),
            Self::Aborted(message) => vec![message.clone()],
        }
    }
}

/// Run the checks and write the errors log (and step outputs, when
/// configured).
///
/// Failures to set up validation (configuration, schema directory, reading
/// documents) are reported as [`Verdict::Aborted`], not as `Err`.
///
/// # Errors
///
/// Only if the errors log or step outputs cannot be written.
pub fn run_validate(args: &ValidateArgs) -> anyhow::Result<Verdict> {
    let verdict = check(args).unwrap_or_else(|e| Verdict::Aborted(format!("{e:#}")));

    write_errors_log(&args.errors_log, &verdict)?;
    if let Some(path) = &args.github_output {
        write_step_outputs(path, &verdict)?;
    }

    tracing::info!(
        passed = verdict.passed(),
        errors = verdict.log_lines().len(),
        errors_log = %args.errors_log.display(),
        "pre publish checks finished"
    );
    Ok(verdict)
}

fn check(args: &ValidateArgs) -> anyhow::Result<Verdict> {
    let config = EngineConfig::from_env().context("loading configuration from environment")?;
    let registry = match &args.schema_dir {
        Some(dir) => SchemaRegistry::from_dir(dir)
            .with_context(|| format!("loading schemas from {}", dir.display()))?,
        None => SchemaRegistry::bundled().context("loading bundled schemas")?,
    };
    let validator = StackValidator::new(Arc::new(registry), config)?;
    tracing::debug!(
        schema_versions = ?validator.registry().versions(),
        default_version = %validator.config().default_schema_version,
        strict_render = validator.config().strict_render,
        "validator ready"
    );

    let template_path = args.stack.clone().or_else(|| find_template(&args.root));
    let values_path = args.values.clone().or_else(|| find_values(&args.root));
    tracing::debug!(template = ?template_path, values = ?values_path, "stack documents located");

    let template = template_path.as_deref().map(read_optional).transpose()?.flatten();
    let values = values_path.as_deref().map(read_optional).transpose()?.flatten();

    Ok(Verdict::from_result(
        validator.validate(template.as_deref(), values.as_deref()),
    ))
}

/// Write one message per line to `path`; an empty file for a pass.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_errors_log(path: &Path, verdict: &Verdict) -> anyhow::Result<()> {
    let mut contents = verdict.log_lines().join("\n");
    if !contents.is_empty() {
        contents.push('\n');
    }
    std::fs::write(path, contents)
        .with_context(|| format!("cannot write errors log {}", path.display()))
}

/// Append `success` and `errors` outputs to a GitHub Actions output file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or appended to.
pub fn write_step_outputs(path: &Path, verdict: &Verdict) -> anyhow::Result<()> {
    let mut block = format!("success={}\nerrors<<{OUTPUT_DELIMITER}\n", verdict.passed());
    for line in verdict.log_lines() {
        block.push_str(&line);
        block.push('\n');
    }
    block.push_str(OUTPUT_DELIMITER);
    block.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open step output file {}", path.display()))?;
    file.write_all(block.as_bytes())
        .with_context(|| format!("cannot write step output file {}", path.display()))
}

/// Console summary of `verdict`.
///
/// # Errors
///
/// Propagates write failures on `out`.
pub fn report(verdict: &Verdict, out: &mut impl Write) -> io::Result<()> {
    if verdict.passed() {
        return writeln!(out, "{PASSED_MESSAGE}");
    }
    writeln!(out, "{FAILED_MESSAGE}")?;
    for line in verdict.log_lines() {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackgate_core::ErrorKind;

    fn findings() -> Verdict {
        Verdict::Failed(vec![
            ValidationError::new(ErrorKind::UndefinedInputReference, "Undefined input referenced - a"),
            ValidationError::new(ErrorKind::DuplicateInput, "Input has multiple declarations - b"),
        ])
    }

    #[test]
    fn test_verdict_from_result() {
        assert!(Verdict::from_result(Ok(Vec::new())).passed());
        assert_eq!(findings().exit_code(), 1);

        let missing = Verdict::from_result(Err(StackError::EmptyTemplate));
        assert_eq!(missing.exit_code(), 2);
        assert_eq!(missing.log_lines(), vec![MISSING_TEMPLATE_MESSAGE]);

        let version = Verdict::from_result(Err(StackError::SchemaVersion {
            version: "9.9".to_string(),
        }));
        assert_eq!(version.log_lines(), vec!["invalid schema version '9.9'"]);
    }

    #[test]
    fn test_errors_log_one_per_line_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errors.log");
        write_errors_log(&path, &findings()).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Undefined input referenced - a\nInput has multiple declarations - b\n"
        );
    }

    #[test]
    fn test_errors_log_empty_on_pass_and_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errors.log");
        std::fs::write(&path, "stale\n").unwrap();
        write_errors_log(&path, &Verdict::Passed).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_step_outputs_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("github_output");
        std::fs::write(&path, "earlier=1\n").unwrap();
        write_step_outputs(&path, &findings()).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "earlier=1\nsuccess=false\nerrors<<STACKGATE_ERRORS_EOF\n\
             Undefined input referenced - a\nInput has multiple declarations - b\n\
             STACKGATE_ERRORS_EOF\n"
        );
    }

    #[test]
    fn test_step_outputs_on_pass() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("github_output");
        write_step_outputs(&path, &Verdict::Passed).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "success=true\nerrors<<STACKGATE_ERRORS_EOF\nSTACKGATE_ERRORS_EOF\n"
        );
    }

    #[test]
    fn test_report_lists_errors_after_header() {
        let mut out = Vec::new();
        report(&findings(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with(FAILED_MESSAGE));
        assert!(text.ends_with("Input has multiple declarations - b\n"));

        let mut out = Vec::new();
        report(&Verdict::Passed, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("{PASSED_MESSAGE}\n"));
    }

    #[test]
    fn test_run_with_explicit_paths() {
        let dir = tempfile::tempdir().unwrap();
        let stack = dir.path().join("stack.yml");
        std::fs::write(&stack, "name: ${{ inputs.ghost }}\n").unwrap();
        let args = ValidateArgs {
            root: dir.path().to_path_buf(),
            stack: Some(stack),
            values: None,
            errors_log: dir.path().join("errors.log"),
            schema_dir: None,
            github_output: None,
        };

        let verdict = run_validate(&args).unwrap();
        assert_eq!(verdict.exit_code(), 1);
        assert_eq!(
            std::fs::read_to_string(&args.errors_log).unwrap(),
            "Undefined input referenced - ghost\n"
        );
    }
}
