//! Command line: validate instance files, or run the JSON-Schema-Test-Suite layout.
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use json_conform::{ChainRetriever, DirectoryRetriever, Error, Options, Output, Schema};
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::{Value, json};

/// Remote prefix the official suite expects its `remotes/` directory under.
const SUITE_REMOTE_PREFIX: &str = "http://localhost:1234/";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// validate JSON documents against a JSON Schema (2020-12)
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// validate instance files against a schema
    Validate(ValidateCmd),
    /// run a JSON-Schema-Test-Suite directory and report the results
    Suite(SuiteCmd),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Parser, Debug)]
struct ValidateCmd {
    /// schema file
    #[arg(long, short)]
    schema: PathBuf,

    #[command(flatten)]
    input_settings: InputSettings,

    /// assert `format` instead of only annotating it
    #[arg(long)]
    assert_format: bool,

    /// assert one `format` name only (repeatable)
    #[arg(long = "format", value_name = "NAME")]
    formats: Vec<String>,

    /// serve URIs under PREFIX from DIR, as `PREFIX=DIR` (repeatable)
    #[arg(long, value_parser = parse_remote)]
    remote: Vec<(String, PathBuf)>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

#[derive(clap::Parser, Debug)]
struct SuiteCmd {
    /// directory of test-group files, e.g. JSON-Schema-Test-Suite/tests/draft2020-12
    #[arg(long)]
    dir: PathBuf,

    /// directory served as http://localhost:1234/ (defaults to <dir>/../../remotes)
    #[arg(long)]
    remotes: Option<PathBuf>,

    /// also run the `optional/` groups
    #[arg(long)]
    optional: bool,

    /// print every failing case
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Deserialize, Debug)]
struct SuiteGroup {
    description: String,
    schema: Value,
    tests: Vec<SuiteCase>,
}

#[derive(Deserialize, Debug)]
struct SuiteCase {
    description: String,
    data: Value,
    valid: bool,
}

#[derive(Default, Debug)]
struct Tally {
    passed: usize,
    failed: Vec<String>,
    limited: Vec<String>,
}

impl Tally {
    fn merge(mut self, other: Tally) -> Tally {
        self.passed += other.passed;
        self.failed.extend(other.failed);
        self.limited.extend(other.limited);
        self
    }
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    /// Every selected document, labelled by where it came from.
    fn load(&self) -> Result<Vec<(String, Value)>> {
        let mut out = Vec::new();
        for source_path in resolve_file_path_patterns(&self.input)? {
            let label = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {label}"))?;
            if self.ndjson {
                let lines = source.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());
                for (line_no, line) in lines {
                    let at = format!("{label}:{}", line_no + 1);
                    let value = serde_json::from_str(line)
                        .with_context(|| format!("failed to parse JSON line ({at})"))?;
                    out.push((at, self.select(value, &label)?));
                }
            } else {
                let value = serde_json::from_str(&source)
                    .with_context(|| format!("failed to parse JSON source file ({label})"))?;
                out.push((label.clone(), self.select(value, &label)?));
            }
        }
        Ok(out)
    }

    fn select(&self, value: Value, label: &str) -> Result<Value> {
        match self.json_pointer.as_deref() {
            None => Ok(value),
            Some(pointer) => value
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| anyhow!("JSON pointer {pointer} selects nothing in {label}")),
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<ExitCode> {
        match &self.cmd {
            Command::Validate(target) => target.run(),
            Command::Suite(target) => target.run(),
        }
    }
}

impl ValidateCmd {
    fn run(&self) -> Result<ExitCode> {
        let schema_source = std::fs::read_to_string(&self.schema)
            .with_context(|| format!("failed to read schema {}", self.schema.display()))?;
        let schema_value: Value = serde_json::from_str(&schema_source)
            .with_context(|| format!("failed to parse schema {}", self.schema.display()))?;

        let mut options = Options::new().with_format_assertion(self.assert_format);
        for name in &self.formats {
            options = options.with_format_asserted(name.as_str());
        }
        let schema_path = std::fs::canonicalize(&self.schema)?;
        if let Ok(base) = url::Url::from_file_path(&schema_path) {
            options = options.with_base_uri(base.as_str());
        }
        let mut retriever = ChainRetriever::new();
        if let Some(dir) = schema_path.parent() {
            if let Ok(prefix) = url::Url::from_directory_path(dir) {
                retriever = retriever.push(Arc::new(DirectoryRetriever::new(prefix.as_str(), dir)));
            }
        }
        for (prefix, dir) in &self.remote {
            retriever = retriever.push(Arc::new(DirectoryRetriever::new(prefix.as_str(), dir)));
        }
        let schema = options
            .with_retriever(Arc::new(retriever))
            .compile(&schema_value)
            .with_context(|| format!("failed to compile schema {}", self.schema.display()))?;

        let documents = self.input_settings.load()?;
        tracing::debug!(count = documents.len(), "validating documents");
        let results: Vec<(String, Output)> = documents
            .par_iter()
            .map(|(label, value)| (label.clone(), schema.validate_detailed(value)))
            .collect();
        let all_valid = results.iter().all(|(_, output)| output.valid);

        match self.output {
            OutputFormat::Json => {
                let report: Vec<Value> = results
                    .iter()
                    .map(|(label, output)| {
                        json!({"input": label, "valid": output.valid, "errors": output.errors})
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            OutputFormat::Text => {
                for (label, output) in &results {
                    if output.valid {
                        println!("{} {label}", "✔".green());
                        continue;
                    }
                    println!("{} {label}", "✘".red().bold());
                    for unit in &output.errors {
                        println!("    {}", unit.to_string().dimmed());
                    }
                }
            }
        }
        Ok(if all_valid { ExitCode::SUCCESS } else { ExitCode::FAILURE })
    }
}

impl SuiteCmd {
    fn run(&self) -> Result<ExitCode> {
        let remotes = match &self.remotes {
            Some(dir) => dir.clone(),
            None => self.dir.join("../../remotes"),
        };
        let mut patterns = vec![format!("{}/*.json", self.dir.display())];
        if self.optional {
            patterns.push(format!("{}/optional/**/*.json", self.dir.display()));
        }
        let files = resolve_file_path_patterns(&patterns)?;
        if files.is_empty() {
            bail!("no test files under {}", self.dir.display());
        }

        let tally = files
            .par_iter()
            .map(|path| run_suite_file(path, &remotes))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .fold(Tally::default(), Tally::merge);

        if self.verbose {
            for failure in &tally.failed {
                println!("{} {failure}", "FAIL".red().bold());
            }
            for limitation in &tally.limited {
                println!("{} {limitation}", "SKIP".yellow());
            }
        }
        println!(
            "{} passed, {} failed, {} not implemented",
            tally.passed.to_string().green(),
            tally.failed.len().to_string().red(),
            tally.limited.len().to_string().yellow(),
        );
        Ok(if tally.failed.is_empty() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
    }
}

fn run_suite_file(path: &Path, remotes: &Path) -> Result<Tally> {
    let label = path.to_string_lossy().to_string();
    let source = std::fs::read_to_string(path).with_context(|| format!("failed to read {label}"))?;
    let groups: Vec<SuiteGroup> =
        serde_json::from_str(&source).with_context(|| format!("{label} is not a test-suite file"))?;
    let options = Options::new()
        .with_format_assertion(label.contains("optional/format"))
        .with_retriever(Arc::new(DirectoryRetriever::new(SUITE_REMOTE_PREFIX, remotes)));

    let mut tally = Tally::default();
    for group in groups {
        let name = |case: &str| format!("{label} :: {} :: {case}", group.description);
        let schema = match Schema::compile_with(&group.schema, &options) {
            Ok(schema) => schema,
            Err(error @ Error::NotYetImplemented { .. }) => {
                tracing::debug!(group = %group.description, %error, "group skipped");
                tally.limited.extend(group.tests.iter().map(|case| name(&case.description)));
                continue;
            }
            Err(error) => {
                let failed = group
                    .tests
                    .iter()
                    .map(|case| format!("{} ({error})", name(&case.description)));
                tally.failed.extend(failed);
                continue;
            }
        };
        for case in &group.tests {
            if schema.is_valid(&case.data) == case.valid {
                tally.passed += 1;
            } else {
                let expected = case.valid;
                tally
                    .failed
                    .push(format!("{} (expected valid = {expected})", name(&case.description)));
            }
        }
    }
    Ok(tally)
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn parse_remote(raw: &str) -> Result<(String, PathBuf), String> {
    match raw.split_once('=') {
        Some((prefix, dir)) if !prefix.is_empty() && !dir.is_empty() => {
            Ok((prefix.to_string(), PathBuf::from(dir)))
        }
        _ => Err(format!("expected PREFIX=DIR, got `{raw}`")),
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();
    for raw in patterns {
        let pattern = raw.as_ref();
        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                matched_any = true;
                out.push(entry?);
            }
            if !matched_any {
                tracing::warn!(pattern, "glob pattern matched no files");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }
    out.sort();
    Ok(out)
}

// ------------------------------- Tests ------------------------------------ //
