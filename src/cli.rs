//! Minimal CLI: decode fields → (probe report | check)
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use json_decoded::Node;
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, info};

use crate::probe::{self, Expectation, FieldReport};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// decode selected fields of JSON/NDJSON documents and report, per field, whether it
/// was present, null, absent or failed (and why, and where)
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    /// log decode decisions (same as RUST_LOG=debug)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// decode every field and print one report line per field
    Probe(ProbeOut),
    /// decode every field and fail on the first field that did not decode
    Check(CheckOut),
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

    /// Expected field, as PATH:KIND[?] (e.g. `user.tags.0:string`, `age:integer?`)
    #[arg(long = "field", short = 'f', num_args = 1.., required = true)]
    fields: Vec<Expectation>,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(clap::Parser, Debug)]
struct ProbeOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,
}

/// One parsed input document.
#[derive(Debug)]
struct Document {
    /// `file` or, for NDJSON, `file:line`
    label: String,
    value: Value,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load(&self) -> anyhow::Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .context("failed to resolve input file paths")?;
        let mut documents = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file ({source_path_str})"))?;
            if self.ndjson {
                for (line_index, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let label = format!("{source_path_str}:{}", line_index + 1);
                    documents.push(self.document(label, line)?);
                }
            } else {
                documents.push(self.document(source_path_str, &source)?);
            }
        }
        info!(documents = documents.len(), "inputs loaded");
        Ok(documents)
    }

    fn document(&self, label: String, source: &str) -> anyhow::Result<Document> {
        let value = json_decoded::parse(source)
            .with_context(|| format!("failed to parse JSON source ({label})"))?;
        let value = match self.json_pointer.as_deref() {
            None => value,
            Some(pointer) => match value.pointer(pointer) {
                Some(selected) => selected.clone(),
                None => bail!("JSON pointer {pointer} selects nothing in {label}"),
            },
        };
        Ok(Document { label, value })
    }
}

impl Document {
    fn probe(&self, expectations: &[Expectation]) -> anyhow::Result<Vec<json_decoded::Tracked<Option<Value>>>> {
        debug!(document = %self.label, "probing");
        probe::probe_all(&Node::root(&self.value), expectations)
            .with_context(|| format!("failed to decode {}", self.label))
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Probe(target) => {
                let settings = &target.input_settings;
                let documents = settings.load()?;
                let reports = documents
                    .par_iter()
                    .map(|document| {
                        let fields = document.probe(&settings.fields)?;
                        Ok(fields.into_iter().map(|field| FieldReport::new(&document.label, field)).collect::<Vec<_>>())
                    })
                    .collect::<anyhow::Result<Vec<_>>>()?
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>();

                let report_src = match target.format {
                    ReportFormat::Json => serde_json::to_string_pretty(&reports)?,
                    ReportFormat::Text => reports.iter().map(FieldReport::render).collect::<Vec<_>>().join("\n"),
                };
                if let Some(out) = target.out.as_ref() {
                    if let Some(parent) = out.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(out, &report_src)
                        .with_context(|| format!("failed to write {}", out.display()))?;
                } else {
                    println!("{report_src}");
                }
            }
            Command::Check(target) => {
                let settings = &target.input_settings;
                let documents = settings.load()?;
                documents.par_iter().try_for_each(|document| {
                    let fields = document.probe(&settings.fields)?;
                    probe::check(&fields).with_context(|| format!("check failed for {}", document.label))?;
                    anyhow::Ok(())
                })?;
                println!("{} documents ok", documents.len());
            }
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched = glob::glob(pattern)?.collect::<Result<Vec<_>, _>>()?;
            if matched.is_empty() {
                bail!("glob pattern matched no files: {pattern}");
            }
            matched.sort();
            out.append(&mut matched);
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

// ------------------------------- Tests ------------------------------------ //
