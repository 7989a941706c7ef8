// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line surface: `docharvest extract` and `docharvest display`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};
use docharvest_core::config::{DuplicatePolicy, HarvestConfig, OutputConfig};
use docharvest_core::error::{HarvestError, Result};
use docharvest_core::human_errors::humanize_error;
use docharvest_core::types::{ArtifactKind, SourceKey};
use docharvest_storage::{ArtifactFilter, open_storage_for_display};
use tracing::warn;

use crate::pipeline::{BatchReport, Pipeline};

#[derive(Debug, Parser)]
#[command(name = "docharvest", version)]
#[command(about = "Extract text, links, images, tables, and metadata from PDF, DOCX, and PPTX files")]
pub struct Cli {
    /// JSON configuration file; flags override its values.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract artifacts from documents and store them.
    Extract(ExtractArgs),
    /// Show stored artifacts.
    Display(DisplayArgs),
}

/// Destination selection shared by both subcommands.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Write to a directory tree.
    #[arg(long, value_name = "DIR", conflicts_with = "database")]
    pub output_dir: Option<PathBuf>,

    /// Write to a SQLite database file.
    #[arg(long, value_name = "FILE")]
    pub database: Option<PathBuf>,
}

impl OutputArgs {
    fn apply(&self, config: &mut HarvestConfig) {
        if let Some(base_dir) = &self.output_dir {
            config.output = OutputConfig::Filesystem {
                base_dir: base_dir.clone(),
            };
        } else if let Some(path) = &self.database {
            let on_duplicate = match &config.output {
                OutputConfig::Database { on_duplicate, .. } => *on_duplicate,
                OutputConfig::Filesystem { .. } => DuplicatePolicy::default(),
            };
            config.output = OutputConfig::Database {
                path: path.clone(),
                on_duplicate,
            };
        }
    }
}

#[derive(Debug, Args)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub output: OutputArgs,

    /// Keep earlier database rows when a file is extracted again.
    #[arg(long)]
    pub append: bool,

    /// Leave image-only PDF pages empty instead of running OCR.
    #[arg(long)]
    pub no_ocr: bool,

    /// Directory holding the OCR detection and recognition models.
    #[arg(long, value_name = "DIR")]
    pub ocr_models: Option<PathBuf>,

    /// Documents to process (.pdf, .docx, .ppt, .pptx).
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DisplayArgs {
    #[command(flatten)]
    pub output: OutputArgs,

    /// Only this source: a key such as `report_pdf`, or the file name.
    #[arg(long, value_name = "KEY")]
    pub source: Option<String>,

    /// Only this kind: text, link, image, table, or metadata.
    #[arg(long, value_name = "KIND")]
    pub kind: Option<ArtifactKind>,

    /// Print JSON instead of one line per artifact.
    #[arg(long)]
    pub json: bool,
}

/// Run a parsed command line.
pub fn run(cli: Cli) -> ExitCode {
    let outcome = load_config(&cli).and_then(|config| match cli.command {
        Command::Extract(args) => run_extract(config, args),
        Command::Display(args) => run_display(config, args),
    });
    match outcome {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<HarvestConfig> {
    match &cli.config {
        Some(path) => HarvestConfig::load(path),
        None => Ok(HarvestConfig::default()),
    }
}

fn report_error(err: &HarvestError) {
    let human = humanize_error(err);
    eprintln!("error [{}]: {}", human.kind, human.message);
    eprintln!("  hint: {}", human.suggestion);
}

fn run_extract(mut config: HarvestConfig, args: ExtractArgs) -> Result<ExitCode> {
    args.output.apply(&mut config);
    if args.append {
        match &mut config.output {
            OutputConfig::Database { on_duplicate, .. } => *on_duplicate = DuplicatePolicy::Append,
            OutputConfig::Filesystem { .. } => {
                warn!("--append only applies to database output; files are overwritten")
            }
        }
    }
    if args.no_ocr {
        config.ocr.enabled = false;
    }
    if let Some(dir) = args.ocr_models {
        config.ocr.model_dir = Some(dir);
    }

    let mut pipeline = Pipeline::from_config(&config)?;
    let report = pipeline.process_batch(&args.files);
    print_report(&report);

    Ok(if report.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_report(report: &BatchReport) {
    for file in &report.succeeded {
        let counts: Vec<String> = file
            .counts
            .iter()
            .map(|(kind, count)| format!("{kind} {count}"))
            .collect();
        println!(
            "ok      {} -> {} ({})",
            file.path.display(),
            file.source,
            counts.join(", ")
        );
        if let Some(previous) = &file.overwrote {
            println!("        note: replaced artifacts of {}", previous.display());
        }
    }
    for failure in &report.failed {
        eprintln!(
            "FAILED  {} [{}] {}",
            failure.path.display(),
            failure.kind,
            failure.error
        );
        eprintln!("        hint: {}", failure.suggestion);
    }
    println!(
        "run {}: {} succeeded, {} failed",
        report.run_id,
        report.succeeded.len(),
        report.failed.len()
    );
}

fn run_display(mut config: HarvestConfig, args: DisplayArgs) -> Result<ExitCode> {
    args.output.apply(&mut config);
    config.validate()?;
    let storage = open_storage_for_display(&config.output)?;

    let mut filter = ArtifactFilter::all();
    if let Some(source) = &args.source {
        filter = filter.source(SourceKey::new(source));
    }
    if let Some(kind) = args.kind {
        filter = filter.kind(kind);
    }
    let artifacts = storage.display(&filter)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&artifacts)?);
    } else if artifacts.is_empty() {
        println!("no stored artifacts match");
    } else {
        for artifact in &artifacts {
            let index = artifact
                .index
                .map(|index| index.to_string())
                .unwrap_or_else(|| "-".into());
            println!(
                "{}\t{}\t{}\t{}\t{}",
                artifact.source,
                artifact.kind(),
                index,
                artifact.location,
                artifact.body.summary()
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_extract_flags() {
        let cli = Cli::try_parse_from([
            "docharvest",
            "-v",
            "extract",
            "--database",
            "out.db",
            "--append",
            "--no-ocr",
            "a.pdf",
            "b.docx",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        let Command::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        assert!(args.append && args.no_ocr);
        assert_eq!(args.files.len(), 2);

        let mut config = HarvestConfig::default();
        args.output.apply(&mut config);
        assert_eq!(
            config.output,
            OutputConfig::Database {
                path: PathBuf::from("out.db"),
                on_duplicate: DuplicatePolicy::Replace,
            }
        );
    }

    #[test]
    fn output_modes_conflict() {
        let parsed = Cli::try_parse_from([
            "docharvest",
            "extract",
            "--output-dir",
            "out",
            "--database",
            "out.db",
            "a.pdf",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn extract_requires_files() {
        assert!(Cli::try_parse_from(["docharvest", "extract"]).is_err());
    }

    #[test]
    fn display_parses_kind_and_source() {
        let cli = Cli::try_parse_from([
            "docharvest",
            "display",
            "--source",
            "report.pdf",
            "--kind",
            "tables",
            "--json",
        ])
        .unwrap();
        let Command::Display(args) = cli.command else {
            panic!("expected display");
        };
        assert_eq!(args.kind, Some(ArtifactKind::Table));
        assert_eq!(SourceKey::new(args.source.as_deref().unwrap()).as_str(), "report_pdf");
        assert!(args.json);
    }

    #[test]
    fn extract_exit_status_reflects_failures() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let cli = Cli::try_parse_from([
            "docharvest".into(),
            "extract".into(),
            "--no-ocr".into(),
            "--output-dir".into(),
            out.clone().into_os_string(),
            dir.path().join("notes.txt").into_os_string(),
        ])
        .unwrap();
        assert_eq!(run(cli), ExitCode::FAILURE);
    }

    #[test]
    fn display_does_not_create_the_output_tree() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let cli = Cli::try_parse_from([
            "docharvest".into(),
            "display".into(),
            "--output-dir".into(),
            out.clone().into_os_string(),
        ])
        .unwrap();
        assert_eq!(run(cli), ExitCode::SUCCESS);
        assert!(!out.exists());
    }
}
