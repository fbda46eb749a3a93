//! adrgate CLI binary entry point.
//! Delegates to the library for check/manifest/convert and prints results.

use adrgate::cli::{Cli, Commands};
use adrgate::config::{self, Effective};
use adrgate::error::{Error, Result};
use adrgate::extract::Extractor;
use adrgate::manifest::ManifestStore;
use adrgate::pipeline::{self, Pipeline};
use adrgate::transport::{HttpTransport, HttpUploader};
use adrgate::utils::{error_prefix, info_prefix, note_prefix};
use adrgate::{junit, output};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_env("ADRGATE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match run(cli.cmd) {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(kind = e.kind(), "command failed");
            eprintln!("{} {}", error_prefix(), e);
            e.exit_code()
        }
    };
    if code != 0 {
        std::process::exit(code);
    }
}

fn run(cmd: Commands) -> Result<i32> {
    let overrides = cmd.overrides().unwrap_or_default();
    match cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
        Commands::Convert { input, output } => {
            let count = junit::convert_file(Path::new(&input), Path::new(&output))?;
            println!("converted {} failing test(s) into {}", count, output);
            Ok(0)
        }
        Commands::Check { .. } => {
            let eff = config::resolve_effective(&overrides)?;
            announce_config(&eff);
            check(&eff)
        }
        Commands::Manifest { .. } => {
            let eff = config::resolve_effective(&overrides)?;
            announce_config(&eff);
            let store = ManifestStore::new();
            let report = store.rebuild(&eff.repo, &eff.adr_dir);
            if eff.format != "json" {
                for s in &report.skipped {
                    eprintln!(
                        "{} skipped {}: {}",
                        note_prefix(),
                        s.path.to_string_lossy(),
                        s.reason
                    );
                }
            }
            output::print_manifest(&store.snapshot(&eff.repo).to_document(&eff.repo), &eff.format);
            Ok(0)
        }
    }
}

fn announce_config(eff: &Effective) {
    if eff.format == "json" {
        return;
    }
    if eff.config_path.is_none() {
        eprintln!("{} No adrgate.toml found; using defaults.", note_prefix());
    }
}

fn check(eff: &Effective) -> Result<i32> {
    if eff.inputs.is_empty() {
        return Err(Error::Config {
            path: eff.repo_root.clone(),
            reason: "no SARIF inputs; pass --sarif or set `inputs`".to_string(),
        });
    }
    let documents = pipeline::expand_inputs(&eff.repo_root, &eff.inputs)?;
    if eff.format != "json" {
        eprintln!(
            "{} Checking {} document(s) for repo {}",
            info_prefix(),
            documents.len(),
            eff.repo
        );
    }

    let rules = pipeline::load_rules(eff, Arc::new(ManifestStore::new()))?;
    let base = eff
        .repo_root
        .canonicalize()
        .unwrap_or_else(|_| eff.repo_root.clone());

    let uploader = match &eff.upload_url {
        Some(url) => Some(HttpUploader::new(HttpTransport::new(eff.timeout)?, url.clone())),
        None => None,
    };
    let mut run = Pipeline::new(Extractor::with_base(base))
        .jobs(eff.jobs)
        .annotations(eff.annotations.clone());
    if let Some(u) = uploader.as_ref() {
        run = run.uploader(u);
    }

    let report = run.run(&documents, &rules)?;
    output::print_run(&report, &eff.format);
    Ok(report.exit_code())
}
