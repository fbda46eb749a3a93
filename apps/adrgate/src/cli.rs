//! CLI argument parsing via `clap`.

use crate::config::Overrides;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "adrgate",
    version,
    about = "ADR enforcement gate for static-analysis results",
    long_about = "adrgate maps static-analysis findings (SARIF) onto Architectural Decision Records, uploads the resulting violations, and writes CI annotations.\n\nConfiguration precedence: CLI > adrgate.toml > defaults.",
    after_help = "Examples:\n  adrgate check --sarif reports/eslint.sarif --output annotations.json\n  adrgate check --sarif 'reports/*.sarif' --upload-url http://localhost:8000/api/upload\n  adrgate manifest --repo acme/web --format json\n  adrgate convert build/test-results/TEST-Arch.xml reports/arch.sarif",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current adrgate version.")]
    Version,
    /// Resolve findings against ADRs, upload, annotate
    #[command(
        about = "Run the enforcement pipeline",
        long_about = "Extract findings from SARIF documents, keep those governed by an ADR, upload them and write an annotation file. Findings without a governing ADR are counted, not reported as violations.",
        after_help = "Examples:\n  adrgate check --sarif eslint.sarif --sarif arch.sarif\n  adrgate check --manifest-url http://governance.local/manifest --format json"
    )]
    Check {
        #[arg(long, help = "Repository root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, help = "Repository name used for manifest lookup (default: root dir name)")]
        repo: Option<String>,
        #[arg(long = "sarif", value_name = "PATH|GLOB", help = "SARIF document or glob pattern; repeatable")]
        sarif: Vec<String>,
        #[arg(long, help = "Directory holding ADR markdown files (default: docs/adr)")]
        adr_dir: Option<String>,
        #[arg(long, help = "Fetch the manifest from this base URL instead of the local ADR directory")]
        manifest_url: Option<String>,
        #[arg(long, help = "Upload endpoint for resolved violations")]
        upload_url: Option<String>,
        #[arg(long, value_name = "FILE", help = "Write CI annotations to this file")]
        output: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        format: Option<String>,
        #[arg(long, help = "Manifest freshness: eager|lazy (default: lazy)")]
        freshness: Option<String>,
        #[arg(long, help = "Extraction worker count")]
        jobs: Option<usize>,
    },
    /// Print the manifest built from local ADRs
    #[command(
        about = "Print the repository manifest",
        long_about = "Scan the ADR directory and print the governance rules for a repository in manifest order."
    )]
    Manifest {
        #[arg(long, help = "Repository root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, help = "Repository name (default: root dir name)")]
        repo: Option<String>,
        #[arg(long, help = "Directory holding ADR markdown files (default: docs/adr)")]
        adr_dir: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        format: Option<String>,
    },
    /// Convert a JUnit XML report to SARIF
    #[command(
        about = "Convert JUnit XML to SARIF",
        long_about = "Turn failed architecture tests from a JUnit XML report into SARIF results of tool `archunit`."
    )]
    Convert {
        #[arg(help = "JUnit XML report")]
        input: String,
        #[arg(help = "SARIF file to write")]
        output: String,
    },
}

impl Commands {
    /// Flags that take part in config precedence. `None` for commands that
    /// do not read configuration.
    pub fn overrides(&self) -> Option<Overrides> {
        match self {
            Commands::Check {
                repo_root,
                repo,
                sarif,
                adr_dir,
                manifest_url,
                upload_url,
                output,
                format,
                freshness,
                jobs,
            } => Some(Overrides {
                repo_root: repo_root.clone(),
                repo: repo.clone(),
                adr_dir: adr_dir.clone(),
                manifest_url: manifest_url.clone(),
                upload_url: upload_url.clone(),
                inputs: sarif.clone(),
                format: format.clone(),
                annotations: output.clone(),
                freshness: freshness.clone(),
                jobs: *jobs,
            }),
            Commands::Manifest {
                repo_root,
                repo,
                adr_dir,
                format,
            } => Some(Overrides {
                repo_root: repo_root.clone(),
                repo: repo.clone(),
                adr_dir: adr_dir.clone(),
                format: format.clone(),
                ..Overrides::default()
            }),
            Commands::Version | Commands::Convert { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_flags_map_to_overrides() {
        let cli = Cli::parse_from([
            "adrgate",
            "check",
            "--sarif",
            "a.sarif",
            "--sarif",
            "reports/*.sarif",
            "--output",
            "annotations.json",
            "--format",
            "json",
            "--jobs",
            "2",
        ]);
        let o = cli.cmd.overrides().unwrap();
        assert_eq!(o.inputs, vec!["a.sarif".to_string(), "reports/*.sarif".to_string()]);
        assert_eq!(o.annotations.as_deref(), Some("annotations.json"));
        assert_eq!(o.format.as_deref(), Some("json"));
        assert_eq!(o.jobs, Some(2));
    }

    #[test]
    fn test_convert_takes_positionals() {
        let cli = Cli::parse_from(["adrgate", "convert", "in.xml", "out.sarif"]);
        assert!(cli.cmd.overrides().is_none());
        match cli.cmd {
            Commands::Convert { input, output } => {
                assert_eq!(input, "in.xml");
                assert_eq!(output, "out.sarif");
            }
            _ => panic!("expected convert"),
        }
    }
}
