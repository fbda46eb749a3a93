//! Configuration discovery and effective settings resolution.
//!
//! adrgate reads `adrgate.toml|yaml|yml` from the repository root (or closest
//! ancestor) and merges it with CLI flags to produce an `Effective` config.
//! Defaults:
//! - `repo`: name of the repository root directory
//! - `adr_dir`: `docs/adr`
//! - `format`: `human`
//! - `freshness`: `lazy`
//! - `timeout_secs`: 30
//!
//! Overrides precedence: CLI > config file > defaults.

use crate::error::{Error, Result};
use crate::manifest::Freshness;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ADR_DIR: &str = "docs/adr";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const CONFIG_FILES: [&str; 3] = ["adrgate.toml", "adrgate.yaml", "adrgate.yml"];

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `adrgate.toml|yaml`.
pub struct AdrgateConfig {
    pub repo: Option<String>,
    pub adr_dir: Option<String>,
    pub manifest_url: Option<String>,
    pub upload_url: Option<String>,
    #[serde(default)]
    pub inputs: Option<Vec<String>>,
    pub format: Option<String>,
    /// Annotation file written after a successful run.
    pub annotations: Option<String>,
    pub freshness: Option<String>,
    pub jobs: Option<usize>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Clone)]
/// Values supplied on the command line; `None` defers to the config file.
pub struct Overrides {
    pub repo_root: Option<String>,
    pub repo: Option<String>,
    pub adr_dir: Option<String>,
    pub manifest_url: Option<String>,
    pub upload_url: Option<String>,
    pub inputs: Vec<String>,
    pub format: Option<String>,
    pub annotations: Option<String>,
    pub freshness: Option<String>,
    pub jobs: Option<usize>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    pub repo: String,
    pub adr_dir: PathBuf,
    pub manifest_url: Option<String>,
    pub upload_url: Option<String>,
    pub inputs: Vec<String>,
    pub format: String,
    pub annotations: Option<PathBuf>,
    pub freshness: Freshness,
    pub jobs: Option<usize>,
    pub timeout: Duration,
    /// Config file that contributed, if any.
    pub config_path: Option<PathBuf>,
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when an `adrgate.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if CONFIG_FILES.iter().any(|f| cur.join(f).exists()) || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `AdrgateConfig` from the first config file present under `root`.
/// A file that exists but does not parse is an error.
pub fn load_config(root: &Path) -> Result<Option<(AdrgateConfig, PathBuf)>> {
    for name in CONFIG_FILES {
        let path = root.join(name);
        if !path.exists() {
            continue;
        }
        let s = fs::read_to_string(&path).map_err(|e| Error::Config {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let parsed = if name.ends_with(".toml") {
            toml::from_str::<AdrgateConfig>(&s).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str::<AdrgateConfig>(&s).map_err(|e| e.to_string())
        };
        return match parsed {
            Ok(cfg) => Ok(Some((cfg, path))),
            Err(reason) => Err(Error::Config { path, reason }),
        };
    }
    Ok(None)
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(cli: &Overrides) -> Result<Effective> {
    let start = PathBuf::from(cli.repo_root.as_deref().unwrap_or("."));
    let repo_root = detect_repo_root(&start);
    let (cfg, config_path) = match load_config(&repo_root)? {
        Some((cfg, path)) => (cfg, Some(path)),
        None => (AdrgateConfig::default(), None),
    };

    let repo = cli
        .repo
        .clone()
        .or(cfg.repo)
        .unwrap_or_else(|| default_repo_name(&repo_root));

    let adr_dir = cli
        .adr_dir
        .clone()
        .or(cfg.adr_dir)
        .unwrap_or_else(|| DEFAULT_ADR_DIR.to_string());

    let inputs = if cli.inputs.is_empty() {
        cfg.inputs.unwrap_or_default()
    } else {
        cli.inputs.clone()
    };

    let format = cli
        .format
        .clone()
        .or(cfg.format)
        .unwrap_or_else(|| "human".to_string());

    let freshness_src = cli.freshness.clone().or(cfg.freshness);
    let freshness = match freshness_src {
        Some(s) => s.parse::<Freshness>().map_err(|reason| Error::Config {
            path: config_path.clone().unwrap_or_else(|| repo_root.clone()),
            reason,
        })?,
        None => Freshness::default(),
    };

    let annotations = cli
        .annotations
        .clone()
        .or(cfg.annotations)
        .map(|p| anchor(&repo_root, &p));

    Ok(Effective {
        adr_dir: anchor(&repo_root, &adr_dir),
        repo,
        manifest_url: cli.manifest_url.clone().or(cfg.manifest_url),
        upload_url: cli.upload_url.clone().or(cfg.upload_url),
        inputs,
        format,
        annotations,
        freshness,
        jobs: cli.jobs.or(cfg.jobs).filter(|&n| n > 0),
        timeout: Duration::from_secs(cfg.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        config_path,
        repo_root,
    })
}

/// Relative paths are taken from the repository root.
pub fn anchor(root: &Path, p: &str) -> PathBuf {
    let path = Path::new(p);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn default_repo_name(root: &Path) -> String {
    root.canonicalize()
        .ok()
        .as_deref()
        .and_then(|p| p.file_name())
        .or_else(|| root.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "default".to_string())
}
