use crate::LensError;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Default)]
pub struct LensConfig {
    #[serde(default)]
    pub analyze: AnalyzeConfig,
    #[serde(default)]
    pub classify: ClassifyConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct AnalyzeConfig {
    pub days: Option<u32>,
    pub limit: Option<usize>,
    pub projects_dir: Option<PathBuf>,
}

/// Patterns appended after the built-in correction/acknowledgment lists.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ClassifyConfig {
    #[serde(default)]
    pub extra_corrections: Vec<String>,
    #[serde(default)]
    pub extra_acknowledgments: Vec<String>,
}

/// Load config from PROMPTLENS_CONFIG env var, ~/.promptlens/config.toml, or defaults.
pub fn load_config() -> Result<LensConfig, LensError> {
    match config_path() {
        Some(p) if p.exists() => load_config_from(&p),
        _ => Ok(LensConfig::default()),
    }
}

pub fn load_config_from(path: &Path) -> Result<LensConfig, LensError> {
    let content = std::fs::read_to_string(path)?;
    let config: LensConfig = toml::from_str(&content)
        .map_err(|e| LensError::Config(format!("{}: {e}", path.display())))?;
    validate_config(&config)?;
    Ok(config)
}

fn config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("PROMPTLENS_CONFIG") {
        return Some(PathBuf::from(p));
    }
    let home = std::env::var("HOME").ok()?;
    Some(Path::new(&home).join(".promptlens").join("config.toml"))
}

fn validate_config(config: &LensConfig) -> Result<(), LensError> {
    let lists = [
        ("extra_corrections", &config.classify.extra_corrections),
        ("extra_acknowledgments", &config.classify.extra_acknowledgments),
    ];
    for (name, patterns) in lists {
        for (i, pat) in patterns.iter().enumerate() {
            Regex::new(pat)
                .map_err(|e| LensError::Config(format!("{name}[{i}] invalid regex: {e}")))?;
        }
    }
    if config.analyze.limit == Some(0) {
        return Err(LensError::Config("analyze.limit must be at least 1".into()));
    }
    Ok(())
}

/// Default location of Claude Code's per-project transcript directories.
pub fn default_projects_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home).join(".claude").join("projects")
}
