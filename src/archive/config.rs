use crate::archive::merge::DEFAULT_OUTBOX_ID;
use crate::archive::paths::ArchivePaths;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxConfig {
    pub id: String,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_OUTBOX_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadsConfig {
    /// Keep threads whose root answers a post outside the archive.
    #[serde(default)]
    pub show_replies_to_others: bool,
    #[serde(default = "default_public_only")]
    pub public_only: bool,
}

fn default_public_only() -> bool {
    true
}

impl Default for ThreadsConfig {
    fn default() -> Self {
        Self {
            show_replies_to_others: false,
            public_only: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArchiveConfig {
    pub outbox: OutboxConfig,
    pub threads: ThreadsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialArchiveConfig {
    outbox: Option<OutboxConfig>,
    threads: Option<ThreadsConfig>,
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => {
            let trimmed = v.trim();
            match trimmed {
                "1" | "true" | "TRUE" | "yes" | "on" => true,
                "0" | "false" | "FALSE" | "no" | "off" => false,
                _ => fallback,
            }
        }
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn validate(cfg: &ArchiveConfig) -> Result<()> {
    if cfg.outbox.id.trim().is_empty() {
        return Err(anyhow!("invalid outbox id: cannot be empty"));
    }
    Ok(())
}

pub fn resolve_config_path(paths: &ArchivePaths) -> PathBuf {
    if let Ok(custom) = env::var("OUTBOX_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    paths.home.join("outbox.toml")
}

fn merge_file_config(base: &mut ArchiveConfig, paths: &ArchivePaths) -> Result<()> {
    let path = resolve_config_path(paths);
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let parsed: PartialArchiveConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse outbox config {}: {err}", path.display()))?;
    if let Some(outbox) = parsed.outbox {
        base.outbox = outbox;
    }
    if let Some(threads) = parsed.threads {
        base.threads = threads;
    }
    Ok(())
}

pub fn load_config(paths: &ArchivePaths) -> Result<ArchiveConfig> {
    let mut cfg = ArchiveConfig::default();
    merge_file_config(&mut cfg, paths)?;

    cfg.outbox.id = env_or_string("OUTBOX_ID", &cfg.outbox.id);
    cfg.threads.show_replies_to_others = env_or_bool(
        "OUTBOX_SHOW_REPLIES_TO_OTHERS",
        cfg.threads.show_replies_to_others,
    );
    cfg.threads.public_only = env_or_bool("OUTBOX_PUBLIC_ONLY", cfg.threads.public_only);

    validate(&cfg)?;
    Ok(cfg)
}
