use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ArchivePaths {
    pub home: PathBuf,
    pub public_dir: PathBuf,
    pub archives_dir: PathBuf,
    pub outbox_file: PathBuf,
    pub threads_file: PathBuf,
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<ArchivePaths> {
    let cwd = env::current_dir().context("current directory could not be resolved")?;
    let home = env_or_default_path("OUTBOX_HOME", cwd);

    let public_dir = env_or_default_path("OUTBOX_PUBLIC_DIR", home.join("public"));
    let archives_dir = env_or_default_path("OUTBOX_ARCHIVES_DIR", public_dir.join("archives"));
    let outbox_file = env_or_default_path("OUTBOX_FILE", public_dir.join("outbox.json"));
    let threads_file = env_or_default_path("OUTBOX_THREADS_FILE", public_dir.join("threads.json"));

    Ok(ArchivePaths {
        home,
        public_dir,
        archives_dir,
        outbox_file,
        threads_file,
    })
}
