use anyhow::Result;
use std::env;

use crate::archive::config::{load_config, resolve_config_path};
use crate::archive::paths::resolve_paths;
use crate::archive::profile::profile_image_map;
use crate::archive::store::read_json;
use crate::commands::CommandReport;

include!(concat!(env!("OUT_DIR"), "/outbox_env_allowlist.rs"));

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("build_id={}", env!("BUILD_UUID")));
    report.detail(format!("home={}", paths.home.display()));
    report.detail(format!("public_dir={}", paths.public_dir.display()));
    report.detail(format!("archives_dir={}", paths.archives_dir.display()));
    report.detail(format!("outbox_file={}", paths.outbox_file.display()));
    report.detail(format!("threads_file={}", paths.threads_file.display()));
    report.detail(format!("config_path={}", resolve_config_path(&paths).display()));

    for key in GENERATED_OUTBOX_ENV_ALLOWLIST {
        if env::var_os(key).is_some() {
            report.detail(format!("env_override={key}"));
        }
    }

    match load_config(&paths) {
        Ok(cfg) => {
            report.detail(format!("outbox.id={}", cfg.outbox.id));
            report.detail(format!(
                "threads.show_replies_to_others={}",
                cfg.threads.show_replies_to_others
            ));
            report.detail(format!("threads.public_only={}", cfg.threads.public_only));
        }
        Err(err) => report.issue(format!("config invalid: {err:#}")),
    }

    if !paths.archives_dir.exists() {
        report.issue("missing archives dir (public/archives or OUTBOX_ARCHIVES_DIR)");
    }
    if paths.outbox_file.is_file() {
        match read_json(&paths.outbox_file) {
            Ok(body) => report.detail(format!(
                "outbox.total_items={}",
                body.get("totalItems").and_then(|v| v.as_u64()).unwrap_or(0)
            )),
            Err(err) => report.issue(format!("outbox unreadable: {err:#}")),
        }
    } else {
        report.detail("outbox not built yet".to_string());
    }
    if paths.public_dir.is_dir() {
        for (kind, url) in profile_image_map(&paths.public_dir) {
            report.detail(format!("profile.{kind}={url}"));
        }
    }

    Ok(report)
}
