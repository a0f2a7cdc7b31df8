use anyhow::Result;
use std::path::PathBuf;

use crate::archive::config::load_config;
use crate::archive::discovery::load_documents;
use crate::archive::merge::merge;
use crate::archive::paths::resolve_paths;
use crate::archive::store::{render_pretty, write_if_changed};
use crate::commands::CommandReport;

#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    pub archives_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub dry_run: bool,
}

pub fn run(opts: &MergeOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths)?;
    let mut report = CommandReport::new("merge");

    let archives_dir = opts.archives_dir.clone().unwrap_or(paths.archives_dir);
    let output = opts.output.clone().unwrap_or(paths.outbox_file);
    report.detail(format!("archives_dir={}", archives_dir.display()));
    report.detail(format!("output={}", output.display()));

    let loaded = load_documents(&archives_dir, Some(&output))?;
    let mut outcome = merge(&loaded.documents, &cfg.outbox.id);
    let mut skipped = loaded.skipped;
    skipped.append(&mut outcome.stats.skipped);
    skipped.sort_by(|a, b| a.origin.cmp(&b.origin));

    let stats = &outcome.stats;
    report.detail(format!("files_found={}", loaded.files_found));
    report.detail(format!("sources_parsed={}", stats.sources_total));
    report.detail(format!("sources_used={}", stats.sources_used));
    report.detail(format!("sources_skipped={}", skipped.len()));
    for skip in &skipped {
        report.detail(format!("skipped={} reason={}", skip.origin, skip.reason));
    }
    report.detail(format!("items_seen={}", stats.items_seen));
    report.detail(format!("duplicates={}", stats.duplicates));
    report.detail(format!("missing_id={}", stats.missing_id));
    report.detail(format!("total_items={}", outcome.outbox.total_items));

    let rendered = render_pretty(&outcome.outbox)?;
    if opts.dry_run {
        report.detail(format!(
            "dry-run: outbox with {} posts not written",
            outcome.outbox.total_items
        ));
        return Ok(report);
    }

    let written = write_if_changed(&output, &rendered)?;
    report.detail(format!("outbox_sha256={}", written.sha256));
    if written.written {
        report.detail(format!("outbox written ({} bytes)", written.bytes));
    } else {
        report.detail("outbox unchanged".to_string());
    }
    tracing::info!(
        total_items = outcome.outbox.total_items,
        output = %output.display(),
        "combined archives"
    );

    Ok(report)
}
