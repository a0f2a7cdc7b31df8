use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use crate::archive::config::load_config;
use crate::archive::paths::resolve_paths;
use crate::archive::post::{NormalizeContext, PostFilter, load_posts};
use crate::archive::profile::find_profile_image;
use crate::archive::store::{read_json, render_pretty, write_if_changed};
use crate::archive::thread::{ThreadGroup, process};
use crate::commands::CommandReport;

#[derive(Debug, Clone, Default)]
pub struct ThreadsOptions {
    pub outbox: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub include_replies_to_others: bool,
    pub include_non_public: bool,
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreadsDocument<'a> {
    total_threads: usize,
    total_posts: usize,
    threads: &'a [ThreadGroup],
}

pub fn run(opts: &ThreadsOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths)?;
    let mut report = CommandReport::new("threads");

    let outbox = opts.outbox.clone().unwrap_or(paths.outbox_file.clone());
    let output = opts.output.clone().unwrap_or(paths.threads_file.clone());
    report.detail(format!("outbox={}", outbox.display()));
    report.detail(format!("output={}", output.display()));

    if !outbox.is_file() {
        report.issue("outbox file not found; run `merge` first");
        return Ok(report);
    }

    let show_replies_to_others =
        opts.include_replies_to_others || cfg.threads.show_replies_to_others;
    let filter = PostFilter {
        public_only: cfg.threads.public_only && !opts.include_non_public,
    };
    let ctx = NormalizeContext {
        avatar_fallback: find_profile_image(&paths.public_dir, "avatar"),
    };

    let body = read_json(&outbox)?;
    let posts = load_posts(&body, &ctx, filter);
    report.detail(format!("posts_loaded={}", posts.len()));
    report.detail(format!("public_only={}", filter.public_only));
    report.detail(format!("show_replies_to_others={show_replies_to_others}"));

    let mut threads = process(&posts);
    let before = threads.len();
    if !show_replies_to_others {
        threads.retain(|thread| !thread.is_reply_to_external());
    }
    let total_posts: usize = threads.iter().map(|t| t.posts.len()).sum();
    report.detail(format!("threads={}", threads.len()));
    report.detail(format!(
        "threads_hidden_replies_to_others={}",
        before - threads.len()
    ));
    report.detail(format!(
        "multi_post_threads={}",
        threads.iter().filter(|t| t.posts.len() > 1).count()
    ));
    report.detail(format!("thread_posts={total_posts}"));

    if opts.dry_run {
        report.detail("dry-run: threads document not written".to_string());
        return Ok(report);
    }

    let rendered = render_pretty(&ThreadsDocument {
        total_threads: threads.len(),
        total_posts,
        threads: &threads,
    })?;
    let written = write_if_changed(&output, &rendered)?;
    report.detail(format!("threads_sha256={}", written.sha256));
    if written.written {
        report.detail(format!("threads written ({} bytes)", written.bytes));
    } else {
        report.detail("threads unchanged".to_string());
    }

    Ok(report)
}
