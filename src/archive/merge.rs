use crate::archive::source::{RawArchiveDocument, classify};
use crate::archive::util::{str_field, timestamp_or_epoch};
use crate::archive::warn;
use crate::error::{SourceRejection, WarnCode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

pub const ACTIVITY_STREAMS_CONTEXT: &str = "https://www.w3.org/ns/activitystreams";
pub const DEFAULT_OUTBOX_ID: &str = "outbox.json";

/// The canonical merged archive, shaped as an ActivityPub outbox.
#[derive(Debug, Clone, Serialize)]
pub struct Outbox {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "totalItems")]
    pub total_items: usize,
    #[serde(rename = "orderedItems")]
    pub ordered_items: Vec<Value>,
}

/// A deduplicatable archive item: resolved id and effective publish date.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub id: String,
    pub published: DateTime<Utc>,
    pub record: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSource {
    pub origin: String,
    pub reason: SourceRejection,
}

#[derive(Debug, Clone, Default)]
pub struct MergeStats {
    pub sources_total: usize,
    pub sources_used: usize,
    pub skipped: Vec<SkippedSource>,
    pub items_seen: usize,
    pub duplicates: usize,
    pub missing_id: usize,
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub outbox: Outbox,
    pub stats: MergeStats,
}

fn id_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `record.id`, or `record.object.id` for wrapped activities.
pub fn entry_id(record: &Value) -> Option<String> {
    id_value(record.get("id"))
        .or_else(|| id_value(record.get("object").and_then(|obj| obj.get("id"))))
}

/// `record.published`, then `record.object.published`, then the epoch.
fn record_date(record: &Value) -> Option<&str> {
    str_field(record, "published").or_else(|| str_field(record, "created_at"))
}

pub fn effective_published(record: &Value) -> DateTime<Utc> {
    let raw = record_date(record).or_else(|| record.get("object").and_then(record_date));
    timestamp_or_epoch(raw)
}

impl ArchiveEntry {
    pub fn from_record(record: &Value) -> Option<Self> {
        let id = entry_id(record)?;
        Some(Self {
            id,
            published: effective_published(record),
            record: record.clone(),
        })
    }
}

/// Merge archive documents into one newest-first outbox.
///
/// Documents are consumed in ascending `order`; the first record seen for an
/// id wins and later copies are dropped. Unusable documents are recorded in
/// the stats and never fail the merge.
pub fn merge(sources: &[RawArchiveDocument], outbox_id: &str) -> MergeOutcome {
    let mut ordered: Vec<&RawArchiveDocument> = sources.iter().collect();
    ordered.sort_by_key(|doc| doc.order);

    let mut stats = MergeStats {
        sources_total: sources.len(),
        ..MergeStats::default()
    };
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for doc in ordered {
        let classified = match classify(&doc.body) {
            Ok(classified) => classified,
            Err(reason) => {
                warn::emit(reason.code(), "merge", &doc.origin, &reason.to_string());
                stats.skipped.push(SkippedSource {
                    origin: doc.origin.clone(),
                    reason,
                });
                continue;
            }
        };

        stats.sources_used += 1;
        let mut missing_here = 0usize;
        for item in classified.items {
            stats.items_seen += 1;
            let Some(entry) = ArchiveEntry::from_record(item) else {
                missing_here += 1;
                continue;
            };
            if seen.insert(entry.id.clone()) {
                entries.push(entry);
            } else {
                stats.duplicates += 1;
            }
        }
        if missing_here > 0 {
            warn::emit(
                WarnCode::W005MissingId,
                "merge",
                &doc.origin,
                &format!("{missing_here} record(s) without an id"),
            );
            stats.missing_id += missing_here;
        }
        tracing::debug!(
            source = %doc.origin,
            shape = classified.shape.label(),
            items = classified.items.len(),
            "merged archive source"
        );
    }

    // Stable sort: equal timestamps keep first-seen order.
    entries.sort_by(|a, b| b.published.cmp(&a.published));

    let ordered_items: Vec<Value> = entries.into_iter().map(|entry| entry.record).collect();
    MergeOutcome {
        outbox: Outbox {
            context: ACTIVITY_STREAMS_CONTEXT.to_string(),
            id: outbox_id.to_string(),
            kind: "OrderedCollection".to_string(),
            total_items: ordered_items.len(),
            ordered_items,
        },
        stats,
    }
}
