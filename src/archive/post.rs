use crate::archive::source::envelope;
use crate::archive::util::{EPOCH_ISO, str_field, timestamp_or_epoch};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Unknown,
}

impl MediaKind {
    pub fn from_media_type(media_type: Option<&str>) -> Self {
        let Some(media_type) = media_type else {
            return MediaKind::Unknown;
        };
        if media_type.contains("image") {
            MediaKind::Image
        } else if media_type.contains("video") {
            MediaKind::Video
        } else if media_type.contains("audio") {
            MediaKind::Audio
        } else {
            MediaKind::Unknown
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaAttachment {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub url: String,
    pub preview_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub avatar: String,
    pub url: String,
}

/// A post in the one canonical shape every downstream step works with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedPost {
    pub id: String,
    pub created_at: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub visibility: String,
    pub sensitive: bool,
    pub spoiler_text: String,
    pub media_attachments: Vec<MediaAttachment>,
    pub account: Account,
    pub replies_count: u64,
    pub reblogs_count: u64,
    pub favourites_count: u64,
    /// Raw reply reference (`inReplyTo`, else `inReplyToAtomUri`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
}

impl NormalizedPost {
    pub fn created_ts(&self) -> DateTime<Utc> {
        timestamp_or_epoch(Some(&self.created_at))
    }
}

#[derive(Debug, Clone)]
pub struct NormalizeContext {
    pub avatar_fallback: String,
}

impl Default for NormalizeContext {
    fn default() -> Self {
        Self {
            avatar_fallback: "/avatar.jpg".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PostFilter {
    /// Drop posts whose `cc` audience is missing or empty.
    pub public_only: bool,
}

impl Default for PostFilter {
    fn default() -> Self {
        Self { public_only: true }
    }
}

/// The record variants an export can hold, resolved once up front.
#[derive(Debug, Clone, Copy)]
enum PostRecord<'a> {
    /// `Create` activity wrapping a `Note`.
    Activity { activity: &'a Value, note: &'a Value },
    /// A post object used directly.
    Bare(&'a Value),
}

impl<'a> PostRecord<'a> {
    /// Resolve the variant from the record itself, whatever envelope held it.
    ///
    /// `Create` wrapping a `Note` is an activity; an untyped object or a
    /// `Note` is a bare post. Any other activity (`Announce`, `Like`, ...)
    /// is not a post.
    fn classify(item: &'a Value) -> Option<Self> {
        if !item.is_object() {
            return None;
        }
        match item.get("type").and_then(Value::as_str) {
            Some("Create") => {
                let note = item.get("object")?;
                (note.get("type").and_then(Value::as_str) == Some("Note")).then_some(
                    PostRecord::Activity {
                        activity: item,
                        note,
                    },
                )
            }
            None | Some("Note") => Some(PostRecord::Bare(item)),
            Some(_) => None,
        }
    }

    fn note(self) -> &'a Value {
        match self {
            PostRecord::Activity { note, .. } => note,
            PostRecord::Bare(item) => item,
        }
    }

    fn is_public(self) -> bool {
        let cc = match self {
            PostRecord::Activity { activity, note } => activity.get("cc").or_else(|| note.get("cc")),
            PostRecord::Bare(item) => match item.get("cc") {
                Some(cc) => Some(cc),
                // API-style exports carry `visibility` instead of an audience.
                None => {
                    return matches!(
                        str_field(item, "visibility"),
                        Some("public") | Some("unlisted")
                    );
                }
            },
        };
        cc.and_then(Value::as_array).is_some_and(|cc| !cc.is_empty())
    }

    fn actor(self) -> Option<&'a Value> {
        match self {
            PostRecord::Activity { activity, note } => {
                note.get("actor").or_else(|| activity.get("actor"))
            }
            PostRecord::Bare(item) => item.get("actor"),
        }
    }
}

fn extract_username(url: &str) -> Option<&str> {
    url.rsplit('/').next().filter(|s| !s.is_empty())
}

fn total_items(note: &Value, key: &str) -> u64 {
    note.get(key)
        .and_then(|v| v.get("totalItems"))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

fn reply_reference(note: &Value) -> Option<String> {
    let in_reply_to = note.get("inReplyTo").and_then(|v| match v {
        Value::String(s) => Some(s.as_str()),
        Value::Object(_) => v.get("id").and_then(Value::as_str),
        _ => None,
    });
    in_reply_to
        .or_else(|| note.get("inReplyToAtomUri").and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

fn media_attachments(note: &Value, post_id: &str) -> Vec<MediaAttachment> {
    let Some(items) = note.get("attachment").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .map(|(n, att)| {
            let url = str_field(att, "url")
                .or_else(|| str_field(att, "href"))
                .unwrap_or_default()
                .to_string();
            MediaAttachment {
                id: str_field(att, "id")
                    .map(ToOwned::to_owned)
                    .unwrap_or_else(|| format!("{post_id}#media-{n}")),
                kind: MediaKind::from_media_type(att.get("mediaType").and_then(Value::as_str)),
                preview_url: url.clone(),
                url,
                description: str_field(att, "name")
                    .or_else(|| str_field(att, "summary"))
                    .map(ToOwned::to_owned),
            }
        })
        .collect()
}

fn account(record: PostRecord<'_>, ctx: &NormalizeContext) -> Account {
    let note = record.note();
    let actor = record.actor();
    let attributed_to = str_field(note, "attributedTo")
        .or_else(|| actor.and_then(Value::as_str))
        .unwrap_or_default();
    let username = extract_username(attributed_to).unwrap_or("user").to_string();
    let display_name = actor
        .and_then(|a| str_field(a, "name"))
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| username.clone());
    let avatar = actor
        .and_then(|a| a.get("icon"))
        .and_then(|icon| str_field(icon, "url"))
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| ctx.avatar_fallback.clone());

    Account {
        id: if attributed_to.is_empty() {
            "unknown".to_string()
        } else {
            attributed_to.to_string()
        },
        username,
        display_name,
        avatar,
        url: attributed_to.to_string(),
    }
}

fn normalize(record: PostRecord<'_>, ctx: &NormalizeContext) -> Option<NormalizedPost> {
    let note = record.note();
    let id = str_field(note, "id")?.to_string();
    let summary = str_field(note, "summary");

    Some(NormalizedPost {
        created_at: str_field(note, "published")
            .or_else(|| str_field(note, "created_at"))
            .unwrap_or(EPOCH_ISO)
            .to_string(),
        content: str_field(note, "content")
            .or(summary)
            .unwrap_or_default()
            .to_string(),
        url: str_field(note, "url")
            .or(Some(id.as_str()))
            .map(ToOwned::to_owned),
        visibility: str_field(note, "visibility")
            .unwrap_or("public")
            .to_string(),
        sensitive: note
            .get("sensitive")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        spoiler_text: str_field(note, "spoiler_text")
            .or(summary)
            .unwrap_or_default()
            .to_string(),
        media_attachments: media_attachments(note, &id),
        account: account(record, ctx),
        replies_count: total_items(note, "replies"),
        reblogs_count: total_items(note, "shares"),
        favourites_count: total_items(note, "likes"),
        in_reply_to: reply_reference(note),
        id,
    })
}

/// Extract display posts from an outbox or export document, newest first.
///
/// Each record is classified on its own, so a merged outbox holding bare
/// posts next to `Create` activities yields both. Records without an id are
/// dropped, and so is any repeat of an id.
pub fn load_posts(body: &Value, ctx: &NormalizeContext, filter: PostFilter) -> Vec<NormalizedPost> {
    let Some((_, items)) = envelope(body) else {
        return Vec::new();
    };

    let records = items.iter().filter_map(PostRecord::classify);

    let mut seen = HashSet::new();
    let mut posts: Vec<NormalizedPost> = records
        .filter(|record| !filter.public_only || record.is_public())
        .filter_map(|record| normalize(record, ctx))
        .filter(|post| seen.insert(post.id.clone()))
        .collect();

    posts.sort_by_key(|post| std::cmp::Reverse(post.created_ts()));
    posts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PUBLIC: &str = "https://www.w3.org/ns/activitystreams#Public";

    fn create(id: &str, published: &str, extra: Value) -> Value {
        let mut note = json!({
            "id": format!("https://social.example/users/ana/statuses/{id}"),
            "type": "Note",
            "published": published,
            "attributedTo": "https://social.example/users/ana",
            "content": format!("<p>post {id}</p>"),
        });
        if let (Some(note), Some(extra)) = (note.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                note.insert(k.clone(), v.clone());
            }
        }
        json!({
            "id": format!("https://social.example/users/ana/statuses/{id}/activity"),
            "type": "Create",
            "cc": [PUBLIC],
            "object": note,
        })
    }

    #[test]
    fn normalizes_create_note_activity() {
        let body = json!({
            "orderedItems": [create("1", "2024-02-03T04:05:06Z", json!({
                "inReplyTo": "https://social.example/users/ana/statuses/0",
                "sensitive": true,
                "summary": "cw",
                "replies": { "totalItems": 3 },
                "likes": { "totalItems": 7 },
                "attachment": [
                    { "mediaType": "image/png", "url": "/media/a.png", "name": "alt text" },
                    { "mediaType": "video/mp4", "href": "/media/b.mp4" },
                    { "mediaType": "application/pdf", "url": "/media/c.pdf" }
                ]
            }))]
        });

        let posts = load_posts(&body, &NormalizeContext::default(), PostFilter::default());
        assert_eq!(posts.len(), 1);
        let post = &posts[0];
        assert_eq!(post.id, "https://social.example/users/ana/statuses/1");
        assert_eq!(post.created_at, "2024-02-03T04:05:06Z");
        assert_eq!(post.content, "<p>post 1</p>");
        assert_eq!(post.spoiler_text, "cw");
        assert!(post.sensitive);
        assert_eq!(post.replies_count, 3);
        assert_eq!(post.favourites_count, 7);
        assert_eq!(post.reblogs_count, 0);
        assert_eq!(
            post.in_reply_to.as_deref(),
            Some("https://social.example/users/ana/statuses/0")
        );
        assert_eq!(post.account.username, "ana");
        assert_eq!(post.account.display_name, "ana");
        assert_eq!(post.account.avatar, "/avatar.jpg");

        let kinds: Vec<MediaKind> = post.media_attachments.iter().map(|m| m.kind).collect();
        assert_eq!(kinds, vec![MediaKind::Image, MediaKind::Video, MediaKind::Unknown]);
        assert_eq!(post.media_attachments[1].url, "/media/b.mp4");
        assert_eq!(
            post.media_attachments[0].id,
            "https://social.example/users/ana/statuses/1#media-0"
        );
        assert_eq!(post.media_attachments[0].description.as_deref(), Some("alt text"));
    }

    #[test]
    fn outbox_skips_non_note_activities_and_private_posts() {
        let mut private = create("2", "2024-01-02T00:00:00Z", json!({}));
        private["cc"] = json!([]);
        let announce = json!({ "type": "Announce", "id": "boost", "cc": [PUBLIC], "object": "https://x/1" });
        let body = json!({
            "orderedItems": [create("1", "2024-01-01T00:00:00Z", json!({})), private, announce]
        });

        let public = load_posts(&body, &NormalizeContext::default(), PostFilter::default());
        assert_eq!(public.len(), 1);

        let everything = load_posts(
            &body,
            &NormalizeContext::default(),
            PostFilter { public_only: false },
        );
        assert_eq!(everything.len(), 2);
    }

    #[test]
    fn bare_posts_are_sorted_newest_first_and_deduplicated() {
        let body = json!({
            "posts": [
                { "id": "a", "cc": [PUBLIC], "published": "2024-01-01" },
                { "id": "b", "cc": [PUBLIC], "created_at": "2024-03-01T00:00:00Z" },
                { "id": "a", "cc": [PUBLIC], "published": "2025-01-01" },
                { "cc": [PUBLIC], "content": "no id" }
            ]
        });
        let posts = load_posts(&body, &NormalizeContext::default(), PostFilter::default());
        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(posts[1].created_at, "2024-01-01");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let ctx = NormalizeContext {
            avatar_fallback: "/avatar.webp".to_string(),
        };
        let body = json!([{ "id": "7", "inReplyToAtomUri": "tag:x,2024:objectId=5" }]);
        let posts = load_posts(&body, &ctx, PostFilter { public_only: false });
        let post = posts.first().expect("post");
        assert_eq!(post.created_at, EPOCH_ISO);
        assert_eq!(post.content, "");
        assert_eq!(post.url.as_deref(), Some("7"));
        assert_eq!(post.visibility, "public");
        assert_eq!(post.account.id, "unknown");
        assert_eq!(post.account.username, "user");
        assert_eq!(post.account.avatar, "/avatar.webp");
        assert_eq!(post.in_reply_to.as_deref(), Some("tag:x,2024:objectId=5"));
    }

    #[test]
    fn merged_outbox_yields_bare_posts_next_to_activities() {
        let body = json!({
            "type": "OrderedCollection",
            "orderedItems": [
                create("1", "2024-01-01T00:00:00Z", json!({})),
                { "id": "b1", "type": "Note", "cc": [PUBLIC], "published": "2024-02-01T00:00:00Z" },
                { "id": "b2", "visibility": "public", "created_at": "2024-03-01T00:00:00Z",
                  "inReplyTo": "b1" },
                { "id": "b3", "visibility": "direct", "created_at": "2024-04-01T00:00:00Z" },
                { "id": "like", "type": "Like", "object": "https://x/1" }
            ]
        });

        let posts = load_posts(&body, &NormalizeContext::default(), PostFilter::default());
        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["b2", "b1", "https://social.example/users/ana/statuses/1"]
        );
        assert_eq!(posts[0].in_reply_to.as_deref(), Some("b1"));

        let everything = load_posts(
            &body,
            &NormalizeContext::default(),
            PostFilter { public_only: false },
        );
        assert_eq!(everything.len(), 4);
    }
}
