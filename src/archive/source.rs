use crate::error::SourceRejection;
use serde_json::Value;

/// One parsed export file, tagged with its place in the processing order.
#[derive(Debug, Clone)]
pub struct RawArchiveDocument {
    pub origin: String,
    pub order: usize,
    pub body: Value,
}

impl RawArchiveDocument {
    pub fn new(origin: impl Into<String>, order: usize, body: Value) -> Self {
        Self {
            origin: origin.into(),
            order,
            body,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveShape {
    /// Top-level JSON array of posts.
    Array,
    /// ActivityPub `OrderedCollection` outbox.
    OrderedItems,
    /// `{ "posts": [...] }` envelope.
    Posts,
}

impl ArchiveShape {
    pub fn label(self) -> &'static str {
        match self {
            ArchiveShape::Array => "array",
            ArchiveShape::OrderedItems => "orderedItems",
            ArchiveShape::Posts => "posts",
        }
    }
}

/// A document whose shape was recognised, borrowing its post items.
#[derive(Debug, Clone, Copy)]
pub struct ClassifiedSource<'a> {
    pub shape: ArchiveShape,
    pub items: &'a [Value],
}

/// The post array of a document together with the envelope it came in.
pub fn envelope(body: &Value) -> Option<(ArchiveShape, &Vec<Value>)> {
    if let Some(items) = body.as_array() {
        return Some((ArchiveShape::Array, items));
    }
    if let Some(items) = body.get("orderedItems").and_then(Value::as_array) {
        return Some((ArchiveShape::OrderedItems, items));
    }
    if let Some(items) = body.get("posts").and_then(Value::as_array) {
        return Some((ArchiveShape::Posts, items));
    }
    None
}

/// An object that carries `id` or `content`, or is a `Create`/`Note`.
pub fn is_post_like(item: &Value) -> bool {
    let Some(obj) = item.as_object() else {
        return false;
    };
    if obj.get("id").is_some_and(|v| !v.is_null()) {
        return true;
    }
    if obj.get("content").is_some_and(|v| !v.is_null()) {
        return true;
    }
    matches!(
        obj.get("type").and_then(Value::as_str),
        Some("Create") | Some("Note")
    )
}

/// Work out which envelope a document uses and whether it holds posts.
///
/// Only the first item is inspected: bookmark and like exports are
/// `orderedItems` lists of bare URL strings and get rejected here.
pub fn classify(body: &Value) -> Result<ClassifiedSource<'_>, SourceRejection> {
    let Some((shape, items)) = envelope(body) else {
        return Err(SourceRejection::UnrecognizedShape);
    };
    let Some(first) = items.first() else {
        return Err(SourceRejection::EmptyCollection(shape.label()));
    };
    if !is_post_like(first) {
        return Err(SourceRejection::NonPostCollection(shape.label()));
    }
    Ok(ClassifiedSource { shape, items })
}
