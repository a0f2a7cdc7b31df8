use crate::archive::post::NormalizedPost;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};

static REPLY_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"/statuses/(\d+)/?$").expect("valid statuses pattern"),
        Regex::new(r"/@[^/]+/(\d+)/?$").expect("valid web url pattern"),
    ]
});

/// A post placed in its thread.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadedPost {
    #[serde(flatten)]
    pub post: NormalizedPost,
    pub is_reply: bool,
    /// Only set when the parent is part of the same dataset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
    pub thread_id: String,
    pub thread_position: usize,
    pub depth: usize,
    pub has_replies: bool,
    /// Direct children, oldest first.
    pub replies: Vec<Arc<ThreadedPost>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RootKind {
    /// The root post has no reply reference.
    Original,
    /// The root replies to a post that is not in the dataset.
    ExternalReply,
    /// The root's reply chain loops back; the loop was cut here.
    CycleBroken,
}

#[derive(Debug, Clone)]
pub struct ThreadGroup {
    pub thread_id: String,
    pub root_kind: RootKind,
    pub root_post: Arc<ThreadedPost>,
    /// Every node of the thread in pre-order, root first.
    pub posts: Vec<Arc<ThreadedPost>>,
}

impl ThreadGroup {
    pub fn is_reply_to_external(&self) -> bool {
        self.root_kind == RootKind::ExternalReply
    }

    pub fn root_created_ts(&self) -> DateTime<Utc> {
        self.root_post.post.created_ts()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FlatPostView<'a> {
    #[serde(flatten)]
    post: &'a NormalizedPost,
    is_reply: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_id: Option<&'a str>,
    thread_id: &'a str,
    thread_position: usize,
    depth: usize,
    has_replies: bool,
    reply_ids: Vec<&'a str>,
}

impl<'a> From<&'a ThreadedPost> for FlatPostView<'a> {
    fn from(node: &'a ThreadedPost) -> Self {
        Self {
            post: &node.post,
            is_reply: node.is_reply,
            reply_to_id: node.reply_to_id.as_deref(),
            thread_id: &node.thread_id,
            thread_position: node.thread_position,
            depth: node.depth,
            has_replies: node.has_replies,
            reply_ids: node.replies.iter().map(|r| r.post.id.as_str()).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreadGroupView<'a> {
    thread_id: &'a str,
    root_kind: RootKind,
    root_post: &'a ThreadedPost,
    posts: Vec<FlatPostView<'a>>,
}

// The nested tree lives under `rootPost`; `posts` is the flat pre-order list
// with children referenced by id.
impl Serialize for ThreadGroup {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ThreadGroupView {
            thread_id: &self.thread_id,
            root_kind: self.root_kind,
            root_post: &self.root_post,
            posts: self.posts.iter().map(|p| FlatPostView::from(p.as_ref())).collect(),
        }
        .serialize(serializer)
    }
}

/// Trailing status id of a reply reference URL, if it has one.
pub fn reference_key(reference: &str) -> Option<&str> {
    REPLY_ID_PATTERNS.iter().find_map(|re| {
        re.captures(reference)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    })
}

/// Candidate parent id: the trailing status id, or the whole reference.
pub fn extract_reply_to_id(reference: &str) -> &str {
    reference_key(reference).unwrap_or(reference)
}

struct PostIndex<'a> {
    exact: HashMap<&'a str, usize>,
    /// Trailing status id of each post id. `None` marks a key shared by
    /// posts with different ids, which never resolves.
    by_key: HashMap<&'a str, Option<usize>>,
}

impl<'a> PostIndex<'a> {
    fn build(posts: &'a [NormalizedPost]) -> Self {
        let mut exact = HashMap::with_capacity(posts.len());
        let mut by_key: HashMap<&str, Option<usize>> = HashMap::new();
        for (i, post) in posts.iter().enumerate() {
            exact.entry(post.id.as_str()).or_insert(i);
        }
        for (i, post) in posts.iter().enumerate() {
            if let Some(key) = reference_key(&post.id) {
                by_key
                    .entry(key)
                    .and_modify(|slot| {
                        if slot.is_some_and(|j| posts[j].id != post.id) {
                            *slot = None;
                        }
                    })
                    .or_insert(Some(i));
            }
        }
        Self { exact, by_key }
    }

    fn resolve(&self, reference: &str) -> Option<usize> {
        let candidate = extract_reply_to_id(reference);
        self.exact
            .get(reference)
            .or_else(|| self.exact.get(candidate))
            .copied()
            .or_else(|| self.by_key.get(candidate).copied().flatten())
    }
}

/// Walk parent links up from `start`.
///
/// Returns the root and whether the walk was stopped by revisiting a node.
fn find_root(start: usize, parents: &[Option<usize>]) -> (usize, bool) {
    let mut visited = HashSet::new();
    visited.insert(start);
    let mut current = start;
    while let Some(parent) = parents[current] {
        if !visited.insert(parent) {
            return (current, true);
        }
        current = parent;
    }
    (current, false)
}

struct Visit {
    index: usize,
    depth: usize,
    position: usize,
    children: Vec<usize>,
}

/// Pre-order walk from `root`, claiming each node in `assigned` exactly once.
fn walk(root: usize, children: &[Vec<usize>], assigned: &mut [bool]) -> Vec<Visit> {
    let mut order = Vec::new();
    let mut stack = vec![(root, 0usize)];
    assigned[root] = true;

    while let Some((index, depth)) = stack.pop() {
        let kids: Vec<usize> = children[index]
            .iter()
            .copied()
            .filter(|&child| !assigned[child])
            .collect();
        for &child in &kids {
            assigned[child] = true;
        }
        for &child in kids.iter().rev() {
            stack.push((child, depth + 1));
        }
        order.push(Visit {
            index,
            depth,
            position: order.len(),
            children: kids,
        });
    }
    order
}

fn build_thread(
    root: usize,
    root_kind: RootKind,
    posts: &[NormalizedPost],
    children: &[Vec<usize>],
    assigned: &mut [bool],
) -> Option<ThreadGroup> {
    let order = walk(root, children, assigned);
    let thread_id = posts[root].id.clone();
    let mut nodes: HashMap<usize, Arc<ThreadedPost>> = HashMap::with_capacity(order.len());
    let mut parent_of: HashMap<usize, usize> = HashMap::new();
    for visit in &order {
        for &child in &visit.children {
            parent_of.insert(child, visit.index);
        }
    }

    // Children always follow their parent in pre-order, so building in
    // reverse has every reply ready before the post it answers.
    for visit in order.iter().rev() {
        let replies: Vec<Arc<ThreadedPost>> = visit
            .children
            .iter()
            .filter_map(|child| nodes.get(child).cloned())
            .collect();
        let reply_to_id = parent_of.get(&visit.index).map(|&p| posts[p].id.clone());
        let node = ThreadedPost {
            post: posts[visit.index].clone(),
            is_reply: reply_to_id.is_some(),
            reply_to_id,
            thread_id: thread_id.clone(),
            thread_position: visit.position,
            depth: visit.depth,
            has_replies: !replies.is_empty(),
            replies,
        };
        nodes.insert(visit.index, Arc::new(node));
    }

    let root_post = nodes.get(&root).cloned()?;
    let flat = order
        .iter()
        .filter_map(|visit| nodes.get(&visit.index).cloned())
        .collect();
    Some(ThreadGroup {
        thread_id,
        root_kind,
        root_post,
        posts: flat,
    })
}

/// Rebuild reply threads from a flat post list.
///
/// A reply whose parent is not in `posts` becomes a thread root. Every post
/// ends up in exactly one thread; threads come back newest root first.
pub fn process(posts: &[NormalizedPost]) -> Vec<ThreadGroup> {
    let index = PostIndex::build(posts);

    let parents: Vec<Option<usize>> = posts
        .iter()
        .map(|post| post.in_reply_to.as_deref().and_then(|r| index.resolve(r)))
        .collect();

    let created: Vec<DateTime<Utc>> = posts.iter().map(NormalizedPost::created_ts).collect();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); posts.len()];
    for (child, parent) in parents.iter().enumerate() {
        if let Some(parent) = *parent {
            children[parent].push(child);
        }
    }
    for kids in &mut children {
        kids.sort_by_key(|&k| created[k]);
    }

    let mut assigned = vec![false; posts.len()];
    let mut threads = Vec::new();

    for start in 0..posts.len() {
        if assigned[start] {
            continue;
        }
        let (mut root, cut) = find_root(start, &parents);
        let mut root_kind = if cut {
            RootKind::CycleBroken
        } else if posts[root].in_reply_to.is_some() {
            RootKind::ExternalReply
        } else {
            RootKind::Original
        };
        if assigned[root] {
            // Unreachable on consistent data; keep the partition intact.
            root = start;
            root_kind = RootKind::CycleBroken;
        }
        if cut {
            tracing::debug!(post = %posts[root].id, "reply chain loops; treating post as thread root");
        }
        if let Some(thread) = build_thread(root, root_kind, posts, &children, &mut assigned) {
            threads.push(thread);
        }
    }

    threads.sort_by_key(|thread| std::cmp::Reverse(thread.root_created_ts()));
    threads
}
