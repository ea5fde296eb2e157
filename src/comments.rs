// 💬 Comment Trees - TextItem and body traversal

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// TEXT ITEM
// ============================================================================

/// TextItem - one discussion entry and its replies
///
/// Built once during ingestion and never mutated afterwards.
/// Root items have depth 0; every reply is one deeper than its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    #[serde(default, alias = "Author", skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Permalink to the item on the forum
    #[serde(default, rename = "url", alias = "URL", skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    #[serde(rename = "comment", alias = "Comment")]
    pub body: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub depth: u32,

    #[serde(default, alias = "Replies", deserialize_with = "null_as_empty")]
    pub replies: Vec<TextItem>,
}

// Older snapshots write `"Replies": null` for leaf comments
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<TextItem>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<TextItem>>::deserialize(deserializer)?.unwrap_or_default())
}

impl TextItem {
    /// Root item (depth 0) with only a body
    pub fn new(body: impl Into<String>) -> Self {
        TextItem {
            id: None,
            author: None,
            source_url: None,
            body: body.into(),
            posted_at: None,
            depth: 0,
            replies: Vec::new(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_posted_at(mut self, posted_at: DateTime<Utc>) -> Self {
        self.posted_at = Some(posted_at);
        self
    }

    /// Attach a reply, fixing up its depth (and its subtree's) to ours + 1
    pub fn with_reply(mut self, mut reply: TextItem) -> Self {
        reply.set_depth(self.depth + 1);
        self.replies.push(reply);
        self
    }

    /// Recompute depths from the tree shape, with `self` as a root.
    ///
    /// Snapshots may omit `depth` altogether, so a parsed tree is only
    /// trusted after this.
    pub fn reset_depths(&mut self) {
        self.set_depth(0);
    }

    fn set_depth(&mut self, depth: u32) {
        self.depth = depth;
        for reply in &mut self.replies {
            reply.set_depth(depth + 1);
        }
    }

    /// Number of items in this subtree, including self
    pub fn subtree_len(&self) -> usize {
        1 + self.replies.iter().map(TextItem::subtree_len).sum::<usize>()
    }

    /// True if every reply in the subtree is exactly one deeper than its parent
    pub fn depths_consistent(&self) -> bool {
        self.replies
            .iter()
            .all(|r| r.depth == self.depth + 1 && r.depths_consistent())
    }
}

// ============================================================================
// TRAVERSAL
// ============================================================================

/// Which bodies of a thread take part in the analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Traversal {
    /// Root comments only. Replies are carried but never read.
    #[default]
    TopLevel,
    /// Root comments and every nested reply, depth-first
    FullTree,
}

impl Traversal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Traversal::TopLevel => "top_level",
            Traversal::FullTree => "full_tree",
        }
    }
}

/// Flatten the bodies selected by `traversal`, in document order
pub fn collect_bodies(items: &[TextItem], traversal: Traversal) -> Vec<&str> {
    let mut bodies = Vec::with_capacity(items.len());
    for item in items {
        push_bodies(item, traversal, &mut bodies);
    }
    bodies
}

fn push_bodies<'a>(item: &'a TextItem, traversal: Traversal, out: &mut Vec<&'a str>) {
    out.push(item.body.as_str());
    if traversal == Traversal::FullTree {
        for reply in &item.replies {
            push_bodies(reply, traversal, out);
        }
    }
}
