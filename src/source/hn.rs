// 🟧 Hacker News Source - Live fetch through the Firebase item API
//
// GET {base}/item/{id}.json returns the story; its `kids` are the root
// comments. Each comment is a separate request, so calls are throttled.

use super::CommentSource;
use crate::comments::TextItem;
use crate::net::{HttpClient, HttpSettings, Throttle};
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use tracing::{debug, info, warn};

static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

static ENTITY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("valid regex"));

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HnSettings {
    pub api_base: String,
    pub item_base: String,
    /// Follow each comment's `kids` and build the full reply tree
    pub fetch_replies: bool,
    /// Spacing between item requests, in milliseconds
    pub item_interval_ms: u64,
}

impl Default for HnSettings {
    fn default() -> Self {
        HnSettings {
            api_base: "https://hacker-news.firebaseio.com/v0".to_string(),
            item_base: "https://news.ycombinator.com/item?id=".to_string(),
            fetch_replies: false,
            item_interval_ms: 50,
        }
    }
}

// ============================================================================
// WIRE FORMAT
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
struct HnItem {
    id: u64,
    #[serde(default)]
    by: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    time: Option<i64>,
    #[serde(default)]
    kids: Vec<u64>,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    dead: bool,
}

// ============================================================================
// SOURCE
// ============================================================================

pub struct HnApiSource {
    http: HttpClient,
    settings: HnSettings,
    throttle: RefCell<Throttle>,
}

impl HnApiSource {
    pub fn new(settings: HnSettings, http: HttpSettings) -> Result<Self> {
        let throttle = RefCell::new(Throttle::from_millis(settings.item_interval_ms));
        Ok(HnApiSource {
            http: HttpClient::new(http)?,
            settings,
            throttle,
        })
    }

    fn get_item(&self, id: u64) -> Result<Option<HnItem>> {
        self.throttle.borrow_mut().wait();
        let url = format!("{}/item/{}.json", self.settings.api_base.trim_end_matches('/'), id);
        // The API answers `null` for unknown ids
        self.http.get_json::<Option<HnItem>>(&url, &[])
    }

    /// Fetch a comment (and, if enabled, its replies) at `depth`.
    /// Returns `None` for deleted, dead or empty comments.
    fn fetch_comment(&self, id: u64, depth: u32) -> Result<Option<TextItem>> {
        let item = match self.get_item(id)? {
            Some(item) => item,
            None => return Ok(None),
        };

        let text = item.text.as_deref().unwrap_or("");
        if item.deleted || item.dead || text.trim().is_empty() {
            debug!(id, "skipping deleted or empty comment");
            return Ok(None);
        }

        let mut comment = TextItem::new(normalize_comment_html(text))
            .with_id(item.id)
            .with_source_url(format!("{}{}", self.settings.item_base, item.id));
        comment.depth = depth;
        if let Some(by) = item.by {
            comment = comment.with_author(by);
        }
        if let Some(posted_at) = item.time.and_then(|t| DateTime::<Utc>::from_timestamp(t, 0)) {
            comment = comment.with_posted_at(posted_at);
        }

        if self.settings.fetch_replies {
            for kid in &item.kids {
                if let Some(reply) = self.fetch_or_skip(*kid, depth + 1) {
                    comment.replies.push(reply);
                }
            }
        }

        Ok(Some(comment))
    }

    // A single failed comment is logged and dropped, never retried here
    fn fetch_or_skip(&self, id: u64, depth: u32) -> Option<TextItem> {
        match self.fetch_comment(id, depth) {
            Ok(comment) => comment,
            Err(e) => {
                warn!(id, error = %format!("{:#}", e), "comment fetch failed, skipping");
                None
            }
        }
    }
}

impl CommentSource for HnApiSource {
    fn fetch_thread(&self, thread_id: u64) -> Result<Vec<TextItem>> {
        info!(thread_id, "getting comments for thread");

        let story = self
            .get_item(thread_id)
            .with_context(|| format!("Failed to fetch thread {}", thread_id))?
            .ok_or_else(|| anyhow!("Thread {} does not exist", thread_id))?;

        let mut comments = Vec::with_capacity(story.kids.len());
        let mut failures = 0;
        for &kid in &story.kids {
            match self.fetch_comment(kid, 0) {
                Ok(Some(comment)) => comments.push(comment),
                Ok(None) => {}
                Err(e) => {
                    failures += 1;
                    warn!(id = kid, error = %format!("{:#}", e), "comment fetch failed, skipping");
                }
            }
        }

        // Nothing came back at all: treat the thread as failed so a cached
        // copy is not replaced by an empty one
        if failures > 0 && failures == story.kids.len() {
            bail!("All {} comments of thread {} failed to fetch", failures, thread_id);
        }

        info!(
            thread_id,
            listed = story.kids.len(),
            fetched = comments.len(),
            failed = failures,
            "thread fetched"
        );

        Ok(comments)
    }

    fn name(&self) -> &str {
        "hn-api"
    }
}

// ============================================================================
// HTML NORMALIZATION
// ============================================================================

/// Turn the API's comment HTML into plain text.
///
/// Tags become spaces (so `<p>` still separates words) and the
/// usual entities are decoded. Unknown entities are left as-is.
pub fn normalize_comment_html(html: &str) -> String {
    let without_tags = TAG_REGEX.replace_all(html, " ");
    let decoded = ENTITY_REGEX.replace_all(&without_tags, |caps: &Captures| {
        decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    });
    decoded.trim().to_string()
}

fn decode_entity(entity: &str) -> Option<String> {
    let decoded = match entity {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        _ => {
            let code = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)?
        }
    };
    Some(decoded.to_string())
}
