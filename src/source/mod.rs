// 📥 Comment Sources - Where monthly threads come from
//
// The pipeline only sees `Vec<TextItem>`; how the tree was obtained
// (live API or cached snapshot) stays behind this trait.

pub mod hn;
pub mod snapshot;

pub use hn::{normalize_comment_html, HnApiSource, HnSettings};
pub use snapshot::{snapshot_digest, snapshot_path, write_snapshot, SnapshotSource};

use crate::comments::TextItem;
use anyhow::Result;

/// Supplies the comment trees of one monthly thread
pub trait CommentSource {
    /// Fetch every root comment (with replies, if the source has them)
    fn fetch_thread(&self, thread_id: u64) -> Result<Vec<TextItem>>;

    /// Short name for logs
    fn name(&self) -> &str;
}
