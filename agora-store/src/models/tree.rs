//! Reply tree assembly
//!
//! Replies for one or more roots are fetched flat (ordered oldest first) and
//! grouped here by `parent_id`. Levels below `max_depth` are left out; their
//! existence is still visible through `ReplyNode::reply_count`.

use std::collections::HashMap;

use uuid::Uuid;

use super::thread::{ReplyNode, ReplyRow};
use super::user::AuthorSummary;

/// Replies grouped by parent, ready to be taken root by root.
#[derive(Debug, Default)]
pub struct ReplyForest {
    by_parent: HashMap<Uuid, Vec<ReplyRow>>,
    max_depth: u32,
}

impl ReplyForest {
    /// Group `rows` by parent. Row order within a parent is preserved.
    pub fn new(rows: Vec<ReplyRow>, max_depth: u32) -> Self {
        let mut by_parent: HashMap<Uuid, Vec<ReplyRow>> = HashMap::new();
        for row in rows {
            if let Some(parent) = row.thread.parent_id {
                by_parent.entry(parent).or_default().push(row);
            }
        }
        Self {
            by_parent,
            max_depth,
        }
    }

    /// Remove and return the reply tree under `root`.
    pub fn take(&mut self, root: Uuid) -> Vec<ReplyNode> {
        self.take_level(root, 1)
    }

    fn take_level(&mut self, parent: Uuid, level: u32) -> Vec<ReplyNode> {
        if level > self.max_depth {
            return Vec::new();
        }

        let rows = self.by_parent.remove(&parent).unwrap_or_default();
        rows.into_iter()
            .map(|row| {
                let children = self.take_level(row.thread.id, level + 1);
                let author = AuthorSummary {
                    id: row.thread.author_id.clone(),
                    name: row.author_name,
                    image: row.author_image,
                };
                ReplyNode {
                    thread: row.thread,
                    author,
                    reply_count: row.reply_count,
                    children,
                }
            })
            .collect()
    }
}
