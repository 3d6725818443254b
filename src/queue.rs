use std::collections::HashSet;

use crate::models::{FeedMode, PostId};

/// Ordered, duplicate-free ids of one feed mode, plus the paging cursor.
#[derive(Debug, Clone, Default)]
pub struct PostIdQueue {
    mode: FeedMode,
    ids: Vec<PostId>,
    seen: HashSet<PostId>,
    next_skip: usize,
    exhausted: bool,
}

impl PostIdQueue {
    pub fn new(mode: FeedMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> FeedMode {
        self.mode
    }

    /// Appends ids not seen before, keeping server order. Returns the ids that
    /// were actually added.
    pub fn append_page(&mut self, page: &[PostId]) -> Vec<PostId> {
        self.next_skip += page.len();
        let mut added = Vec::new();
        for id in page {
            if self.seen.insert(*id) {
                self.ids.push(*id);
                added.push(*id);
            }
        }
        added
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.seen.clear();
        self.next_skip = 0;
        self.exhausted = false;
    }

    pub fn reset(&mut self, mode: FeedMode) {
        self.clear();
        self.mode = mode;
    }

    pub fn ids(&self) -> &[PostId] {
        &self.ids
    }

    pub fn contains(&self, id: PostId) -> bool {
        self.seen.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Offset to request the next page from.
    pub fn next_skip(&self) -> usize {
        self.next_skip
    }

    pub fn mark_exhausted(&mut self) {
        self.exhausted = true;
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[i64]) -> Vec<PostId> {
        raw.iter().copied().map(PostId).collect()
    }

    #[test]
    fn overlapping_page_is_deduplicated() {
        let mut queue = PostIdQueue::new(FeedMode::Latest);
        queue.append_page(&ids(&[10, 20, 30]));
        let added = queue.append_page(&ids(&[20, 30, 40]));
        assert_eq!(added, ids(&[40]));
        assert_eq!(queue.ids(), ids(&[10, 20, 30, 40]).as_slice());
    }

    #[test]
    fn duplicates_within_a_page_keep_first_position() {
        let mut queue = PostIdQueue::new(FeedMode::Latest);
        queue.append_page(&ids(&[3, 1, 3, 2, 1]));
        assert_eq!(queue.ids(), ids(&[3, 1, 2]).as_slice());
    }

    #[test]
    fn cursor_counts_received_ids() {
        let mut queue = PostIdQueue::new(FeedMode::Following);
        queue.append_page(&ids(&[1, 2]));
        queue.append_page(&ids(&[2, 3]));
        assert_eq!(queue.next_skip(), 4);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn reset_empties_and_switches_mode() {
        let mut queue = PostIdQueue::new(FeedMode::Latest);
        queue.append_page(&ids(&[1, 2]));
        queue.mark_exhausted();
        queue.reset(FeedMode::Recommended);
        assert!(queue.is_empty());
        assert_eq!(queue.next_skip(), 0);
        assert!(!queue.is_exhausted());
        assert!(!queue.contains(PostId(1)));
        assert_eq!(queue.mode(), FeedMode::Recommended);
    }
}
