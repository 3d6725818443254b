use std::collections::HashMap;

use crate::models::{Post, PostId};

/// Ticket handed out when a summary fetch is dispatched. Only the most recent
/// ticket for a post may write its response into the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Stamp(u64);

/// Normalized store of post summaries, one entry per id, in insertion order.
#[derive(Debug, Default)]
pub struct PostCache {
    posts: Vec<Post>,
    pending: HashMap<PostId, Stamp>,
    next_stamp: u64,
}

impl PostCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces an existing entry in place, or appends a new one.
    pub fn upsert(&mut self, post: Post) {
        match self.posts.iter_mut().find(|existing| existing.id == post.id) {
            Some(existing) => *existing = post,
            None => self.posts.push(post),
        }
    }

    pub fn remove(&mut self, id: PostId) -> Option<Post> {
        self.pending.remove(&id);
        let index = self.posts.iter().position(|post| post.id == id)?;
        Some(self.posts.remove(index))
    }

    pub fn find_by_id(&self, id: PostId) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == id)
    }

    pub fn contains(&self, id: PostId) -> bool {
        self.find_by_id(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Post> {
        self.posts.iter()
    }

    pub fn begin_fetch(&mut self, id: PostId) -> Stamp {
        self.next_stamp = self.next_stamp.wrapping_add(1);
        let stamp = Stamp(self.next_stamp);
        self.pending.insert(id, stamp);
        stamp
    }

    pub fn fetch_in_flight(&self, id: PostId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Applies a fetched summary if `stamp` is the latest one issued for the
    /// post. Returns whether the cache changed.
    pub fn apply_fetch(&mut self, stamp: Stamp, post: Post) -> bool {
        if self.pending.get(&post.id) != Some(&stamp) {
            return false;
        }
        self.pending.remove(&post.id);
        self.upsert(post);
        true
    }

    /// Drops the pending marker after a failed fetch; the cached entry, if
    /// any, is left as it was.
    pub fn abandon_fetch(&mut self, id: PostId, stamp: Stamp) -> bool {
        if self.pending.get(&id) != Some(&stamp) {
            return false;
        }
        self.pending.remove(&id);
        true
    }

    pub fn clear(&mut self) {
        self.posts.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample_post;

    #[test]
    fn upsert_twice_keeps_one_entry() {
        let mut cache = PostCache::new();
        let post = sample_post(1, 0);
        cache.upsert(post.clone());
        cache.upsert(post.clone());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.find_by_id(PostId(1)), Some(&post));
    }

    #[test]
    fn upsert_replaces_all_fields() {
        let mut cache = PostCache::new();
        let mut old = sample_post(5, 0);
        old.likes_count = 3;
        old.is_liked = false;
        cache.upsert(old.clone());

        let mut fresh = old.clone();
        fresh.likes_count = 4;
        fresh.is_liked = true;
        fresh.text = "edited".into();
        cache.upsert(fresh.clone());

        let found = cache.find_by_id(PostId(5)).unwrap();
        assert_eq!(found.likes_count, 4);
        assert!(found.is_liked);
        assert_eq!(found, &fresh);
    }

    #[test]
    fn upsert_preserves_order_of_others() {
        let mut cache = PostCache::new();
        for id in 1..=3 {
            cache.upsert(sample_post(id, 0));
        }
        let mut updated = sample_post(2, 0);
        updated.likes_count = 10;
        cache.upsert(updated);
        let ids: Vec<_> = cache.iter().map(|post| post.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut cache = PostCache::new();
        cache.upsert(sample_post(1, 0));
        assert!(cache.remove(PostId(1)).is_some());
        assert!(cache.remove(PostId(1)).is_none());
        assert!(cache.find_by_id(PostId(1)).is_none());
    }

    #[test]
    fn stale_fetch_is_discarded() {
        let mut cache = PostCache::new();
        let first = cache.begin_fetch(PostId(7));
        let second = cache.begin_fetch(PostId(7));

        let mut newer = sample_post(7, 0);
        newer.likes_count = 2;
        assert!(cache.apply_fetch(second, newer));

        let mut stale = sample_post(7, 0);
        stale.likes_count = 1;
        assert!(!cache.apply_fetch(first, stale));
        assert_eq!(cache.find_by_id(PostId(7)).unwrap().likes_count, 2);
        assert!(!cache.fetch_in_flight(PostId(7)));
    }

    #[test]
    fn failed_fetch_keeps_existing_entry() {
        let mut cache = PostCache::new();
        cache.upsert(sample_post(3, 0));
        let stamp = cache.begin_fetch(PostId(3));
        assert!(cache.abandon_fetch(PostId(3), stamp));
        assert!(cache.contains(PostId(3)));
        assert!(!cache.fetch_in_flight(PostId(3)));
    }

    #[test]
    fn removed_post_ignores_late_fetch() {
        let mut cache = PostCache::new();
        cache.upsert(sample_post(4, 0));
        let stamp = cache.begin_fetch(PostId(4));
        cache.remove(PostId(4));
        assert!(!cache.apply_fetch(stamp, sample_post(4, 0)));
        assert!(cache.is_empty());
    }
}
