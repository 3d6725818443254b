use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use parking_lot::Mutex;

use crate::gateway::{Gateway, GatewayError};
use crate::models::{
    Comment, CommentId, FeedMode, MediaItem, MediaKind, Post, PostId, UserId,
};
use crate::session::{Credentials, SessionError};

pub trait FeedService: Send + Sync {
    fn load_ids(
        &self,
        mode: FeedMode,
        skip: usize,
        limit: usize,
        viewer: Option<UserId>,
    ) -> Result<Vec<PostId>>;
}

pub trait PostService: Send + Sync {
    fn summary(&self, post_id: PostId, viewer: Option<UserId>) -> Result<Post>;
    fn media(&self, post_id: PostId, index: usize) -> Result<MediaItem>;
}

pub trait InteractionService: Send + Sync {
    fn toggle_like(&self, creds: &Credentials, post_id: PostId) -> Result<()>;
    fn like_comment(&self, creds: &Credentials, comment_id: CommentId) -> Result<()>;
    fn create_comment(&self, creds: &Credentials, post_id: PostId, text: &str) -> Result<()>;
    fn delete_comment(&self, creds: &Credentials, comment_id: CommentId) -> Result<()>;
    fn follow(&self, creds: &Credentials, target: UserId) -> Result<()>;
    fn unfollow(&self, creds: &Credentials, target: UserId) -> Result<()>;
}

pub trait CommentService: Send + Sync {
    fn load_comments(&self, post_id: PostId, viewer: Option<UserId>) -> Result<Vec<Comment>>;
}

/// The set of backends a feed controller talks to.
#[derive(Clone)]
pub struct Services {
    pub feed: Arc<dyn FeedService>,
    pub posts: Arc<dyn PostService>,
    pub interactions: Arc<dyn InteractionService>,
    pub comments: Arc<dyn CommentService>,
}

impl Services {
    pub fn from_gateway(gateway: Arc<Gateway>) -> Self {
        Self {
            feed: Arc::new(GatewayFeedService::new(gateway.clone())),
            posts: Arc::new(GatewayPostService::new(gateway.clone())),
            interactions: Arc::new(GatewayInteractionService::new(gateway.clone())),
            comments: Arc::new(GatewayCommentService::new(gateway)),
        }
    }

    pub fn from_mock(backend: Arc<MockBackend>) -> Self {
        Self {
            feed: backend.clone(),
            posts: backend.clone(),
            interactions: backend.clone(),
            comments: backend,
        }
    }
}

/// Short text suitable for a toast; gateway failures use their friendly form.
pub fn describe_error(err: &anyhow::Error) -> String {
    if let Some(gateway) = err.downcast_ref::<GatewayError>() {
        return gateway.user_message();
    }
    if let Some(session) = err.downcast_ref::<SessionError>() {
        return format!("Sign in required: {session}.");
    }
    err.to_string()
}

pub struct GatewayFeedService {
    gateway: Arc<Gateway>,
}

impl GatewayFeedService {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

impl FeedService for GatewayFeedService {
    fn load_ids(
        &self,
        mode: FeedMode,
        skip: usize,
        limit: usize,
        viewer: Option<UserId>,
    ) -> Result<Vec<PostId>> {
        self.gateway
            .post_ids(mode, skip, limit, viewer)
            .with_context(|| format!("fetch {} post ids", mode.as_str()))
    }
}

pub struct GatewayPostService {
    gateway: Arc<Gateway>,
}

impl GatewayPostService {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

impl PostService for GatewayPostService {
    fn summary(&self, post_id: PostId, viewer: Option<UserId>) -> Result<Post> {
        self.gateway
            .post_summary(post_id, viewer)
            .with_context(|| format!("fetch summary of post {post_id}"))
    }

    fn media(&self, post_id: PostId, index: usize) -> Result<MediaItem> {
        let payload = self
            .gateway
            .post_media(post_id, index)
            .with_context(|| format!("fetch media {index} of post {post_id}"))?;
        if payload.url.trim().is_empty() {
            bail!("media {index} of post {post_id} has no url");
        }
        Ok(MediaItem::from_payload(index, payload))
    }
}

pub struct GatewayInteractionService {
    gateway: Arc<Gateway>,
}

impl GatewayInteractionService {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

impl InteractionService for GatewayInteractionService {
    fn toggle_like(&self, creds: &Credentials, post_id: PostId) -> Result<()> {
        self.gateway
            .toggle_like(creds, post_id)
            .context("toggle post like")
    }

    fn like_comment(&self, creds: &Credentials, comment_id: CommentId) -> Result<()> {
        self.gateway
            .like_comment(creds, comment_id)
            .context("like comment")
    }

    fn create_comment(&self, creds: &Credentials, post_id: PostId, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            bail!("comment text is required");
        }
        self.gateway
            .create_comment(creds, post_id, text)
            .context("create comment")
    }

    fn delete_comment(&self, creds: &Credentials, comment_id: CommentId) -> Result<()> {
        self.gateway
            .delete_comment(creds, comment_id)
            .context("delete comment")
    }

    fn follow(&self, creds: &Credentials, target: UserId) -> Result<()> {
        self.gateway.follow(creds, target).context("follow user")
    }

    fn unfollow(&self, creds: &Credentials, target: UserId) -> Result<()> {
        self.gateway.unfollow(creds, target).context("unfollow user")
    }
}

pub struct GatewayCommentService {
    gateway: Arc<Gateway>,
}

impl GatewayCommentService {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

impl CommentService for GatewayCommentService {
    fn load_comments(&self, post_id: PostId, viewer: Option<UserId>) -> Result<Vec<Comment>> {
        self.gateway
            .post_comments(post_id, viewer)
            .with_context(|| format!("fetch comments of post {post_id}"))
    }
}

/// In-memory backend for offline runs and tests.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    posts: HashMap<PostId, Post>,
    feeds: HashMap<FeedMode, Vec<PostId>>,
    media: HashMap<(PostId, usize), String>,
    failing_media: HashSet<(PostId, usize)>,
    comments: HashMap<PostId, Vec<Comment>>,
    follows: HashSet<UserId>,
    next_comment_id: i64,
    summary_calls: HashMap<PostId, usize>,
    like_calls: HashMap<PostId, usize>,
    comment_like_calls: usize,
    fail_mutations: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_post(self, post: Post) -> Self {
        self.state.lock().posts.insert(post.id, post);
        self
    }

    pub fn with_feed(self, mode: FeedMode, ids: Vec<PostId>) -> Self {
        self.state.lock().feeds.insert(mode, ids);
        self
    }

    pub fn with_media(self, post_id: PostId, index: usize, src: &str) -> Self {
        self.state.lock().media.insert((post_id, index), src.to_string());
        self
    }

    pub fn with_failing_media(self, post_id: PostId, index: usize) -> Self {
        self.state.lock().failing_media.insert((post_id, index));
        self
    }

    pub fn with_comment(self, comment: Comment) -> Self {
        {
            let mut state = self.state.lock();
            state.next_comment_id = state.next_comment_id.max(comment.id.0);
            state
                .comments
                .entry(comment.post_id)
                .or_default()
                .push(comment);
        }
        self
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.state.lock().fail_mutations = fail;
    }

    pub fn summary_calls(&self, post_id: PostId) -> usize {
        self.state
            .lock()
            .summary_calls
            .get(&post_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn like_calls(&self, post_id: PostId) -> usize {
        self.state
            .lock()
            .like_calls
            .get(&post_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn comment_like_calls(&self) -> usize {
        self.state.lock().comment_like_calls
    }

    pub fn is_following(&self, user: UserId) -> bool {
        self.state.lock().follows.contains(&user)
    }

    pub fn set_post(&self, post: Post) {
        self.state.lock().posts.insert(post.id, post);
    }

    fn check_mutation(state: &MockState) -> Result<()> {
        if state.fail_mutations {
            return Err(GatewayError::from_status(500, "mock failure".into()))
                .context("mock mutation");
        }
        Ok(())
    }
}

impl FeedService for MockBackend {
    fn load_ids(
        &self,
        mode: FeedMode,
        skip: usize,
        limit: usize,
        _viewer: Option<UserId>,
    ) -> Result<Vec<PostId>> {
        let state = self.state.lock();
        let ids = state.feeds.get(&mode).cloned().unwrap_or_default();
        Ok(ids.into_iter().skip(skip).take(limit).collect())
    }
}

impl PostService for MockBackend {
    fn summary(&self, post_id: PostId, _viewer: Option<UserId>) -> Result<Post> {
        let mut state = self.state.lock();
        *state.summary_calls.entry(post_id).or_default() += 1;
        state
            .posts
            .get(&post_id)
            .cloned()
            .ok_or_else(|| anyhow!(GatewayError::from_status(404, format!("post {post_id}"))))
    }

    fn media(&self, post_id: PostId, index: usize) -> Result<MediaItem> {
        let state = self.state.lock();
        if state.failing_media.contains(&(post_id, index)) {
            return Err(GatewayError::Timeout)
                .with_context(|| format!("fetch media {index} of post {post_id}"));
        }
        let src = state
            .media
            .get(&(post_id, index))
            .cloned()
            .ok_or_else(|| anyhow!("media {index} of post {post_id} missing"))?;
        let kind = if src.ends_with(".mp4") {
            MediaKind::Video
        } else {
            MediaKind::Image
        };
        Ok(MediaItem {
            id: index.to_string(),
            kind,
            src,
            alt: None,
            title: None,
        })
    }
}

impl InteractionService for MockBackend {
    fn toggle_like(&self, _creds: &Credentials, post_id: PostId) -> Result<()> {
        let mut state = self.state.lock();
        Self::check_mutation(&state)?;
        *state.like_calls.entry(post_id).or_default() += 1;
        let post = state
            .posts
            .get_mut(&post_id)
            .ok_or_else(|| anyhow!("post {post_id} missing"))?;
        post.is_liked = !post.is_liked;
        post.likes_count += if post.is_liked { 1 } else { -1 };
        Ok(())
    }

    fn like_comment(&self, creds: &Credentials, comment_id: CommentId) -> Result<()> {
        let mut state = self.state.lock();
        Self::check_mutation(&state)?;
        state.comment_like_calls += 1;
        for comment in state.comments.values_mut().flatten() {
            if comment.id == comment_id {
                if let Some(pos) = comment.likes.iter().position(|id| *id == creds.user_id) {
                    comment.likes.remove(pos);
                } else {
                    comment.likes.push(creds.user_id);
                }
            }
        }
        Ok(())
    }

    fn create_comment(&self, creds: &Credentials, post_id: PostId, text: &str) -> Result<()> {
        let mut state = self.state.lock();
        Self::check_mutation(&state)?;
        state.next_comment_id += 1;
        let comment = Comment {
            id: CommentId(state.next_comment_id),
            post_id,
            author_id: creds.user_id,
            author_user_name: format!("user{}", creds.user_id),
            author_name: None,
            has_author_photo: false,
            text: text.to_string(),
            likes: Vec::new(),
            created_at: Utc::now(),
        };
        state.comments.entry(post_id).or_default().push(comment);
        if let Some(post) = state.posts.get_mut(&post_id) {
            post.comments_count += 1;
        }
        Ok(())
    }

    fn delete_comment(&self, _creds: &Credentials, comment_id: CommentId) -> Result<()> {
        let mut state = self.state.lock();
        Self::check_mutation(&state)?;
        let mut owner = None;
        for (post_id, comments) in state.comments.iter_mut() {
            let before = comments.len();
            comments.retain(|comment| comment.id != comment_id);
            if comments.len() != before {
                owner = Some(*post_id);
            }
        }
        let post_id = owner.ok_or_else(|| anyhow!("comment {comment_id} missing"))?;
        if let Some(post) = state.posts.get_mut(&post_id) {
            post.comments_count = (post.comments_count - 1).max(0);
        }
        Ok(())
    }

    fn follow(&self, _creds: &Credentials, target: UserId) -> Result<()> {
        let mut state = self.state.lock();
        Self::check_mutation(&state)?;
        state.follows.insert(target);
        Ok(())
    }

    fn unfollow(&self, _creds: &Credentials, target: UserId) -> Result<()> {
        let mut state = self.state.lock();
        Self::check_mutation(&state)?;
        state.follows.remove(&target);
        Ok(())
    }
}

impl CommentService for MockBackend {
    fn load_comments(&self, post_id: PostId, _viewer: Option<UserId>) -> Result<Vec<Comment>> {
        Ok(self
            .state
            .lock()
            .comments
            .get(&post_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Builds a summary with sensible defaults; handy for mocks and tests.
pub fn sample_post(id: i64, media_count: usize) -> Post {
    Post {
        id: PostId(id),
        creator_id: UserId(100 + id),
        text: format!("Post number {id}"),
        author_name: None,
        author_user_name: format!("author{id}"),
        likes_count: 0,
        comments_count: 0,
        created_at: Utc::now(),
        is_liked: false,
        media_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials {
            user_id: UserId(1),
            token: "t".into(),
        }
    }

    #[test]
    fn mock_pages_respect_skip_and_limit() {
        let backend = MockBackend::new().with_feed(
            FeedMode::Latest,
            (1..=5).map(PostId).collect(),
        );
        let page = backend.load_ids(FeedMode::Latest, 2, 2, None).unwrap();
        assert_eq!(page, vec![PostId(3), PostId(4)]);
        assert!(backend
            .load_ids(FeedMode::Following, 0, 10, None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn mock_toggle_like_flips_counts() {
        let backend = MockBackend::new().with_post(sample_post(1, 0));
        backend.toggle_like(&creds(), PostId(1)).unwrap();
        let post = backend.summary(PostId(1), None).unwrap();
        assert!(post.is_liked);
        assert_eq!(post.likes_count, 1);
        assert_eq!(backend.like_calls(PostId(1)), 1);
    }

    #[test]
    fn describe_uses_gateway_message() {
        let backend = MockBackend::new();
        let err = backend.summary(PostId(42), None).unwrap_err();
        assert_eq!(describe_error(&err), "That content no longer exists.");

        let err = anyhow::Error::new(SessionError::Missing);
        assert!(describe_error(&err).starts_with("Sign in required"));
    }

    #[test]
    fn failed_mutation_surfaces_status() {
        let backend = MockBackend::new().with_post(sample_post(1, 0));
        backend.fail_mutations(true);
        let err = backend.toggle_like(&creds(), PostId(1)).unwrap_err();
        assert_eq!(describe_error(&err), "Request failed (500).");
        assert!(!backend.summary(PostId(1), None).unwrap().is_liked);
    }
}
