use crate::models::{Comment, CommentId, PostId, UserId};

/// Comments of one post as shown in an open comments panel. Not shared
/// between views; every panel loads its own copy.
#[derive(Debug, Clone)]
pub struct CommentsView {
    post_id: PostId,
    comments: Vec<Comment>,
    loading: bool,
    error: Option<String>,
}

impl CommentsView {
    pub fn new(post_id: PostId) -> Self {
        Self {
            post_id,
            comments: Vec::new(),
            loading: true,
            error: None,
        }
    }

    pub fn post_id(&self) -> PostId {
        self.post_id
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn find(&self, id: CommentId) -> Option<&Comment> {
        self.comments.iter().find(|comment| comment.id == id)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn begin_reload(&mut self) {
        self.loading = true;
    }

    pub fn replace(&mut self, comments: Vec<Comment>) {
        self.comments = comments
            .into_iter()
            .filter(|comment| comment.post_id == self.post_id)
            .collect();
        self.loading = false;
        self.error = None;
    }

    /// Keeps whatever was shown before the failed load.
    pub fn fail(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
    }

    /// Flips `viewer`'s like locally and returns the new state. No server
    /// confirmation is awaited.
    pub fn toggle_like(&mut self, id: CommentId, viewer: UserId) -> Option<bool> {
        let comment = self.comments.iter_mut().find(|comment| comment.id == id)?;
        if let Some(pos) = comment.likes.iter().position(|user| *user == viewer) {
            comment.likes.remove(pos);
            Some(false)
        } else {
            comment.likes.push(viewer);
            Some(true)
        }
    }
}
