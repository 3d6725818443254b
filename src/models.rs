use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub i64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-computed summary of a post as seen by the current viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub creator_id: UserId,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_user_name: String,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub comments_count: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub media_count: usize,
}

impl Post {
    pub fn display_author(&self) -> &str {
        match self.author_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.trim(),
            _ => self.author_user_name.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    #[serde(default)]
    pub author_user_name: String,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub has_author_photo: bool,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub likes: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn liked_by(&self, user: UserId) -> bool {
        self.likes.contains(&user)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    #[default]
    Latest,
    Following,
    Recommended,
}

impl FeedMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedMode::Latest => "latest",
            FeedMode::Following => "following",
            FeedMode::Recommended => "recommended",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FeedMode::Latest => "Latest",
            FeedMode::Following => "Following",
            FeedMode::Recommended => "For you",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "latest" | "new" => Some(FeedMode::Latest),
            "following" => Some(FeedMode::Following),
            "recommended" | "foryou" => Some(FeedMode::Recommended),
            _ => None,
        }
    }
}

/// Id listings come back either bare or wrapped in `{ "postIds": [...] }`
/// depending on the endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IdPage {
    Bare(Vec<PostId>),
    Wrapped {
        #[serde(rename = "postIds")]
        post_ids: Vec<PostId>,
    },
}

impl IdPage {
    pub fn into_ids(self) -> Vec<PostId> {
        match self {
            IdPage::Bare(ids) => ids,
            IdPage::Wrapped { post_ids } => post_ids,
        }
    }
}

/// Body of `GET /Posts/optimized/{id}/media/{index}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaPayload {
    #[serde(rename = "type", default)]
    pub mime: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn from_mime(mime: &str) -> Self {
        if mime.trim().to_ascii_lowercase().starts_with("video") {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }
}

pub const MEDIA_ERROR_SRC: &str = "error";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Index of the item within its post, as a string.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub src: String,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl MediaItem {
    pub fn from_payload(index: usize, payload: MediaPayload) -> Self {
        Self {
            id: index.to_string(),
            kind: MediaKind::from_mime(&payload.mime),
            src: payload.url,
            alt: None,
            title: None,
        }
    }

    /// Placeholder that keeps a failed index in the gallery.
    pub fn error(index: usize) -> Self {
        Self {
            id: index.to_string(),
            kind: MediaKind::Image,
            src: MEDIA_ERROR_SRC.to_string(),
            alt: Some("Media failed to load".to_string()),
            title: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.src == MEDIA_ERROR_SRC
    }
}
