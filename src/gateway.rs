use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::models::{
    Comment, CommentId, FeedMode, IdPage, MediaPayload, Post, PostId, UserId,
};
use crate::session::Credentials;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api/";

const SERVER_DOWN_STATUS: u16 = 521;

/// Every transport failure is folded into one of these before it leaves the
/// gateway, so callers never look at raw status codes.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("cannot reach the server: {0}")]
    Network(String),
    #[error("the server is temporarily down (HTTP 521)")]
    ServerDown,
    #[error("request failed with HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request timed out")]
    Timeout,
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
}

impl GatewayError {
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Network(_) => {
                "Unable to connect. Check your internet connection.".to_string()
            }
            GatewayError::ServerDown => {
                "The server is down at the moment. Try again later.".to_string()
            }
            GatewayError::Status { status, .. } if *status == 401 || *status == 403 => {
                "You are not allowed to do that. Please sign in again.".to_string()
            }
            GatewayError::Status { status, .. } if *status == 404 => {
                "That content no longer exists.".to_string()
            }
            GatewayError::Status { status, .. } => format!("Request failed ({status})."),
            GatewayError::Timeout => "The request took too long. Try again.".to_string(),
            GatewayError::Decode(_) => "Received an unexpected response.".to_string(),
            GatewayError::InvalidUrl(_) => "Request could not be built.".to_string(),
        }
    }

    pub fn from_status(status: u16, body: String) -> Self {
        if status == SERVER_DOWN_STATUS {
            GatewayError::ServerDown
        } else {
            GatewayError::Status { status, body }
        }
    }

    fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            GatewayError::from_status(status.as_u16(), String::new())
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub user_agent: String,
    /// Whole-request limit. None leaves requests unbounded.
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Authed<'a, T: Serialize> {
    token: &'a str,
    user_id: UserId,
    #[serde(flatten)]
    payload: T,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PostRef {
    post_id: PostId,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CommentRef {
    comment_id: CommentId,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct NewComment<'a> {
    post_id: PostId,
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct FollowTarget {
    target_user_id: UserId,
}

pub struct Gateway {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("gateway: user agent required");
        }
        let mut base = if config.base_url.trim().is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            config.base_url.trim().to_string()
        };
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url =
            Url::parse(&base).with_context(|| format!("gateway: parse base url {base:?}"))?;
        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout)
                .build()
                .context("gateway: build http client")?,
        };

        Ok(Gateway {
            http,
            user_agent: config.user_agent,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn post_summary(
        &self,
        post_id: PostId,
        viewer: Option<UserId>,
    ) -> Result<Post, GatewayError> {
        let path = format!("Posts/optimized/{post_id}/summary");
        let params = viewer
            .map(|id| vec![("currentUserId".to_string(), id.to_string())])
            .unwrap_or_default();
        self.get_json(&path, &params)
    }

    pub fn post_media(&self, post_id: PostId, index: usize) -> Result<MediaPayload, GatewayError> {
        let path = format!("Posts/optimized/{post_id}/media/{index}");
        self.get_json(&path, &[])
    }

    pub fn post_ids(
        &self,
        mode: FeedMode,
        skip: usize,
        limit: usize,
        viewer: Option<UserId>,
    ) -> Result<Vec<PostId>, GatewayError> {
        let (path, params) = id_listing_request(mode, skip, limit, viewer);
        let page: IdPage = self.get_json(path, &params)?;
        Ok(page.into_ids())
    }

    pub fn post_comments(
        &self,
        post_id: PostId,
        viewer: Option<UserId>,
    ) -> Result<Vec<Comment>, GatewayError> {
        let path = format!("comment/post/{post_id}");
        let params = viewer
            .map(|id| vec![("currentUserId".to_string(), id.to_string())])
            .unwrap_or_default();
        self.get_json(&path, &params)
    }

    pub fn toggle_like(&self, creds: &Credentials, post_id: PostId) -> Result<(), GatewayError> {
        self.mutate(Method::POST, "PostPublic/like/toggle", creds, PostRef { post_id })
    }

    pub fn like_comment(
        &self,
        creds: &Credentials,
        comment_id: CommentId,
    ) -> Result<(), GatewayError> {
        self.mutate(Method::POST, "comment/like", creds, CommentRef { comment_id })
    }

    pub fn create_comment(
        &self,
        creds: &Credentials,
        post_id: PostId,
        text: &str,
    ) -> Result<(), GatewayError> {
        self.mutate(
            Method::POST,
            "comment/create",
            creds,
            NewComment { post_id, text },
        )
    }

    pub fn delete_comment(
        &self,
        creds: &Credentials,
        comment_id: CommentId,
    ) -> Result<(), GatewayError> {
        self.mutate(Method::DELETE, "comment/delete", creds, CommentRef { comment_id })
    }

    pub fn follow(&self, creds: &Credentials, target: UserId) -> Result<(), GatewayError> {
        self.mutate(
            Method::POST,
            "follow/follow",
            creds,
            FollowTarget {
                target_user_id: target,
            },
        )
    }

    pub fn unfollow(&self, creds: &Credentials, target: UserId) -> Result<(), GatewayError> {
        self.mutate(
            Method::POST,
            "follow/unfollow",
            creds,
            FollowTarget {
                target_user_id: target,
            },
        )
    }

    pub fn endpoint(&self, path: &str, params: &[(String, String)]) -> Result<Url, GatewayError> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| GatewayError::InvalidUrl(format!("{path}: {err}")))?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    fn get_json<T>(&self, path: &str, params: &[(String, String)]) -> Result<T, GatewayError>
    where
        T: DeserializeOwned,
    {
        let resp = self.send(Method::GET, path, params, None::<&()>)?;
        decode(resp)
    }

    fn mutate<T: Serialize>(
        &self,
        method: Method,
        path: &str,
        creds: &Credentials,
        payload: T,
    ) -> Result<(), GatewayError> {
        let body = Authed {
            token: creds.token.as_str(),
            user_id: creds.user_id,
            payload,
        };
        self.send(method, path, &[], Some(&body))?;
        Ok(())
    }

    fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        body: Option<&B>,
    ) -> Result<Response, GatewayError> {
        let url = self.endpoint(path, params)?;
        log::debug!("gateway: {method} {url}");

        let mut req = self
            .http
            .request(method.clone(), url)
            .header(USER_AGENT, self.user_agent.clone())
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().map_err(|err| {
            let err = GatewayError::from_transport(err);
            log::warn!("gateway: {method} {path} failed: {err}");
            err
        })?;
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().unwrap_or_default();
            let err = GatewayError::from_status(status, body);
            log::warn!("gateway: {method} {path} failed: {err}");
            Err(err)
        }
    }
}

fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, GatewayError> {
    let text = resp.text().map_err(GatewayError::from_transport)?;
    serde_json::from_str(&text).map_err(|err| GatewayError::Decode(err.to_string()))
}

fn id_listing_request(
    mode: FeedMode,
    skip: usize,
    limit: usize,
    viewer: Option<UserId>,
) -> (&'static str, Vec<(String, String)>) {
    let mut params = Vec::new();
    let path = match mode {
        FeedMode::Latest => "Posts/optimized/latest-ids",
        FeedMode::Following => "feed/following-posts-ids",
        FeedMode::Recommended => "Recommendation/posts",
    };
    if mode != FeedMode::Latest {
        if let Some(id) = viewer {
            params.push(("userId".to_string(), id.to_string()));
        }
    }
    params.push(("skip".to_string(), skip.to_string()));
    params.push(("limit".to_string(), limit.to_string()));
    (path, params)
}
