use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::config;
use crate::coordination;
use crate::data::Services;
use crate::feed::{self, Feed, Notice};
use crate::gateway::{Gateway, GatewayConfig};
use crate::models::{FeedMode, Post};
use crate::session;

const PREVIEW_WIDTH: usize = 72;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Overrides the configured feed mode.
    pub mode: Option<FeedMode>,
}

/// Loads one page of the feed against the configured server and prints it.
pub fn run(options: RunOptions) -> Result<()> {
    let config_path = config::default_path();
    let cfg = config::load(config::LoadOptions::default())
        .with_context(|| format!("load config from {}", friendly_path(config_path.as_ref())))?;

    let gateway = Gateway::new(GatewayConfig {
        base_url: cfg.api.base_url.clone(),
        user_agent: cfg.api.user_agent.clone(),
        timeout: cfg.api.timeout,
        http_client: None,
    })
    .context("create api gateway")?;

    let session = Arc::new(match cfg.session.credentials() {
        Some(creds) => session::Manager::with_credentials(creds),
        None => session::Manager::new(),
    });

    let mode = options.mode.unwrap_or(cfg.feed.mode);
    let mut feed = Feed::new(feed::Options {
        services: Services::from_gateway(Arc::new(gateway)),
        session,
        ui: coordination::Context::new(),
        mode,
        page_size: cfg.feed.page_size,
        media: (&cfg.media).into(),
    })
    .context("start feed")?;

    feed.switch_mode(mode);
    if !wait_for_responses(&mut feed, cfg.api.timeout) {
        bail!("timed out loading the {} feed", mode.as_str());
    }
    let ids = feed.queue().ids().to_vec();
    feed.hydrate(&ids);
    if !wait_for_responses(&mut feed, cfg.api.timeout) {
        bail!("timed out loading post summaries");
    }

    let notices = feed.take_notices();
    for notice in &notices {
        match notice {
            Notice::Info(message) => log::info!("{message}"),
            Notice::Error(message) => eprintln!("warning: {message}"),
        }
    }

    let posts = feed.visible_posts();
    if posts.is_empty() {
        if let Some(Notice::Error(message)) = notices.first() {
            bail!("{message}");
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{} feed ({} posts)", mode.display_name(), posts.len())?;
    for post in posts {
        writeln!(out, "{}", format_post_line(post))?;
    }
    Ok(())
}

/// With a request timeout every stage is bounded by it plus some slack;
/// without one the pass waits for as long as requests are pending.
fn wait_for_responses(feed: &mut Feed, timeout: Option<Duration>) -> bool {
    match timeout {
        Some(timeout) => feed.settle(timeout + Duration::from_secs(5)),
        None => {
            while !feed.is_idle() {
                feed.pump(Duration::from_secs(1));
            }
            true
        }
    }
}

fn format_post_line(post: &Post) -> String {
    let first_line = post.text.lines().next().unwrap_or("").trim();
    let preview: String = if first_line.chars().count() > PREVIEW_WIDTH {
        let cut: String = first_line.chars().take(PREVIEW_WIDTH - 3).collect();
        format!("{cut}...")
    } else {
        first_line.to_string()
    };
    let media = if post.media_count > 0 {
        format!(" [{} media]", post.media_count)
    } else {
        String::new()
    };
    format!(
        "#{} @{}  {} likes, {} comments{}  {}",
        post.id, post.author_user_name, post.likes_count, post.comments_count, media, preview
    )
}

fn friendly_path(path: Option<&std::path::PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/postline/config.yaml".to_string()
    }
}
