#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod cache;
pub mod comments;
pub mod config;
pub mod coordination;
pub mod data;
pub mod feed;
pub mod gateway;
pub mod gesture;
pub mod media;
pub mod models;
pub mod queue;
pub mod session;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::{run, RunOptions};
