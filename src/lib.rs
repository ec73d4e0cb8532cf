pub mod app;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod feed;
pub mod history;
pub mod ingest;
pub mod input;
pub mod layout;
pub mod logging;
pub mod record;
pub mod render;
pub mod scroll;
pub mod view;
