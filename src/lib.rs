//! Tab-Snip: drag-select a square region of the visible tab and get a
//! cropped screenshot back.
//!
//! This crate wires together:
//! - Selection overlay state machine, page side (selection/)
//! - Capture service: tab capture, crop, encode, save (capture/)
//! - The request/response channel between the two (channel.rs)
//! - Launcher for the foreground tab (launcher.rs)

pub mod capture;
pub mod channel;
pub mod config;
pub mod launcher;
pub mod protocol;
pub mod selection;

pub use config::Settings;

/// Initialise `env_logger`, defaulting to `info`. Safe to call twice.
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialised");
    }
}
