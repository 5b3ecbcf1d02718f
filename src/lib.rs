pub mod auth;
pub mod azure;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod poster;
pub mod pr_url;
pub mod test_helpers;
pub mod threads;
