//! Spotify playlist vibe check: gateway, session, analysis lifecycle and insights.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod vibe;
