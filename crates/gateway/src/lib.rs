//! HTTP surface for the reading proxy.
//!
//! `GET /<url>` renders the page in a browser and answers with its readable
//! text; `GET /robots.txt` answers a fixed allow-all policy.

pub mod response;
pub mod server;
pub mod state;

pub use {
    server::{build_app, serve, shutdown_signal, start_gateway},
    state::AppState,
};
