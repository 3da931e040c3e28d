//! HTTP server layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │                 GET /{path}[?download][&q=...]                  │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │   content   │  │        routes           │  │
//! │  │ (dispatch)  │  │ (file body) │  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!          listing (pages, search)  ·  archive (zip)  ·  vfs
//! ```

pub mod assets;
pub mod content;
pub mod handlers;
pub mod routes;

pub use content::{parse_range, serve_file, ByteRange};
pub use handlers::{serve_handler, AppState, RequestQuery, ServeError};
pub use routes::{create_router, create_router_with_renderer, RouterConfig};
