//! Router configuration for the file server.
//!
//! Every path is handled by the same handler, so the route table only
//! separates the root from everything below it:
//!
//! ```text
//! /            - root directory listing
//! /{*path}     - any file or directory below the root
//! ```
//!
//! Both routes answer `GET` and `HEAD`; other methods get 405.
//!
//! # Example
//!
//! ```ignore
//! use fileserver::server::routes::{create_router, RouterConfig};
//! use fileserver::vfs::DiskFs;
//!
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(DiskFs::read_only("./content"), config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{routing::get, Router};
use http::header::{CONTENT_TYPE, IF_MODIFIED_SINCE, RANGE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{serve_handler, AppState};
use crate::listing::ListingRenderer;
use crate::vfs::Vfs;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router serving `vfs` with the built-in HTML
/// listing page.
pub fn create_router<V: Vfs>(vfs: V, config: RouterConfig) -> Router {
    build_router(AppState::new(vfs), &config)
}

/// Create the application router with a custom listing renderer.
pub fn create_router_with_renderer<V, R>(vfs: V, renderer: R, config: RouterConfig) -> Router
where
    V: Vfs,
    R: ListingRenderer + 'static,
{
    build_router(AppState::new(vfs).with_renderer(renderer), &config)
}

fn build_router<V: Vfs>(app_state: AppState<V>, config: &RouterConfig) -> Router {
    let router = Router::new()
        .route("/", get(serve_handler::<V>))
        .route("/{*path}", get(serve_handler::<V>))
        .with_state(app_state)
        .layer(build_cors_layer(config));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, RANGE, IF_MODIFIED_SINCE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
