//! Static assets compiled into the binary.

/// Listing page stylesheet.
pub const STYLES_CSS: &str = include_str!("../../static/styles.css");

pub const STYLES_CSS_CONTENT_TYPE: &str = "text/css; charset=utf-8";

/// Any request path ending in this suffix is answered with [`STYLES_CSS`], so
/// the relative link in a listing resolves at every depth.
pub const STYLES_CSS_SUFFIX: &str = "/_static/styles.css";
