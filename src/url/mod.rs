//! URL handling module
//!
//! This module builds seed search URLs from keywords, resolves links found on
//! result pages, and wraps requests for the optional proxy gateway.

mod resolve;
mod slug;

// Re-export main functions
pub use resolve::{build_seed_url, proxied_url, resolve_href};
pub use slug::{file_slug, slugify_keyword, LIST_SEPARATOR};
