//! Utility functions for common operations.
//!
//! - **URL validation**: backend/proxy targets and item links
//! - **Text processing**: terminal-width truncation and control-char stripping

mod text;
mod url_validator;

pub use text::{collate, display_width, html_to_text, strip_control_chars, truncate_to_width};
pub use url_validator::{validate_backend_url, validate_url_for_open, UrlValidationError};

/// Maximum accepted length of a free-text query.
pub const MAX_QUERY_LENGTH: usize = 256;
