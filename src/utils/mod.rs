//! Utility functions.
//!
//! This module provides string sanitization for destination error messages
//! and table reference validation.

pub mod sanitize;

pub use sanitize::{is_valid_table_name, sanitize_and_truncate_error_message};
