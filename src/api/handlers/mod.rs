//! API request handlers.
//!
//! This module contains all HTTP request handlers organized by functionality.

/// Health check handler.
pub mod health;
/// Research report lifecycle handlers (create, poll, stream, delete, list).
pub mod reports;
