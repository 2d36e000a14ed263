//! Common utilities shared across the drinks service crates.

#![warn(clippy::pedantic)]

/// Token header inspection, size limits and clock skew handling
pub mod jwt;
