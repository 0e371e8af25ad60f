//! Works-page location and content fetching for competitor sites.
//!
//! This crate provides:
//! - [`locator`] — probes conventional path suffixes to find an origin's
//!   client-showcase page, first match wins
//! - [`fetch`] — retrieves one page and sanitizes it into a bounded
//!   plain-text budget for the extraction stage

pub mod fetch;
pub mod locator;

pub use fetch::{Fetcher, MAX_CONTENT_CHARS, PageContent};
pub use locator::{Locator, WORKS_PATHS};
