//! URL handling module for Sumi-Harvest
//!
//! This module provides URL normalization, domain extraction, and the
//! allow-list that bounds which hosts a crawl may touch.

mod domain;
mod matcher;
mod normalize;

pub use domain::extract_domain;
pub use matcher::{matches_wildcard, AllowedDomains};
pub use normalize::{normalize_parsed, normalize_url};
