//! HTML parser for extracting fragments and links
//!
//! This module handles parsing fetched HTML to extract:
//! - Text fragments for each configured content selector
//! - Links to follow (from <a> tags)
//!
//! Everything here is synchronous and side-effect free. `scraper::Html` is not
//! `Send`, so pages are parsed and dropped before the coordinator awaits again.

use crate::output::Fragment;
use crate::url::normalize_parsed;
use crate::HarvestError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A compiled CSS selector together with the name used as fragment key
#[derive(Debug, Clone)]
pub struct ContentSelector {
    name: String,
    selector: Selector,
}

impl ContentSelector {
    /// Compiles a selector; the selector text becomes the fragment key
    ///
    /// # Example
    ///
    /// ```
    /// use sumi_harvest::crawler::ContentSelector;
    ///
    /// let paragraphs = ContentSelector::parse("p").unwrap();
    /// assert_eq!(paragraphs.name(), "p");
    /// assert!(ContentSelector::parse("p[").is_err());
    /// ```
    pub fn parse(name: &str) -> Result<Self, HarvestError> {
        let selector = Selector::parse(name).map_err(|e| HarvestError::Selector {
            selector: name.to_string(),
            message: format!("{:?}", e),
        })?;
        Ok(Self {
            name: name.to_string(),
            selector,
        })
    }

    /// Returns the fragment key for this selector
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Fragments and links extracted from one page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// Fragments in selector order, then document order
    pub fragments: Vec<Fragment>,

    /// Absolute, normalized link targets in document order
    pub links: Vec<Url>,
}

/// Parses a page body and runs every selector over it
///
/// Links are only collected when `collect_links` is set.
pub fn parse_page(
    html: &str,
    base_url: &Url,
    selectors: &[ContentSelector],
    collect_links: bool,
) -> ParsedPage {
    let document = Html::parse_document(html);

    let fragments = selectors
        .iter()
        .flat_map(|selector| extract_fragments(&document, selector))
        .collect();

    let links = if collect_links {
        extract_links(&document, base_url)
    } else {
        Vec::new()
    };

    ParsedPage { fragments, links }
}

/// Emits one fragment per element matching `selector`, in document order
///
/// The value is the element's text with markup removed and whitespace
/// collapsed to single spaces. Elements with no text still yield a fragment
/// with an empty value.
///
/// # Example
///
/// ```
/// use scraper::Html;
/// use sumi_harvest::crawler::{extract_fragments, ContentSelector};
///
/// let doc = Html::parse_document("<p>A</p><p> B\n  b </p>");
/// let fragments = extract_fragments(&doc, &ContentSelector::parse("p").unwrap());
/// assert_eq!(fragments[1].value, "B b");
/// ```
pub fn extract_fragments(document: &Html, selector: &ContentSelector) -> Vec<Fragment> {
    document
        .select(&selector.selector)
        .map(|element| Fragment::new(selector.name(), element_text(element)))
        .collect()
}

/// Concatenates an element's text nodes and collapses whitespace
fn element_text(element: ElementRef<'_>) -> String {
    let raw: String = element.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts all followable links from the document
fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute, normalized URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel:, data: schemes
/// - fragment-only links
/// - invalid URLs
/// - non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    base_url
        .join(href)
        .ok()
        .and_then(|url| normalize_parsed(url).ok())
}
