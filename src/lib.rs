//! Core data model and category-matching logic for the tag sidebar.
//!
//! The site build step emits two JSON documents under `_data/`: a list of
//! tag categories and a map of application identifiers to card metadata.
//! This crate loads them once per page session (see [`store::DataStore`])
//! and selects the applications belonging to a category with a tolerant
//! substring match. Everything here is plain data in and plain data out;
//! the Yew view layer lives in the binary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Resource names and query parameters understood by the page.
pub mod resources {
    /// JSON array of category descriptors.
    pub const CATEGORIES_FILE: &str = "tmp_tag-categories.json";
    /// JSON object mapping application identifiers to card metadata.
    pub const APP_CARDS_FILE: &str = "app_cards.json";
    /// Directory (relative to the site base path) holding both resources.
    pub const DATA_DIR: &str = "_data/";
    /// Query parameter selecting the active category.
    pub const CATEGORY_PARAM: &str = "category";
    /// Query flag forcing a one-time cache-busting reload of the data.
    pub const REFRESH_PARAM: &str = "refresh";
}

/// One tag category as produced by the site build step. Read-only here.
///
/// Identity is the `title`, compared case-insensitively. The `ids` list
/// holds the curated membership identifiers the tolerant match runs
/// against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub title: String,
    #[serde(default)]
    pub icon: String,
    /// Pre-computed application count for the sidebar badge.
    #[serde(default)]
    pub count: u32,
    #[serde(default, rename = "isPrimary")]
    pub is_primary: bool,
    #[serde(default)]
    pub ids: Vec<String>,
}

/// Display metadata for one application entry. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppCard {
    #[serde(rename = "app_title")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Site-relative path of the application's page.
    #[serde(default, rename = "app_url")]
    pub target_path: String,
}

/// The app-cards document, keyed by application identifier.
///
/// A `BTreeMap` keeps the keys in ascending order, which is the order
/// [`filter_apps`] results are required to come out in.
pub type AppCardMap = BTreeMap<String, AppCard>;

// Failure to load one of the data resources. Never fatal to the page:
// the store logs it and serves whatever subset of the data it has.
#[derive(Debug, Clone)]
pub enum FetchError {
    /// The server answered with a non-success status.
    Http {
        resource: String,
        status: u16,
        status_text: String,
    },
    /// The request never completed (DNS, connection, CORS, ...).
    Network { resource: String, message: String },
    /// The body arrived but was not the JSON document we expected.
    Decode { resource: String, message: String },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Http {
                resource,
                status,
                status_text,
            } => write!(
                f,
                "Failed to fetch {}: {} - {}",
                resource, status, status_text
            ),
            FetchError::Network { resource, message } => {
                write!(f, "Network error fetching {}: {}", resource, message)
            }
            FetchError::Decode { resource, message } => {
                write!(f, "Failed to decode {}: {}", resource, message)
            }
        }
    }
}

impl std::error::Error for FetchError {}

/// Find the category whose title equals `name`, ignoring case.
///
/// This is an exact match, never a substring one: `"Network"` does not
/// resolve to `"Networking"`. `None` is the "no such category" sentinel
/// and is distinct from a resolved category that matches no applications.
pub fn resolve_category<'a>(categories: &'a [Category], name: &str) -> Option<&'a Category> {
    let wanted = name.to_lowercase();
    categories.iter().find(|c| c.title.to_lowercase() == wanted)
}

/// Tolerant membership test: the lower-cased application title must equal,
/// contain, or be contained in at least one lower-cased category id.
///
/// Deliberately permissive — a short id like `"net"` claims every title
/// it appears in. The site has always shipped this rule, so it is kept
/// as-is rather than tightened.
fn matches_any_id(title: &str, ids: &[String]) -> bool {
    let title = title.to_lowercase();
    ids.iter().any(|id| {
        let id = id.to_lowercase();
        title == id || title.contains(&id) || id.contains(&title)
    })
}

/// Select the applications belonging to `category`, ordered ascending by
/// application identifier.
///
/// Both inputs are optional so that callers can pass through unresolved
/// categories and partially loaded data unchanged: a `None` on either
/// side yields an empty result instead of a panic.
pub fn filter_apps<'a>(
    category: Option<&Category>,
    app_cards: Option<&'a AppCardMap>,
) -> Vec<(&'a str, &'a AppCard)> {
    let (category, cards) = match (category, app_cards) {
        (Some(category), Some(cards)) => (category, cards),
        _ => return Vec::new(),
    };

    cards
        .iter()
        .filter(|(_, card)| matches_any_id(&card.title, &category.ids))
        .map(|(key, card)| (key.as_str(), card))
        .collect()
}

pub mod fetch;
pub mod store;
pub mod urlstate;
