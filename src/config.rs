//! Application-level configuration constants.

// Site layout
pub const SITE_ROOT: &str = "holohub";

// UI strings
pub const SIDEBAR_TITLE: &str = "Application Categories";
