//! Data types shared across the crawler
//!
//! This module contains the event type and the filter tag set used by both the
//! control loop and the command interpreter.

mod event;

use std::collections::BTreeSet;

pub use event::Event;

/// Set of filter terms used to select events from the source
///
/// Ordered so that listings and log lines are deterministic.
pub type TagSet = BTreeSet<String>;

/// Render a tag set as space-separated terms
pub fn format_tags(tags: &TagSet) -> String {
    tags.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}
