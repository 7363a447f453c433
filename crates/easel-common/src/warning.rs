//! Engine warnings routed through `tracing`.
//!
//! Provides deduplication to avoid spamming the same warning multiple times.
//! Used by the tokenizer, parser, and cascade to report unsupported
//! constructs in hand-authored stylesheets.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Global set of warnings we've already emitted (to deduplicate)
static WARNED: Mutex<Option<HashSet<String>>> = Mutex::new(None);

/// Warn about an unsupported construct (emitted once per unique message).
///
/// # Example
/// ```ignore
/// warn_once("CSS", "skipping unsupported at-rule '@media'");
/// ```
pub fn warn_once(component: &str, message: &str) {
    if first_occurrence(component, message) {
        tracing::warn!(target: "easel", component, "{message}");
    }
}

/// Record a warning, returning `true` the first time it is seen.
fn first_occurrence(component: &str, message: &str) -> bool {
    WARNED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get_or_insert_with(HashSet::new)
        .insert(format!("[{component}] {message}"))
}

/// Clear all recorded warnings (call when reloading every stylesheet).
pub fn clear_warnings() {
    let mut guard = WARNED.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(set) = guard.as_mut() {
        set.clear();
    }
}
