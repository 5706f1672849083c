//! Pinned Cloudron releases.
//!
//! Provisioning a box always targets a known release. The selector `latest`
//! maps to [`LATEST`], which only moves when this table is updated.

use crate::error::{ApiError, Result};

/// Selector that resolves to the newest pinned release.
pub const LATEST_SELECTOR: &str = "latest";

/// Known releases, oldest first.
pub const RELEASES: &[&str] = &["0.0.62", "0.0.63", "0.0.64", "0.0.65", "0.0.66"];

/// The release `latest` resolves to.
pub const LATEST: &str = "0.0.66";

/// Map a version selector to a pinned release.
///
/// # Errors
///
/// Returns `UnknownVersion` for selectors that name no known release.
pub fn resolve(selector: &str) -> Result<&'static str> {
    let selector = selector.trim();
    if selector.eq_ignore_ascii_case(LATEST_SELECTOR) {
        return Ok(LATEST);
    }
    let wanted = selector.strip_prefix('v').unwrap_or(selector);
    RELEASES
        .iter()
        .copied()
        .find(|release| *release == wanted)
        .ok_or_else(|| ApiError::UnknownVersion(selector.to_string()))
}

/// Known releases, newest first.
pub fn list() -> impl Iterator<Item = &'static str> {
    RELEASES.iter().rev().copied()
}
