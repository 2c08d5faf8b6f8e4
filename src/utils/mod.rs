//! Utility functions and helpers.

pub mod http;

use url::Url;

use crate::models::CandidateId;

/// URL of the listing page for `id` under `base`.
///
/// `base` is expected to end with `/`, so the id is appended as the last
/// path segment rather than replacing it.
pub fn listing_url(base: &Url, id: CandidateId) -> String {
    base.join(&id.to_string())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("{}{}", base, id))
}
