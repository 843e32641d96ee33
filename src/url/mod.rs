//! Address handling for profiles and items
//!
//! Builds the profile address for a handle and resolves the hrefs found on
//! the listing into absolute item ids.

use crate::{UrlError, UrlResult};
use url::Url;

/// Normalizes a user-supplied handle
///
/// Trims the input, drops any whitespace inside it and strips a single
/// leading `@`.
///
/// # Examples
///
/// ```
/// use profile_harvest::url::normalize_handle;
///
/// assert_eq!(normalize_handle("  @some one \n"), "someone");
/// ```
pub fn normalize_handle(raw: &str) -> String {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    compact
        .strip_prefix('@')
        .map(str::to_string)
        .unwrap_or(compact)
}

/// Builds the profile address `{base}/@{handle}`
///
/// # Arguments
///
/// * `base_url` - Site root, e.g. `https://www.tiktok.com`
/// * `handle` - Normalized handle without the `@`
///
/// # Returns
///
/// * `Ok(Url)` - The profile address
/// * `Err(UrlError)` - The base was not an http(s) URL or the handle is empty
pub fn profile_url(base_url: &str, handle: &str) -> UrlResult<Url> {
    if handle.is_empty() || handle.contains('/') {
        return Err(UrlError::InvalidHandle(handle.to_string()));
    }

    let mut url = Url::parse(base_url).map_err(|e| UrlError::Parse(e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| UrlError::Parse(format!("{} cannot be a base", base_url)))?
        .pop_if_empty()
        .push(&format!("@{}", handle));

    Ok(url)
}

/// Resolves a listing href into an absolute item id
///
/// Relative hrefs are resolved against the profile address and fragments are
/// dropped, so the same item reached through different hrefs yields one id.
/// Returns `None` for hrefs that are not http(s) after resolution.
pub fn resolve_item_url(profile: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let mut resolved = profile.join(href).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    resolved.set_fragment(None);

    Some(resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_handle() {
        assert_eq!(normalize_handle("someone"), "someone");
        assert_eq!(normalize_handle("  someone  "), "someone");
        assert_eq!(normalize_handle("some one"), "someone");
        assert_eq!(normalize_handle("@someone"), "someone");
        assert_eq!(normalize_handle("   "), "");
    }

    #[test]
    fn test_profile_url() {
        let url = profile_url("https://www.tiktok.com", "someone").unwrap();
        assert_eq!(url.as_str(), "https://www.tiktok.com/@someone");
    }

    #[test]
    fn test_profile_url_with_trailing_slash_and_path() {
        let url = profile_url("http://127.0.0.1:8080/site/", "a.b_c").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/site/@a.b_c");
    }

    #[test]
    fn test_profile_url_rejects_bad_input() {
        assert!(matches!(
            profile_url("https://example.com", ""),
            Err(UrlError::InvalidHandle(_))
        ));
        assert!(matches!(
            profile_url("ftp://example.com", "x"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(matches!(profile_url("nope", "x"), Err(UrlError::Parse(_))));
    }

    #[test]
    fn test_resolve_relative_and_absolute_agree() {
        let profile = profile_url("https://www.tiktok.com", "someone").unwrap();

        let relative = resolve_item_url(&profile, "/@someone/video/123").unwrap();
        let absolute =
            resolve_item_url(&profile, "https://www.tiktok.com/@someone/video/123#top").unwrap();

        assert_eq!(relative, "https://www.tiktok.com/@someone/video/123");
        assert_eq!(relative, absolute);
    }

    #[test]
    fn test_resolve_rejects_non_http() {
        let profile = profile_url("https://www.tiktok.com", "someone").unwrap();
        assert_eq!(resolve_item_url(&profile, "javascript:void(0)"), None);
        assert_eq!(resolve_item_url(&profile, "   "), None);
    }
}
