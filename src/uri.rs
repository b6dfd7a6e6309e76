//! URI-reference resolution for `$id`, `$ref`, `$dynamicRef`, `$schema`.
use url::Url;

use crate::error::{Error, Result};

/// Base used when neither the caller nor the root `$id` supplies one.
pub const DEFAULT_BASE: &str = "json-schema:///";

pub fn parse_absolute(src: &str) -> Result<Url> {
    Url::parse(src).map_err(|_| Error::UnresolvedReference {
        reference: src.to_string(),
        base: String::new(),
    })
}

/// Resolve `reference` against `base` (RFC 3986 §5.2 via WHATWG parsing).
pub fn resolve(base: &Url, reference: &str) -> Result<Url> {
    base.join(reference).map_err(|_| Error::UnresolvedReference {
        reference: reference.to_string(),
        base: base.to_string(),
    })
}

/// Split `url` into its resource part and a non-empty fragment.
pub fn split_fragment(url: &Url) -> (Url, Option<String>) {
    let fragment = url.fragment().filter(|f| !f.is_empty()).map(str::to_string);
    (strip_fragment(url), fragment)
}

pub fn strip_fragment(url: &Url) -> Url {
    let mut out = url.clone();
    out.set_fragment(None);
    out
}

/// `base#fragment`, without re-escaping a fragment that is already encoded.
pub fn with_fragment(base: &Url, fragment: &str) -> Url {
    let mut out = base.clone();
    out.set_fragment(if fragment.is_empty() { None } else { Some(fragment) });
    out
}

// ------------------------------- Tests ------------------------------------ //
