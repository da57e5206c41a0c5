//! Carrying the token in, and removing it from, URL query strings.

use url::{form_urlencoded, Url};

/// Append `param=value` to `url`, escaping both and picking `?` or `&`.
///
/// Works on absolute and relative URLs; a `#fragment` stays at the end.
#[must_use]
pub fn append_to_url(url: &str, param: &str, value: &str) -> String {
    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };

    let separator = if !base.contains('?') {
        "?"
    } else if base.ends_with('?') || base.ends_with('&') {
        ""
    } else {
        "&"
    };

    let pair = form_urlencoded::Serializer::new(String::new())
        .append_pair(param, value)
        .finish();

    let mut out = format!("{base}{separator}{pair}");
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// First non-empty value of `param` in `href`, or `None` for a normal page load.
#[must_use]
pub fn extract(href: &str, param: &str) -> Option<String> {
    let url = Url::parse(href).ok()?;
    extract_from(&url, param)
}

pub(crate) fn extract_from(url: &Url, param: &str) -> Option<String> {
    url.query_pairs().find_map(|(key, value)| {
        (key == param && !value.is_empty()).then(|| value.into_owned())
    })
}

/// Whether `param` occurs in the query at all, even with an empty value.
pub(crate) fn has_param(url: &Url, param: &str) -> bool {
    url.query_pairs().any(|(key, _)| key == param)
}

/// Copy of `url` without any `param` pair; path, other pairs and fragment are kept.
#[must_use]
pub fn strip_param(url: &Url, param: &str) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != param)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut stripped = url.clone();
    if kept.is_empty() {
        stripped.set_query(None);
    } else {
        stripped.query_pairs_mut().clear().extend_pairs(kept);
    }
    stripped
}
