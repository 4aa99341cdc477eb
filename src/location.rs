//! URL normalization against a document location
//!
//! Reference textures are handed to the host by URL, so relative paths in a
//! manifest must be made absolute against the page they were declared on.

/// Returns true if `url` already carries a scheme (`https:`, `file:`, `data:`)
pub fn has_scheme(url: &str) -> bool {
    match url.find(':') {
        Some(idx) if idx > 0 => {
            let scheme = &url[..idx];
            scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// Resolves `url` against `base`
///
/// Handles absolute URLs, protocol-relative (`//host/x`), root-relative (`/x`)
/// and path-relative (`x`, `./x`, `../x`) references. Query and fragment of the
/// base are dropped. A base without a scheme is a plain path, and the result
/// stays relative if the base was.
pub fn resolve(base: &str, url: &str) -> String {
    if has_scheme(url) {
        return url.to_owned();
    }

    let (scheme, rest) = match base.find("://") {
        Some(idx) => (&base[..idx], &base[idx + 3..]),
        None => return resolve_path(base, url),
    };

    if let Some(stripped) = url.strip_prefix("//") {
        return format!("{scheme}://{stripped}");
    }

    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    let (authority, base_path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, "/"),
    };

    let (url_path, suffix) = match url.find(['?', '#']) {
        Some(idx) => (&url[..idx], &url[idx..]),
        None => (url, ""),
    };

    let joined = if url_path.starts_with('/') {
        url_path.to_owned()
    } else {
        // Directory of the base document
        let dir = match base_path.rfind('/') {
            Some(idx) => &base_path[..=idx],
            None => "/",
        };
        format!("{dir}{url_path}")
    };

    format!("{scheme}://{authority}{}{suffix}", normalize_path(&joined))
}

fn resolve_path(base: &str, url: &str) -> String {
    if url.starts_with('/') {
        return url.to_owned();
    }

    let base = base.split(['?', '#']).next().unwrap_or_default();
    let (url_path, suffix) = match url.find(['?', '#']) {
        Some(idx) => (&url[..idx], &url[idx..]),
        None => (url, ""),
    };
    let dir = match base.rfind('/') {
        Some(idx) => &base[..=idx],
        None => "",
    };

    let joined = normalize_path(&format!("{dir}{url_path}"));
    if base.starts_with('/') {
        format!("{joined}{suffix}")
    } else {
        format!("{}{suffix}", &joined[1..])
    }
}

fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let trailing = path.ends_with('/') || path.ends_with("/.") || path.ends_with("/..");

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut out = String::from("/");
    out.push_str(&segments.join("/"));
    if trailing && !segments.is_empty() {
        out.push('/');
    }
    out
}
