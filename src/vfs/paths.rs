/*!
 * VFS Paths
 * Helpers for `<scheme>://<path>` style virtual paths
 */

/// A virtual path split into its scheme part and the path inside the mount
///
/// `home:///docs/a.txt` splits into `home://` and `/docs/a.txt`.
/// Short forms such as `home:/a.txt` are accepted as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split<'a> {
    pub scheme: &'a str,
    pub separator: &'a str,
    pub rest: &'a str,
}

/// Split a path at its scheme separator
pub fn split(path: &str) -> Split<'_> {
    if let Some(idx) = path.find("://") {
        return Split {
            scheme: &path[..idx],
            separator: "://",
            rest: &path[idx + 3..],
        };
    }
    match path.find(':') {
        Some(idx) if idx > 0 => Split {
            scheme: &path[..idx],
            separator: ":",
            rest: &path[idx + 1..],
        },
        _ => Split {
            scheme: "",
            separator: "",
            rest: path,
        },
    }
}

/// Clean the part after the scheme: collapse `//`, resolve `.`/`..`, drop trailing `/`
pub fn normalize(path: &str) -> String {
    let parts = split(path);
    let rest = if parts.rest.is_empty() {
        "/".to_string()
    } else {
        let cleaned = path_clean::clean(parts.rest);
        let cleaned = cleaned.to_string_lossy();
        if cleaned == "." {
            "/".to_string()
        } else {
            cleaned.into_owned()
        }
    };
    format!("{}{}{}", parts.scheme, parts.separator, rest)
}

/// Parent directory of a path (the root is its own parent)
pub fn dirname(path: &str) -> String {
    let normalized = normalize(path);
    let parts = split(&normalized);
    let parent = match parts.rest.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &parts.rest[..idx],
    };
    format!("{}{}{}", parts.scheme, parts.separator, parent)
}

/// Final component of a path, empty for a root
pub fn basename(path: &str) -> String {
    let normalized = normalize(path);
    let parts = split(&normalized);
    parts
        .rest
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Append a file name to a directory path
pub fn join(dir: &str, name: &str) -> String {
    let dir = normalize(dir);
    let name = name.trim_start_matches('/');
    if dir.ends_with('/') {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Extension of the file name (lowercase, without dot)
pub fn extension(path: &str) -> Option<String> {
    let name = basename(path);
    let idx = name.rfind('.')?;
    if idx == 0 || idx + 1 == name.len() {
        return None;
    }
    Some(name[idx + 1..].to_ascii_lowercase())
}

/// Guess a mime type from the file extension
pub fn guess_mime(path: &str) -> &'static str {
    match extension(path).as_deref() {
        Some("txt") | Some("md") | Some("log") => "text/plain",
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("mp3") => "audio/mpeg",
        Some("mp4") => "video/mp4",
        Some("odt") => "application/vnd.oasis.opendocument.text",
        _ => "application/octet-stream",
    }
}
