//! Directory listing pages.
//!
//! Layout: a heading with the directory's URL path, a `Go Up` link, then
//! one line per entry prefixed with `D` (directory), `H` (HTML page) or
//! `F` (any other file, offered as a download). Directories come first,
//! each group sorted by name.

use std::io;
use std::path::{Component, Path};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left unescaped in hrefs: unreserved characters and `/`.
const HREF: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Render the listing of `dir`, which must be `root` or inside it.
pub async fn listing_html(root: &Path, dir: &Path) -> io::Result<String> {
    let relative = if dir == root {
        "/".to_string()
    } else {
        format!("/{}/", url_path(root, dir))
    };
    let parent = dir
        .parent()
        .filter(|_| dir != root)
        .map(|parent| url_path(root, parent))
        .unwrap_or_default();

    let href_base = encode(&relative);
    let mut lines = vec![format!(
        "<meta charset=\"UTF-8\">\n<h1>Directory Listing for {}</h1>\n<a href=\"/{}\">Go Up</a><br>",
        href_base,
        encode(&parent)
    )];

    let mut dirs = Vec::new();
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        // follows symlinks; dangling ones are skipped
        match tokio::fs::metadata(entry.path()).await {
            Ok(meta) if meta.is_dir() => dirs.push(name),
            Ok(meta) if meta.is_file() => files.push(name),
            _ => {}
        }
    }
    dirs.sort();
    files.sort();

    for name in dirs {
        lines.push(format!(
            "D <a href=\"{}{}\">{}</a>",
            href_base,
            encode(&name),
            html_escape(&name)
        ));
    }
    for name in files {
        let quoted = encode(&name);
        if is_html(&name) {
            lines.push(format!("H <a href=\"{}{}\">{}</a>", href_base, quoted, html_escape(&name)));
        } else {
            lines.push(format!(
                "F <a href=\"{}{}\" download=\"{}\">{}</a>",
                href_base,
                quoted,
                quoted,
                html_escape(&name)
            ));
        }
    }

    Ok(lines.join("<br>\n"))
}

/// `path` relative to `root`, `/`-separated, without leading or trailing slash.
fn url_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .map(|rel| {
            rel.components()
                .filter_map(|component| match component {
                    Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}

fn encode(text: &str) -> String {
    utf8_percent_encode(text, HREF).to_string()
}

fn is_html(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
}

fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
