use std::sync::OnceLock;

use regex::{Captures, Regex};

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?P<prefix>@import\s+)?url\((?P<lead>\s*)(?P<quote>['"]?)(?P<path>[^'")\s]+)(?P<tail>['"]?\s*\))"#,
        )
        .expect("invalid url regex")
    })
}

fn bare_import_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?P<prefix>@import\s+)(?P<quote>['"])(?P<path>[^'"]+)(?P<tail>['"])"#)
            .expect("invalid import regex")
    })
}

fn url_ignores() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            vec![
                Regex::new(r"(?i)^https?://").expect("invalid http(s) regex"),
                Regex::new(r"(?i)^data:").expect("invalid data URI regex"),
                Regex::new(r"^//").expect("invalid protocol-relative regex"),
                Regex::new(r"^#").expect("invalid fragment regex"),
            ]
        })
        .as_slice()
}

/// Determine whether a stylesheet reference must be left exactly as written.
///
/// Already-absolute paths, external URLs, data URIs and fragment-only references are never
/// resolved against the stylesheet's directory.
pub fn should_ignore_url(value: &str) -> bool {
    value.starts_with('/') || url_ignores().iter().any(|pattern| pattern.is_match(value))
}

/// Rewrite relative `url(...)` and `@import` references so they are absolute to the
/// application root, resolving each against the directory of `source_path`.
pub fn rewrite_urls(css: &str, source_path: &str) -> String {
    let base = source_dir(source_path);

    let rewritten = url_pattern().replace_all(css, |caps: &Captures| {
        let path = &caps["path"];
        if should_ignore_url(path) {
            return caps[0].to_string();
        }
        format!(
            "{}url({}{}{}{}",
            caps.name("prefix").map_or("", |m| m.as_str()),
            &caps["lead"],
            &caps["quote"],
            resolve_relative(base, path),
            &caps["tail"],
        )
    });

    bare_import_pattern()
        .replace_all(&rewritten, |caps: &Captures| {
            let path = &caps["path"];
            if should_ignore_url(path) {
                return caps[0].to_string();
            }
            format!(
                "{}{}{}{}",
                &caps["prefix"],
                &caps["quote"],
                resolve_relative(base, path),
                &caps["tail"],
            )
        })
        .into_owned()
}

/// Join `reference` onto `base_dir`, collapsing `.` and `..`, and anchor it at the root.
pub fn resolve_relative(base_dir: &str, reference: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in base_dir.split('/').chain(reference.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

fn source_dir(source_path: &str) -> &str {
    let trimmed = source_path.trim_start_matches("./").trim_start_matches('/');
    trimmed.rsplit_once('/').map_or("", |(dir, _)| dir)
}
