//! Detection of remote archives superseded by an incoming one.
//!
//! Two archives are the same package when their base keys match: the file
//! name lower-cased, without `.jar`, and cut at the first `-`/`_` that is
//! followed by a version-like token (`1.20`, `mc1.20.1`, `v0.5`).
//! `sodium-fabric-mc1.20.1-0.5.4.jar` has base key `sodium-fabric`.
//! Identical file names always match, whatever their keys.

use std::sync::OnceLock;

use regex::Regex;

fn version_suffix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[-_](?:mc|v)?\d+(?:\.\d+)+.*$").expect("valid regex"))
}

/// Normalized package identity of an archive file name.
pub fn base_key(file_name: &str) -> String {
    let lower = file_name.to_lowercase();
    let stem = lower.strip_suffix(".jar").unwrap_or(&lower);
    version_suffix().replace(stem, "").into_owned()
}

/// Returns the `existing` names that an upload of `incoming` supersedes.
///
/// Output keeps the order of `existing` and holds each name once. An empty
/// base key only matches by exact name.
pub fn resolve_duplicates<S, T>(incoming: &[S], existing: &[T]) -> Vec<String>
where
    S: AsRef<str>,
    T: AsRef<str>,
{
    let incoming: Vec<(String, String)> = incoming
        .iter()
        .map(|name| (name.as_ref().to_lowercase(), base_key(name.as_ref())))
        .collect();

    let mut superseded: Vec<String> = Vec::new();
    for name in existing.iter().map(AsRef::as_ref) {
        let lower = name.to_lowercase();
        let key = base_key(name);
        let matched = incoming.iter().any(|(new_lower, new_key)| {
            *new_lower == lower || (!key.is_empty() && *new_key == key)
        });
        if matched && !superseded.iter().any(|s| s == name) {
            superseded.push(name.to_string());
        }
    }
    superseded
}
