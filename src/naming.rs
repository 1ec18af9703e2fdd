use anyhow::{bail, Result};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

const MAX_FILENAME_CHARS: usize = 200;
const INVALID_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Accepts a bare numeric id or any URL containing `scratch.mit.edu/projects/<id>`.
pub fn extract_project_id(url_or_id: &str) -> Result<String> {
    let trimmed = url_or_id.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Ok(trimmed.to_string());
    }
    let re = Regex::new(r"scratch\.mit\.edu/projects/(\d+)")?;
    match re.captures(trimmed) {
        Some(caps) => Ok(caps[1].to_string()),
        None => bail!("Could not extract project ID from: {}", url_or_id),
    }
}

/// Recovers the id from names shaped like `<title>-<id>-project.sb3`.
pub fn project_id_from_filename(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let re = Regex::new(r"-(\d+)-project$").ok()?;
    re.captures(stem).map(|caps| caps[1].to_string())
}

pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if INVALID_FILENAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = replaced.trim_matches(|c| c == '.' || c == ' ');
    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    let capped = if collapsed.chars().count() > MAX_FILENAME_CHARS {
        collapsed
            .chars()
            .take(MAX_FILENAME_CHARS)
            .collect::<String>()
            .trim()
            .to_string()
    } else {
        collapsed
    };
    if capped.is_empty() {
        "untitled".to_string()
    } else {
        capped
    }
}

/// Picks `<name>.<ext>`, or `<name>_2.<ext>` and so on when a case-insensitive
/// collision with an earlier pick exists.
pub fn unique_filename(name: &str, extension: &str, used: &mut HashSet<String>) -> String {
    let base = sanitize_filename(name);
    let mut candidate = format!("{}.{}", base, extension);
    let mut index = 2usize;
    while !used.insert(candidate.to_lowercase()) {
        candidate = format!("{}_{}.{}", base, index, extension);
        index += 1;
    }
    candidate
}
