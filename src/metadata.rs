use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Project details from `api.scratch.mit.edu/projects/<id>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProjectMetadata {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub author: Author,
    #[serde(default)]
    pub history: History,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub remix: Remix,
    /// Short-lived; never written back out.
    #[serde(default, skip_serializing)]
    pub project_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Author {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct History {
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub shared: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Stats {
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub loves: u64,
    #[serde(default)]
    pub favorites: u64,
    #[serde(default)]
    pub remixes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Remix {
    #[serde(default)]
    pub parent: Option<u64>,
    #[serde(default)]
    pub root: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    code: String,
    #[serde(default)]
    message: String,
}

impl ProjectMetadata {
    /// Parses an API response. Error bodies (`{"code": .., "message": ..}`)
    /// become errors carrying the API's code.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        match serde_json::from_slice::<Self>(bytes) {
            Ok(metadata) => Ok(metadata),
            Err(err) => match serde_json::from_slice::<ErrorResponse>(bytes) {
                Ok(api) if api.message.is_empty() => bail!("Scratch API error: {}", api.code),
                Ok(api) => bail!("Scratch API error: {}: {}", api.code, api.message),
                Err(_) => Err(err).context("Invalid project metadata response."),
            },
        }
    }

    pub fn author_url(&self) -> Option<String> {
        if self.author.username.is_empty() {
            return None;
        }
        Some(format!("https://scratch.mit.edu/users/{}/", self.author.username))
    }

    pub fn token(&self) -> Option<&str> {
        self.project_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// `game-123-project.sb3` -> `game-123-project.metadata.json`.
pub fn sidecar_path(archive: &Path) -> PathBuf {
    archive.with_extension("metadata.json")
}

pub fn write_sidecar(archive: &Path, metadata: &ProjectMetadata) -> Result<PathBuf> {
    let path = sidecar_path(archive);
    let text = serde_json::to_string_pretty(metadata)?;
    fs::write(&path, text).with_context(|| format!("Failed to write '{}'.", path.display()))?;
    Ok(path)
}

/// Metadata saved next to an archive, if any.
pub fn load_sidecar(archive: &Path) -> Result<Option<ProjectMetadata>> {
    let path = sidecar_path(archive);
    if !path.is_file() {
        return Ok(None);
    }
    let bytes = fs::read(&path).with_context(|| format!("Failed to read '{}'.", path.display()))?;
    let metadata = ProjectMetadata::from_slice(&bytes)
        .with_context(|| format!("Invalid metadata file '{}'.", path.display()))?;
    Ok(Some(metadata))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
        "id": 1190972813,
        "title": "Cat Game",
        "description": "Thanks to everyone.",
        "instructions": "Press space to jump.",
        "visibility": "visible",
        "public": true,
        "author": {"id": 7, "username": "griffpatch", "scratchteam": false,
                   "history": {"joined": "2012-01-01T00:00:00.000Z"},
                   "profile": {"id": null, "images": {}}},
        "history": {"created": "2025-06-01T10:00:00.000Z", "modified": "2025-06-02T10:00:00.000Z",
                    "shared": "2025-06-03T10:00:00.000Z"},
        "stats": {"views": 120, "loves": 30, "favorites": 12, "remixes": 2},
        "remix": {"parent": 99, "root": 42},
        "project_token": "1760000000_abc"
    }"#;

    #[test]
    fn api_response_parses_with_token() {
        let metadata = ProjectMetadata::from_slice(RESPONSE.as_bytes()).unwrap();
        assert_eq!(metadata.id, 1190972813);
        assert_eq!(metadata.title, "Cat Game");
        assert_eq!(metadata.author.username, "griffpatch");
        assert_eq!(metadata.stats.loves, 30);
        assert_eq!(metadata.remix.parent, Some(99));
        assert_eq!(metadata.token(), Some("1760000000_abc"));
        assert_eq!(
            metadata.author_url().as_deref(),
            Some("https://scratch.mit.edu/users/griffpatch/")
        );
    }

    #[test]
    fn error_body_becomes_api_error() {
        let err = ProjectMetadata::from_slice(br#"{"code": "NotFound", "message": ""}"#).unwrap_err();
        assert_eq!(err.to_string(), "Scratch API error: NotFound");
        let err = ProjectMetadata::from_slice(b"<html>").unwrap_err();
        assert!(err.to_string().contains("Invalid project metadata"));
    }

    #[test]
    fn sidecar_round_trip_drops_token() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("Cat Game-1190972813-project.sb3");
        let metadata = ProjectMetadata::from_slice(RESPONSE.as_bytes()).unwrap();
        let path = write_sidecar(&archive, &metadata).unwrap();
        assert!(path.ends_with("Cat Game-1190972813-project.metadata.json"));

        let loaded = load_sidecar(&archive).unwrap().unwrap();
        assert_eq!(loaded.project_token, None);
        assert_eq!(loaded.title, metadata.title);
        assert!(load_sidecar(&dir.path().join("other.sb3")).unwrap().is_none());
    }
}
