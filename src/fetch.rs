use crate::metadata::ProjectMetadata;
use crate::naming;
use crate::project::Project;
use crate::sb3::{self, ProgressCallback};
use anyhow::{bail, Context, Result};
use std::fmt;
use std::io::Read;
use std::time::Duration;
use tracing::{debug, warn};

pub const API_BASE: &str = "https://api.scratch.mit.edu/projects";
pub const PROJECT_BASE: &str = "https://projects.scratch.mit.edu";
pub const ASSET_BASE: &str = "https://assets.scratch.mit.edu/internalapi/asset";

const USER_AGENT: &str = concat!("scratchdoc/", env!("CARGO_PKG_VERSION"));
const TIMEOUT: Duration = Duration::from_secs(30);

/// The server answered 404.
#[derive(Debug)]
pub struct NotFound(pub String);

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GET {}: not found (404)", self.0)
    }
}

impl std::error::Error for NotFound {}

pub trait HttpGet {
    fn get(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    pub fn new() -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(TIMEOUT))
            .build()
            .into();
        Self { agent }
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpGet for UreqClient {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        debug!(%url, "GET");
        let resp = match self.agent.get(url).header("User-Agent", USER_AGENT).call() {
            Ok(resp) => resp,
            Err(ureq::Error::StatusCode(404)) => return Err(NotFound(url.to_string()).into()),
            Err(err) => return Err(err).with_context(|| format!("GET {}", url)),
        };
        let mut reader = resp.into_body().into_reader();
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .with_context(|| format!("read response body from {}", url))?;
        Ok(body)
    }
}

#[derive(Debug, Clone)]
pub struct Download {
    pub project_id: String,
    pub metadata: ProjectMetadata,
    pub archive: Vec<u8>,
    pub assets_fetched: usize,
    pub missing_assets: Vec<String>,
}

impl Download {
    /// `<title>-<id>-project.sb3`, which keeps the id recoverable from the
    /// file name.
    pub fn file_name(&self) -> String {
        let title = naming::sanitize_filename(&self.metadata.title);
        format!("{}-{}-project.sb3", title, self.project_id)
    }
}

pub fn metadata_url(project_id: &str) -> String {
    format!("{}/{}", API_BASE, project_id)
}

pub fn project_json_url(project_id: &str, token: &str) -> String {
    format!("{}/{}?token={}", PROJECT_BASE, project_id, token)
}

pub fn asset_url(md5ext: &str) -> String {
    format!("{}/{}/get/", ASSET_BASE, md5ext)
}

/// Assets that fail to download are listed in `missing_assets` and left out
/// of the archive.
pub fn download(
    client: &dyn HttpGet,
    url_or_id: &str,
    mut progress: Option<&mut ProgressCallback<'_>>,
) -> Result<Download> {
    let project_id = naming::extract_project_id(url_or_id)?;

    let body = client
        .get(&metadata_url(&project_id))
        .map_err(|err| explain_not_found(err, &project_id))?;
    let metadata = ProjectMetadata::from_slice(&body)?;
    let Some(token) = metadata.token() else {
        bail!(
            "Could not retrieve project token. The project may be private or unshared. \
             Only public and shared projects can be downloaded."
        );
    };

    let body = client
        .get(&project_json_url(&project_id, token))
        .map_err(|err| explain_not_found(err, &project_id))?;
    let project_json = String::from_utf8(body).context("project.json is not valid UTF-8.")?;
    let project = Project::from_json(&project_json)?;

    let referenced = project.referenced_assets();
    let total = referenced.len().max(1);
    let mut assets = Vec::with_capacity(referenced.len());
    let mut missing_assets = Vec::new();
    for (index, asset) in referenced.iter().enumerate() {
        if let Some(cb) = progress.as_deref_mut() {
            cb(index + 1, total, &asset.md5ext);
        }
        if !sb3::is_plain_asset_name(&asset.md5ext) {
            warn!(asset = %asset.md5ext, "asset name is not a plain file name, skipped");
            missing_assets.push(asset.md5ext.clone());
            continue;
        }
        match client.get(&asset_url(&asset.md5ext)) {
            Ok(bytes) => assets.push((asset.md5ext.clone(), bytes)),
            Err(err) => {
                warn!(asset = %asset.md5ext, err = %format!("{:#}", err), "asset download failed");
                missing_assets.push(asset.md5ext.clone());
            }
        }
    }

    let assets_fetched = assets.len();
    let archive = sb3::build_sb3_bytes(&project_json, assets)?;
    Ok(Download {
        project_id,
        metadata,
        archive,
        assets_fetched,
        missing_assets,
    })
}

fn explain_not_found(err: anyhow::Error, project_id: &str) -> anyhow::Error {
    if err.downcast_ref::<NotFound>().is_none() {
        return err;
    }
    err.context(format!(
        "Project {} not found. The id may be wrong, or the project is private, unshared or deleted.",
        project_id
    ))
}
