use crate::project::Project;
use anyhow::{anyhow, bail, Context, Result};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Component, Path};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::ZipArchive;

pub const PROJECT_JSON: &str = "project.json";

pub type ProgressCallback<'a> = dyn FnMut(usize, usize, &str) + 'a;

/// Raw contents of an `.sb3` (or a bare `project.json` with no assets).
#[derive(Debug, Clone, Default)]
pub struct ProjectArchive {
    pub project_json: String,
    pub assets: HashMap<String, Vec<u8>>,
}

impl ProjectArchive {
    pub fn project(&self) -> Result<Project> {
        Project::from_json(&self.project_json)
    }

    pub fn asset_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.assets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

pub fn read_archive(input: &Path) -> Result<ProjectArchive> {
    let is_json = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        let project_json = fs::read_to_string(input)
            .with_context(|| format!("Failed to read '{}'.", input.display()))?;
        return Ok(ProjectArchive {
            project_json,
            assets: HashMap::new(),
        });
    }
    let file =
        fs::File::open(input).with_context(|| format!("Failed to open '{}'.", input.display()))?;
    read_zip(file).with_context(|| format!("'{}' is not a valid zip/.sb3 file.", input.display()))
}

pub fn load_project(input: &Path) -> Result<Project> {
    read_archive(input)?
        .project()
        .with_context(|| format!("Invalid project.json inside '{}'.", input.display()))
}

pub fn read_archive_bytes(bytes: &[u8]) -> Result<ProjectArchive> {
    read_zip(Cursor::new(bytes))
}

fn read_zip<R: Read + Seek>(reader: R) -> Result<ProjectArchive> {
    let mut zip = ZipArchive::new(reader)?;

    let mut project_json = String::new();
    zip.by_name(PROJECT_JSON)
        .map_err(|_| anyhow!("{} not found in archive.", PROJECT_JSON))?
        .read_to_string(&mut project_json)?;

    let mut assets = HashMap::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let name = entry.name().to_string();
        if name == PROJECT_JSON || name.ends_with('/') {
            continue;
        }
        if entry.enclosed_name().is_none() {
            warn!(entry = %name, "skipping archive entry with unsafe path");
            continue;
        }
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        assets.insert(name, bytes);
    }
    debug!(assets = assets.len(), "read project archive");

    Ok(ProjectArchive {
        project_json,
        assets,
    })
}

pub fn unpack(archive: &ProjectArchive, out_dir: &Path) -> Result<usize> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create '{}'.", out_dir.display()))?;
    let json_path = out_dir.join(PROJECT_JSON);
    fs::write(&json_path, archive.project_json.as_bytes())
        .with_context(|| format!("Failed to write '{}'.", json_path.display()))?;
    for name in archive.asset_names() {
        let path = out_dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &archive.assets[name])
            .with_context(|| format!("Failed to write '{}'.", path.display()))?;
    }
    Ok(archive.assets.len() + 1)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackReport {
    pub assets_written: usize,
    pub missing: Vec<String>,
    /// Asset names that would resolve outside the project directory.
    pub rejected: Vec<String>,
}

/// Builds an `.sb3` from a directory holding `project.json` and the asset
/// files its costumes and sounds name.
pub fn pack(
    dir: &Path,
    output: &Path,
    mut progress: Option<&mut ProgressCallback<'_>>,
) -> Result<PackReport> {
    let json_path = dir.join(PROJECT_JSON);
    let project_json = fs::read_to_string(&json_path)
        .with_context(|| format!("Failed to read '{}'.", json_path.display()))?;
    let project = Project::from_json(&project_json)
        .with_context(|| format!("Invalid '{}'.", json_path.display()))?;

    let referenced = project.referenced_assets();
    let total = referenced.len().max(1);
    let mut report = PackReport::default();
    let mut assets = Vec::new();
    for (index, asset) in referenced.iter().enumerate() {
        if let Some(cb) = progress.as_deref_mut() {
            cb(index + 1, total, "Collecting assets");
        }
        if !is_plain_asset_name(&asset.md5ext) {
            warn!(asset = %asset.md5ext, "asset name is not a plain file name, not packed");
            report.rejected.push(asset.md5ext.clone());
            continue;
        }
        let path = dir.join(&asset.md5ext);
        match fs::read(&path) {
            Ok(bytes) => assets.push((asset.md5ext.clone(), bytes)),
            Err(err) => {
                warn!(asset = %asset.md5ext, %err, "asset missing, not packed");
                report.missing.push(asset.md5ext.clone());
            }
        }
    }
    report.assets_written = assets.len();

    let bytes = build_sb3_bytes(&project_json, assets)?;
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(output, bytes).with_context(|| format!("Failed to write '{}'.", output.display()))?;
    Ok(report)
}

/// True for a single normal path component: no separators, no `..`, no root.
pub fn is_plain_asset_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains('\\')
}

pub fn build_sb3_bytes(project_json: &str, assets: Vec<(String, Vec<u8>)>) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::<u8>::new());
    let mut zip = zip::ZipWriter::new(&mut buffer);
    let opts = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    zip.start_file(PROJECT_JSON, opts)?;
    zip.write_all(project_json.as_bytes())?;

    let mut assets = assets;
    assets.sort_by(|(left_name, _), (right_name, _)| left_name.cmp(right_name));
    let mut written = HashSet::new();
    for (name, bytes) in assets {
        if name == PROJECT_JSON || !written.insert(name.clone()) {
            continue;
        }
        zip.start_file(name, opts)?;
        zip.write_all(&bytes)?;
    }
    zip.finish()?;
    Ok(buffer.into_inner())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetMismatch {
    pub name: String,
    pub actual_md5: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetReport {
    pub checked: usize,
    pub mismatched: Vec<AssetMismatch>,
    /// Named by a costume or sound but absent from the archive.
    pub missing: Vec<String>,
    /// Present in the archive but named by nothing.
    pub unreferenced: Vec<String>,
}

impl AssetReport {
    pub fn is_clean(&self) -> bool {
        self.mismatched.is_empty() && self.missing.is_empty()
    }
}

pub fn verify_assets(archive: &ProjectArchive, project: &Project) -> AssetReport {
    let mut report = AssetReport::default();
    let mut referenced = HashSet::new();
    for asset in project.referenced_assets() {
        referenced.insert(asset.md5ext.clone());
        let Some(bytes) = archive.assets.get(&asset.md5ext) else {
            report.missing.push(asset.md5ext);
            continue;
        };
        report.checked += 1;
        let actual_md5 = format!("{:x}", md5::compute(bytes));
        if !asset_stem(&asset.md5ext).eq_ignore_ascii_case(&actual_md5) {
            warn!(asset = %asset.md5ext, actual = %actual_md5, "asset checksum mismatch");
            report.mismatched.push(AssetMismatch {
                name: asset.md5ext,
                actual_md5,
            });
        }
    }
    report.unreferenced = archive
        .asset_names()
        .into_iter()
        .filter(|name| !referenced.contains(*name))
        .map(ToString::to_string)
        .collect();
    report
}

fn asset_stem(name: &str) -> &str {
    name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name)
}

pub fn ensure_assets_clean(report: &AssetReport) -> Result<()> {
    if report.is_clean() {
        return Ok(());
    }
    let mut lines = Vec::new();
    for mismatch in &report.mismatched {
        lines.push(format!(
            "  checksum mismatch: {} (content md5 {})",
            mismatch.name, mismatch.actual_md5
        ));
    }
    for name in &report.missing {
        lines.push(format!("  missing: {}", name));
    }
    bail!("Asset verification failed:\n{}", lines.join("\n"));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_json_with(costume_md5ext: &str) -> String {
        format!(
            r#"{{
                "targets": [{{
                    "name": "Stage", "isStage": true, "blocks": {{}},
                    "costumes": [{{"name": "bg", "assetId": "x", "dataFormat": "svg", "md5ext": "{}"}}],
                    "sounds": []
                }}],
                "meta": {{"semver": "3.0.0"}}
            }}"#,
            costume_md5ext
        )
    }

    #[test]
    fn archive_bytes_round_trip_through_zip() {
        let svg = b"<svg/>".to_vec();
        let name = format!("{:x}.svg", md5::compute(&svg));
        let json = project_json_with(&name);
        let bytes = build_sb3_bytes(&json, vec![(name.clone(), svg.clone())]).unwrap();

        let archive = read_archive_bytes(&bytes).unwrap();
        assert_eq!(archive.project_json, json);
        assert_eq!(archive.assets.get(&name), Some(&svg));

        let project = archive.project().unwrap();
        let report = verify_assets(&archive, &project);
        assert!(report.is_clean());
        assert_eq!(report.checked, 1);
    }

    #[test]
    fn verification_reports_tampered_missing_and_extra_assets() {
        let json = project_json_with("00000000000000000000000000000000.svg");
        let mut archive = ProjectArchive {
            project_json: json,
            assets: HashMap::new(),
        };
        let project = archive.project().unwrap();
        let report = verify_assets(&archive, &project);
        assert_eq!(report.missing, vec!["00000000000000000000000000000000.svg".to_string()]);
        assert!(ensure_assets_clean(&report).is_err());

        archive
            .assets
            .insert("00000000000000000000000000000000.svg".to_string(), b"tampered".to_vec());
        archive.assets.insert("extra.png".to_string(), Vec::new());
        let report = verify_assets(&archive, &project);
        assert_eq!(report.mismatched.len(), 1);
        assert_eq!(report.unreferenced, vec!["extra.png".to_string()]);
    }

    #[test]
    fn unpacked_directory_packs_back_and_flags_missing_assets() {
        let svg = b"<svg/>".to_vec();
        let name = format!("{:x}.svg", md5::compute(&svg));
        let archive = ProjectArchive {
            project_json: project_json_with(&name),
            assets: HashMap::from([(name.clone(), svg.clone())]),
        };
        let dir = tempfile::tempdir().unwrap();
        let unpacked = dir.path().join("unpacked");
        assert_eq!(unpack(&archive, &unpacked).unwrap(), 2);

        let out = dir.path().join("out/packed.sb3");
        let mut calls = 0;
        let mut cb = |_: usize, _: usize, _: &str| calls += 1;
        let report = pack(&unpacked, &out, Some(&mut cb)).unwrap();
        assert_eq!(report.assets_written, 1);
        assert!(report.missing.is_empty());
        assert_eq!(calls, 1);
        let repacked = read_archive(&out).unwrap();
        assert_eq!(repacked.assets.get(&name), Some(&svg));

        fs::remove_file(unpacked.join(&name)).unwrap();
        let report = pack(&unpacked, &out, None).unwrap();
        assert_eq!(report.missing, vec![name]);
    }

    #[test]
    fn pack_refuses_asset_names_outside_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let project_dir = dir.path().join("project");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(dir.path().join("secret.svg"), b"<svg/>").unwrap();
        fs::write(
            project_dir.join(PROJECT_JSON),
            project_json_with("../secret.svg"),
        )
        .unwrap();

        let out = dir.path().join("packed.sb3");
        let report = pack(&project_dir, &out, None).unwrap();
        assert_eq!(report.assets_written, 0);
        assert_eq!(report.rejected, vec!["../secret.svg".to_string()]);
        assert!(read_archive(&out).unwrap().assets.is_empty());
    }

    #[test]
    fn plain_asset_names() {
        assert!(is_plain_asset_name("0123abcd.svg"));
        assert!(!is_plain_asset_name("../secret.svg"));
        assert!(!is_plain_asset_name("/etc/passwd"));
        assert!(!is_plain_asset_name("sub/a.svg"));
        assert!(!is_plain_asset_name(".."));
        assert!(!is_plain_asset_name(""));
        assert!(!is_plain_asset_name("a\\b.svg"));
    }

    #[test]
    fn bare_project_json_loads_without_assets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        fs::write(&path, project_json_with("a.svg")).unwrap();
        let archive = read_archive(&path).unwrap();
        assert!(archive.assets.is_empty());
        assert_eq!(archive.project().unwrap().targets.len(), 1);
    }

    #[test]
    fn missing_project_json_is_an_error() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buffer);
            zip.start_file("readme.txt", SimpleFileOptions::default()).unwrap();
            zip.write_all(b"hi").unwrap();
            zip.finish().unwrap();
        }
        let err = read_archive_bytes(buffer.get_ref()).unwrap_err();
        assert!(err.to_string().contains("project.json not found"));
    }
}
