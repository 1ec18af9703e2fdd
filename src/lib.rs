pub mod converter;
pub mod document;
pub mod metadata;
pub mod naming;
pub mod project;
pub mod sb3;
pub mod tables;

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;
#[cfg(not(target_arch = "wasm32"))]
pub mod fetch;

use anyhow::{bail, Context, Result};
use document::DocumentOptions;
use std::path::{Path, PathBuf};

#[cfg(all(target_arch = "wasm32", feature = "wasm-bindings"))]
pub mod wasm;

pub use converter::{convert_target, render_script, scripts_for_target, Script};
pub use project::{Block, BlockMap, Project, Target};

/// Every target's scripts from a `project.json` document, stage first.
pub fn project_json_to_scratchblocks(project_json: &str) -> Result<String> {
    let project = Project::from_json(project_json)?;
    document::render_project(
        &project,
        &DocumentOptions {
            scripts_only: true,
            ..DocumentOptions::default()
        },
    )
}

pub fn document_sb3_bytes(bytes: &[u8], options: &DocumentOptions) -> Result<String> {
    let project = sb3::read_archive_bytes(bytes)?.project()?;
    document::render_project(&project, options)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn run_cli(args: &cli::Args) -> Result<()> {
    let modes = args.exclusive_modes();
    if modes.len() > 1 {
        bail!("{} cannot be combined.", modes.join(" and "));
    }
    if let Some(mode) = modes.first() {
        if args.split_targets {
            bail!("--split-targets cannot be used with {}.", mode);
        }
        if args.scripts_only {
            bail!("--scripts-only cannot be used with {}.", mode);
        }
        if args.target.is_some() {
            bail!("--target cannot be used with {}.", mode);
        }
    }

    if args.download {
        return run_download(args, &fetch::UreqClient::new());
    }
    if args.pack {
        return run_pack(args);
    }
    if args.unpack {
        return run_unpack(args);
    }
    if args.verify_assets {
        return run_verify(args);
    }
    if args.split_targets && args.output.is_none() {
        bail!("--split-targets requires an OUTPUT directory.");
    }

    let progress = CliProgress::new("Document", 3 + usize::from(args.output.is_some()));
    progress.emit(1, "Resolving input path");
    let input = canonicalize_file(&args.input)?;

    progress.emit(2, "Reading project");
    let project = sb3::load_project(&input)?;

    progress.emit(3, "Rendering");
    if args.stats {
        let text = format!("{}\n", document::render_stats(&project.stats()));
        return write_output(&progress, 4, args.output.as_deref(), &text);
    }
    let options = document_options(args, &input)?;
    if let Some(out_dir) = args.output.as_deref().filter(|_| args.split_targets) {
        progress.emit(4, "Writing target files");
        let written = document::write_split(&project, out_dir, &options)?;
        eprintln!("Wrote {} files to '{}'.", written.len(), pretty_path(out_dir));
        return Ok(());
    }
    let text = document::render_project(&project, &options)?;
    write_output(&progress, 4, args.output.as_deref(), &text)
}

#[cfg(not(target_arch = "wasm32"))]
fn run_pack(args: &cli::Args) -> Result<()> {
    let Some(output) = args.output.as_deref() else {
        bail!("--pack requires an OUTPUT .sb3 path.");
    };
    let progress = CliProgress::new("Pack", 2);
    progress.emit(1, "Resolving input directory");
    let dir = canonicalize_dir(&args.input)?;
    let mut stage_cb = |step: usize, total: usize, label: &str| {
        progress.emit_with_total(1 + step, 1 + total, label);
    };
    let report = sb3::pack(&dir, output, Some(&mut stage_cb))?;
    eprintln!(
        "Packed {} assets into '{}'.",
        report.assets_written,
        pretty_path(output)
    );
    for name in &report.missing {
        eprintln!("  missing asset: {}", name);
    }
    for name in &report.rejected {
        eprintln!("  rejected asset name: {}", name);
    }
    Ok(())
}

/// Downloads into OUTPUT, or `<title>-<id>-project.sb3` in the working
/// directory, and saves the API metadata beside it.
#[cfg(not(target_arch = "wasm32"))]
pub fn run_download(args: &cli::Args, client: &dyn fetch::HttpGet) -> Result<()> {
    let progress = CliProgress::new("Download", 3);
    progress.emit(1, "Fetching metadata and project.json");
    let url_or_id = args.input.to_string_lossy();
    let mut asset_cb = |step: usize, total: usize, name: &str| {
        progress.emit_with_total(1 + step, 2 + total, &format!("Fetching asset {}", name));
    };
    let download = fetch::download(client, &url_or_id, Some(&mut asset_cb))?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(download.file_name()));
    progress.emit(3, "Writing archive");
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create '{}'.", parent.display()))?;
    }
    std::fs::write(&output, &download.archive)
        .with_context(|| format!("Failed to write '{}'.", output.display()))?;
    metadata::write_sidecar(&output, &download.metadata)?;

    eprintln!(
        "Downloaded '{}' with {} assets to '{}'.",
        download.metadata.title,
        download.assets_fetched,
        pretty_path(&output)
    );
    for name in &download.missing_assets {
        eprintln!("  missing asset: {}", name);
    }
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn run_unpack(args: &cli::Args) -> Result<()> {
    let Some(out_dir) = args.output.as_deref() else {
        bail!("--unpack requires an OUTPUT directory.");
    };
    let progress = CliProgress::new("Unpack", 3);
    progress.emit(1, "Resolving input path");
    let input = canonicalize_file(&args.input)?;
    progress.emit(2, "Reading archive");
    let archive = sb3::read_archive(&input)?;
    progress.emit(3, "Extracting files");
    let count = sb3::unpack(&archive, out_dir)?;
    eprintln!("Extracted {} files to '{}'.", count, pretty_path(out_dir));
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn run_verify(args: &cli::Args) -> Result<()> {
    let progress = CliProgress::new("Verify", 3);
    progress.emit(1, "Resolving input path");
    let input = canonicalize_file(&args.input)?;
    progress.emit(2, "Reading archive");
    let archive = sb3::read_archive(&input)?;
    let project = archive
        .project()
        .with_context(|| format!("Invalid project.json inside '{}'.", input.display()))?;
    progress.emit(3, "Hashing assets");
    let report = sb3::verify_assets(&archive, &project);
    println!("Checked {} assets.", report.checked);
    for name in &report.unreferenced {
        println!("  unreferenced: {}", name);
    }
    sb3::ensure_assets_clean(&report)?;
    println!("All referenced assets match their checksums.");
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn document_options(args: &cli::Args, input: &Path) -> Result<DocumentOptions> {
    let metadata = metadata::load_sidecar(input)?;
    let project_id = match &args.project {
        Some(url_or_id) => Some(naming::extract_project_id(url_or_id)?),
        None => naming::project_id_from_filename(input)
            .or_else(|| metadata.as_ref().map(|m| m.id.to_string())),
    };
    let title = args
        .title
        .clone()
        .or_else(|| {
            metadata
                .as_ref()
                .map(|m| m.title.clone())
                .filter(|t| !t.is_empty())
        })
        .or_else(|| {
            input
                .file_stem()
                .and_then(|s| s.to_str())
                .filter(|s| *s != "project")
                .map(ToString::to_string)
        });
    Ok(DocumentOptions {
        title,
        project_id,
        target: args.target.clone(),
        scripts_only: args.scripts_only,
        metadata,
        ..DocumentOptions::default()
    })
}

#[cfg(not(target_arch = "wasm32"))]
fn write_output(progress: &CliProgress, step: usize, output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            progress.emit(step, "Writing output");
            std::fs::write(path, text.as_bytes())
                .with_context(|| format!("Failed to write '{}'.", path.display()))
        }
        None => {
            print!("{}", text);
            Ok(())
        }
    }
}

pub fn canonicalize_file(path: &Path) -> Result<PathBuf> {
    if !path.is_file() {
        bail!("Input file not found: '{}'.", path.display());
    }
    Ok(path.canonicalize()?)
}

pub fn canonicalize_dir(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        bail!("Input directory not found: '{}'.", path.display());
    }
    Ok(path.canonicalize()?)
}

#[cfg(not(target_arch = "wasm32"))]
fn pretty_path(path: &Path) -> String {
    let raw = path.display().to_string();
    if let Some(stripped) = raw.strip_prefix(r"\\?\") {
        stripped.to_string()
    } else {
        raw
    }
}

#[cfg(not(target_arch = "wasm32"))]
struct CliProgress {
    prefix: &'static str,
    total: usize,
}

#[cfg(not(target_arch = "wasm32"))]
impl CliProgress {
    fn new(prefix: &'static str, total: usize) -> Self {
        Self {
            prefix,
            total: total.max(1),
        }
    }

    fn emit(&self, step: usize, label: &str) {
        self.emit_with_total(step, self.total, label);
    }

    fn emit_with_total(&self, step: usize, total: usize, label: &str) {
        let total = total.max(1);
        let step = step.clamp(1, total);
        eprintln!(
            "[{}] {}... ({}/{}) {}",
            self.prefix,
            label,
            step,
            total,
            progress_bar(step, total, 14)
        );
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn progress_bar(step: usize, total: usize, width: usize) -> String {
    let width = width.max(1);
    let filled = ((step * width) + (total / 2)) / total;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.extend((0..width).map(|i| if i < filled { '=' } else { '-' }));
    bar.push(']');
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_bar_rounds_to_nearest_cell() {
        assert_eq!(progress_bar(1, 4, 8), "[==------]");
        assert_eq!(progress_bar(4, 4, 8), "[========]");
        assert_eq!(progress_bar(1, 3, 4), "[=---]");
    }

    #[test]
    fn scripts_come_from_bare_project_json() {
        let json = r#"{"targets": [{"name": "Sprite1", "isStage": false, "blocks": {
            "a": {"opcode": "looks_say", "next": null, "parent": null,
                  "inputs": {"MESSAGE": [1, [10, "Hello!"]]}, "fields": {}, "topLevel": true}
        }}]}"#;
        assert_eq!(
            project_json_to_scratchblocks(json).unwrap(),
            "// Sprite: Sprite1\nsay [Hello!]\n"
        );
    }
}
