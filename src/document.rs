use crate::converter;
use crate::metadata::ProjectMetadata;
use crate::naming::unique_filename;
use crate::project::{Project, ProjectStats, Target};
use anyhow::{bail, Context, Result};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const INDEX_FILE: &str = "index.txt";

#[derive(Debug, Clone)]
pub struct DocumentOptions {
    pub title: Option<String>,
    pub project_id: Option<String>,
    pub target: Option<String>,
    pub scripts_only: bool,
    /// Items shown per list before the remainder is summarised.
    pub list_preview: usize,
    pub metadata: Option<ProjectMetadata>,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            title: None,
            project_id: None,
            target: None,
            scripts_only: false,
            list_preview: 10,
            metadata: None,
        }
    }
}

impl DocumentOptions {
    fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("Scratch Project")
    }
}

pub fn project_url(project_id: &str) -> String {
    format!("https://scratch.mit.edu/projects/{}/", project_id)
}

/// Targets to document, stage first. Fails when a requested target is absent.
pub fn select_targets<'a>(project: &'a Project, options: &DocumentOptions) -> Result<Vec<&'a Target>> {
    let ordered = project.ordered_targets();
    let Some(name) = options.target.as_deref() else {
        return Ok(ordered);
    };
    let selected: Vec<&Target> = ordered.into_iter().filter(|t| t.name == name).collect();
    if selected.is_empty() {
        let known: Vec<&str> = project
            .ordered_targets()
            .into_iter()
            .map(|t| t.name.as_str())
            .collect();
        bail!("Target '{}' not found. Available: {}", name, known.join(", "));
    }
    Ok(selected)
}

pub fn render_project(project: &Project, options: &DocumentOptions) -> Result<String> {
    let targets = select_targets(project, options)?;
    if options.scripts_only {
        let sections: Vec<String> = targets
            .into_iter()
            .filter_map(render_target_scripts)
            .collect();
        return Ok(finish(sections.join("\n\n")));
    }

    let mut lines = vec![render_header(project, options)];
    lines.push(String::new());
    lines.push(render_stats(&project.stats()));
    if let Some(monitors) = render_monitors(project) {
        lines.push(String::new());
        lines.push(monitors);
    }
    let references = project.field_references();
    for target in targets {
        lines.push(String::new());
        lines.push(render_target_section(target, &references, options));
    }
    Ok(finish(lines.join("\n")))
}

pub fn render_header(project: &Project, options: &DocumentOptions) -> String {
    let mut lines = vec![options.title().to_string()];
    if let Some(id) = &options.project_id {
        lines.push(format!("Link: {}", project_url(id)));
    }
    if let Some(metadata) = &options.metadata {
        if let Some(url) = metadata.author_url() {
            lines.push(format!("Author: {} ({})", metadata.author.username, url));
        }
        match (metadata.remix.parent, metadata.remix.root) {
            (Some(parent), Some(root)) if root != parent => lines.push(format!(
                "Remix of: {} (original: {})",
                project_url(&parent.to_string()),
                project_url(&root.to_string())
            )),
            (Some(parent), _) => {
                lines.push(format!("Remix of: {}", project_url(&parent.to_string())))
            }
            (None, _) => lines.push("Remix: no".to_string()),
        }
        let history = &metadata.history;
        for (label, date) in [
            ("Created", &history.created),
            ("Modified", &history.modified),
            ("Shared", &history.shared),
        ] {
            if let Some(date) = date {
                lines.push(format!("{}: {}", label, date));
            }
        }
        let stats = &metadata.stats;
        lines.push(format!(
            "Community: {} views, {} loves, {} favorites, {} remixes",
            stats.views, stats.loves, stats.favorites, stats.remixes
        ));
    }
    if let Some(meta) = project.meta.as_ref().filter(|m| !m.semver.is_empty()) {
        if meta.vm.is_empty() {
            lines.push(format!("Scratch version: {}", meta.semver));
        } else {
            lines.push(format!("Scratch version: {} (VM {})", meta.semver, meta.vm));
        }
    }
    if let Some(metadata) = &options.metadata {
        for (heading, text) in [
            ("Instructions", &metadata.instructions),
            ("Notes and Credits", &metadata.description),
        ] {
            if !text.trim().is_empty() {
                lines.push(String::new());
                lines.push(heading.to_string());
                lines.push(indent_text(text.trim(), "  "));
            }
        }
    }
    lines.join("\n")
}

/// Stage monitors, with data monitors named after their variable or list.
pub fn render_monitors(project: &Project) -> Option<String> {
    if project.monitors.is_empty() {
        return None;
    }
    let mut lines = vec![format!("Monitors ({})", project.monitors.len())];
    for monitor in &project.monitors {
        let label = project
            .data_name(&monitor.id)
            .unwrap_or(monitor.opcode.as_str());
        let mut details = vec![if monitor.mode.is_empty() {
            "default"
        } else {
            monitor.mode.as_str()
        }];
        details.push(if monitor.visible { "shown" } else { "hidden" });
        if let Some(sprite) = &monitor.sprite_name {
            details.push(sprite.as_str());
        }
        lines.push(format!("  - {} ({})", label, details.join(", ")));
    }
    Some(lines.join("\n"))
}

/// `// <kind>: <name>` followed by the target's scripts, or `None` when it
/// has no scripts.
pub fn render_target_scripts(target: &Target) -> Option<String> {
    let scripts = converter::scripts_for_target(target);
    if scripts.is_empty() {
        return None;
    }
    Some(format!(
        "// {}: {}\n{}",
        target_kind(target),
        target.name,
        scripts.join("\n\n")
    ))
}

pub fn render_stats(stats: &ProjectStats) -> String {
    let rows = [
        ("Sprites", stats.sprites),
        ("Blocks", stats.blocks),
        ("Scripts", stats.scripts),
        ("Custom blocks", stats.custom_blocks),
        ("Clone blocks", stats.clone_blocks),
        ("Broadcasts", stats.broadcasts),
        ("Global variables", stats.global_variables),
        ("Sprite variables", stats.sprite_variables),
        ("Cloud variables", stats.cloud_variables),
        ("Costumes", stats.costumes),
        ("Sounds", stats.sounds),
        ("Extensions", stats.extensions),
        ("Monitors", stats.monitors),
    ];
    let mut lines = vec!["Summary".to_string()];
    for (label, count) in rows {
        lines.push(format!("  {}: {}", label, count));
    }
    lines.join("\n")
}

/// `references` comes from [`Project::field_references`].
pub fn render_target_section(
    target: &Target,
    references: &HashMap<String, usize>,
    options: &DocumentOptions,
) -> String {
    let mut lines = vec![format!("== {}: {} ==", target_kind(target), target.name)];
    let properties = target_properties(target);
    if !properties.is_empty() {
        lines.push("Properties".to_string());
        lines.extend(properties.into_iter().map(|p| format!("  {}", p)));
    }
    let used_by = |id: &str| match references.get(id).copied() {
        Some(1) => " (used by 1 block)".to_string(),
        Some(n) => format!(" (used by {} blocks)", n),
        None => String::new(),
    };

    if !target.costumes.is_empty() {
        lines.push(format!("Costumes ({})", target.costumes.len()));
        for (idx, costume) in target.costumes.iter().enumerate() {
            let current = if idx == target.current_costume { " *" } else { "" };
            lines.push(format!("  - {} ({}){}", costume.name, costume.data_format, current));
        }
    }
    if !target.sounds.is_empty() {
        lines.push(format!("Sounds ({})", target.sounds.len()));
        for sound in &target.sounds {
            match sound.duration_secs() {
                Some(secs) => lines.push(format!(
                    "  - {} ({}, {:.2}s)",
                    sound.name, sound.data_format, secs
                )),
                None => lines.push(format!("  - {} ({})", sound.name, sound.data_format)),
            }
        }
    }
    if !target.variables.is_empty() {
        lines.push(format!("Variables ({})", target.variables.len()));
        for var in &target.variables {
            let cloud = if var.is_cloud { "\u{2601} " } else { "" };
            lines.push(format!(
                "  - {}{} = {}{}",
                cloud,
                var.name,
                var.value,
                used_by(&var.id)
            ));
        }
    }
    if !target.lists.is_empty() {
        lines.push(format!("Lists ({})", target.lists.len()));
        for list in &target.lists {
            lines.push(format!(
                "  - {} ({} items){}",
                list.name,
                list.items.len(),
                used_by(&list.id)
            ));
            for item in list.items.iter().take(options.list_preview) {
                lines.push(format!("      {}", item));
            }
            if list.items.len() > options.list_preview {
                lines.push(format!(
                    "      ... and {} more",
                    list.items.len() - options.list_preview
                ));
            }
        }
    }
    if !target.broadcasts.is_empty() {
        lines.push(format!("Broadcasts ({})", target.broadcasts.len()));
        for name in target.broadcasts.values() {
            lines.push(format!("  - {}", name));
        }
    }

    if !target.comments.is_empty() {
        lines.push(format!("Comments ({})", target.comments.len()));
        for comment in target.comments.values() {
            let anchor = comment
                .block_id
                .as_deref()
                .and_then(|id| target.blocks.get(id))
                .map(|block| format!("[on {}] ", block.opcode))
                .unwrap_or_default();
            let text = indent_text(comment.text.trim(), "    ");
            lines.push(format!("  - {}{}", anchor, text.trim_start()));
        }
    }

    let scripts = converter::scripts_for_target(target);
    lines.push(format!("Scripts ({})", scripts.len()));
    if !scripts.is_empty() {
        lines.push(String::new());
        lines.push(scripts.join("\n\n"));
    }
    lines.join("\n")
}

/// Writes one file per target plus an index into `out_dir`. Returns every
/// path written, index last.
pub fn write_split(
    project: &Project,
    out_dir: &Path,
    options: &DocumentOptions,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create '{}'.", out_dir.display()))?;

    let mut used = HashSet::new();
    used.insert(INDEX_FILE.to_string());
    let mut written = Vec::new();
    let mut index_lines = vec![render_header(project, options), String::new()];
    let references = project.field_references();

    for target in select_targets(project, options)? {
        let text = if options.scripts_only {
            render_target_scripts(target).unwrap_or_default()
        } else {
            render_target_section(target, &references, options)
        };
        let file_name = unique_filename(&target.name, "txt", &mut used);
        let path = out_dir.join(&file_name);
        fs::write(&path, finish(text).as_bytes())
            .with_context(|| format!("Failed to write '{}'.", path.display()))?;
        index_lines.push(format!("{} {} -> {}", target_kind(target), target.name, file_name));
        written.push(path);
    }

    if !options.scripts_only {
        index_lines.push(String::new());
        index_lines.push(render_stats(&project.stats()));
    }
    let index_path = out_dir.join(INDEX_FILE);
    fs::write(&index_path, finish(index_lines.join("\n")).as_bytes())
        .with_context(|| format!("Failed to write '{}'.", index_path.display()))?;
    written.push(index_path);
    info!(files = written.len(), dir = %out_dir.display(), "wrote split documentation");
    Ok(written)
}

fn target_properties(target: &Target) -> Vec<String> {
    let mut props = Vec::new();
    if let (Some(x), Some(y)) = (target.x, target.y) {
        props.push(format!("Position: ({}, {})", x, y));
    }
    if let Some(size) = target.size {
        props.push(format!("Size: {}%", size));
    }
    if let Some(direction) = target.direction {
        props.push(format!("Direction: {}", direction));
    }
    if let Some(style) = &target.rotation_style {
        props.push(format!("Rotation style: {}", style));
    }
    if let Some(visible) = target.visible {
        props.push(format!("Visible: {}", yes_no(visible)));
    }
    if let Some(draggable) = target.draggable {
        props.push(format!("Draggable: {}", yes_no(draggable)));
    }
    if let Some(volume) = target.volume {
        props.push(format!("Volume: {}%", volume));
    }
    if let Some(layer) = target.layer_order {
        props.push(format!("Layer: {}", layer));
    }
    if let Some(tempo) = target.tempo {
        props.push(format!("Tempo: {} bpm", tempo));
    }
    if let Some(video) = &target.video_state {
        props.push(format!("Video: {}", video));
    }
    if let Some(language) = &target.text_to_speech_language {
        props.push(format!("Text to speech: {}", language));
    }
    props
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn indent_text(text: &str, pad: &str) -> String {
    text.lines()
        .map(|line| format!("{}{}", pad, line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn target_kind(target: &Target) -> &'static str {
    if target.is_stage {
        "Stage"
    } else {
        "Sprite"
    }
}

fn finish(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
