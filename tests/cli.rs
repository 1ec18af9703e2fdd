use clap::Parser;
use scratchdoc_core::cli::Args;
use scratchdoc_core::fetch::{asset_url, metadata_url, project_json_url, HttpGet};
use scratchdoc_core::sb3::build_sb3_bytes;
use scratchdoc_core::{run_cli, run_download};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const PROJECT: &str = r#"{
    "targets": [
        {
            "name": "Stage", "isStage": true, "blocks": {},
            "variables": {"v": ["high score", 12, true]},
            "costumes": [{"name": "backdrop1", "assetId": "BG", "dataFormat": "svg", "md5ext": "BG.svg"}],
            "sounds": []
        },
        {
            "name": "Cat", "isStage": false,
            "blocks": {
                "a": {"opcode": "event_whenkeypressed", "next": "b", "parent": null,
                      "inputs": {}, "fields": {"KEY_OPTION": ["space", null]}, "topLevel": true},
                "b": {"opcode": "looks_say", "next": null, "parent": "a",
                      "inputs": {"MESSAGE": [1, [10, "Hi"]]}, "fields": {}}
            },
            "costumes": [],
            "sounds": []
        }
    ],
    "meta": {"semver": "3.0.0"}
}"#;

fn write_sb3(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let svg = b"<svg/>".to_vec();
    let json = PROJECT.replace("BG", &format!("{:x}", md5::compute(&svg)));
    let bytes = build_sb3_bytes(&json, vec![(format!("{:x}.svg", md5::compute(&svg)), svg)]).unwrap();
    fs::write(&path, bytes).unwrap();
    path
}

fn run(args: &[&str]) -> anyhow::Result<()> {
    let args = Args::try_parse_from(std::iter::once("scratchdoc").chain(args.iter().copied()))?;
    run_cli(&args)
}

#[test]
fn document_is_written_with_title_and_link() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_sb3(dir.path(), "Cat Game-777-project.sb3");
    let out = dir.path().join("doc.txt");
    run(&[input.to_str().unwrap(), out.to_str().unwrap()]).unwrap();

    let text = fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("Cat Game-777-project\nLink: https://scratch.mit.edu/projects/777/\n"));
    assert!(text.contains("  - \u{2601} high score = 12"));
    assert!(text.contains("when [space v] key pressed\nsay [Hi]"));
}

#[test]
fn split_targets_writes_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_sb3(dir.path(), "game.sb3");
    let out = dir.path().join("docs");
    run(&[input.to_str().unwrap(), out.to_str().unwrap(), "--split-targets"]).unwrap();
    assert!(out.join("Stage.txt").is_file());
    assert!(out.join("Cat.txt").is_file());
    assert!(out.join("index.txt").is_file());
}

#[test]
fn unpack_then_pack_keeps_assets_verifiable() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_sb3(dir.path(), "game.sb3");
    let unpacked = dir.path().join("unpacked");
    run(&[input.to_str().unwrap(), unpacked.to_str().unwrap(), "--unpack"]).unwrap();
    assert!(unpacked.join("project.json").is_file());

    let repacked = dir.path().join("repacked.sb3");
    run(&[unpacked.to_str().unwrap(), repacked.to_str().unwrap(), "--pack"]).unwrap();
    run(&[repacked.to_str().unwrap(), "--verify-assets"]).unwrap();
}

#[test]
fn tampered_asset_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.sb3");
    let json = PROJECT.replace("BG", "0123456789abcdef0123456789abcdef");
    let bytes = build_sb3_bytes(
        &json,
        vec![("0123456789abcdef0123456789abcdef.svg".to_string(), b"<svg/>".to_vec())],
    )
    .unwrap();
    fs::write(&path, bytes).unwrap();
    let err = run(&[path.to_str().unwrap(), "--verify-assets"]).unwrap_err();
    assert!(err.to_string().contains("Asset verification failed"));
}

#[test]
fn conflicting_flags_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_sb3(dir.path(), "game.sb3");
    let input = input.to_str().unwrap();

    let err = run(&[input, "--stats", "--unpack"]).unwrap_err();
    assert!(err.to_string().contains("cannot be combined"));

    let err = run(&[input, "--split-targets"]).unwrap_err();
    assert!(err.to_string().contains("requires an OUTPUT directory"));

    let err = run(&[input, "--verify-assets", "--target", "Cat"]).unwrap_err();
    assert!(err.to_string().contains("--target cannot be used"));
}

#[test]
fn missing_target_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_sb3(dir.path(), "game.sb3");
    let out = dir.path().join("doc.txt");
    let err = run(&[input.to_str().unwrap(), out.to_str().unwrap(), "--target", "Dog"]).unwrap_err();
    assert!(err.to_string().contains("Target 'Dog' not found"));
}

struct CannedScratch(HashMap<String, Vec<u8>>);

impl HttpGet for CannedScratch {
    fn get(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        self.0
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unexpected GET {}", url))
    }
}

#[test]
fn download_writes_archive_and_metadata_used_by_the_document() {
    let svg = b"<svg/>".to_vec();
    let svg_name = format!("{:x}.svg", md5::compute(&svg));
    let project_json = PROJECT.replace("BG", &format!("{:x}", md5::compute(&svg)));
    let metadata = r#"{"id": 777, "title": "Cat Game", "author": {"username": "maker"},
        "instructions": "Press space.", "description": "",
        "stats": {"views": 3, "loves": 1, "favorites": 0, "remixes": 0},
        "remix": {"parent": null, "root": null}, "project_token": "tok"}"#;
    let client = CannedScratch(HashMap::from([
        (metadata_url("777"), metadata.as_bytes().to_vec()),
        (project_json_url("777", "tok"), project_json.into_bytes()),
        (asset_url(&svg_name), svg),
    ]));

    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("Cat Game-777-project.sb3");
    let args = Args::try_parse_from([
        "scratchdoc",
        "https://scratch.mit.edu/projects/777/",
        archive.to_str().unwrap(),
        "--download",
    ])
    .unwrap();
    run_download(&args, &client).unwrap();
    assert!(dir.path().join("Cat Game-777-project.metadata.json").is_file());
    run(&[archive.to_str().unwrap(), "--verify-assets"]).unwrap();

    let doc = dir.path().join("doc.txt");
    run(&[archive.to_str().unwrap(), doc.to_str().unwrap()]).unwrap();
    let text = fs::read_to_string(&doc).unwrap();
    assert!(text.starts_with(
        "Cat Game\n\
         Link: https://scratch.mit.edu/projects/777/\n\
         Author: maker (https://scratch.mit.edu/users/maker/)\n\
         Remix: no\n"
    ));
    assert!(text.contains("Instructions\n  Press space.\n"));
}

#[test]
fn download_conflicts_with_other_modes() {
    let err = run(&["123", "--download", "--pack"]).unwrap_err();
    assert!(err.to_string().contains("cannot be combined"));
    let err = run(&["123", "--download", "--scripts-only"]).unwrap_err();
    assert!(err.to_string().contains("--scripts-only cannot be used with --download"));
}
