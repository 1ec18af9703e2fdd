use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "scratchdoc",
    version,
    about = "Document Scratch 3 projects and print their scripts as scratchblocks text."
)]
pub struct Args {
    #[arg(
        value_name = "INPUT",
        help = "Project .sb3 or project.json (a directory with --pack, a URL or id with --download)."
    )]
    pub input: PathBuf,

    #[arg(
        value_name = "OUTPUT",
        help = "Output file or directory. Documents go to stdout when omitted."
    )]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Print only the scratchblocks scripts of each target.")]
    pub scripts_only: bool,

    #[arg(long, value_name = "NAME", help = "Only document the target with this name.")]
    pub target: Option<String>,

    #[arg(
        long,
        help = "Write one file per target plus index.txt into the OUTPUT directory."
    )]
    pub split_targets: bool,

    #[arg(long, help = "Print project statistics only.")]
    pub stats: bool,

    #[arg(
        long,
        help = "Check every asset's md5 against its file name. Fails on mismatch or missing assets."
    )]
    pub verify_assets: bool,

    #[arg(long, help = "Extract project.json and assets into the OUTPUT directory.")]
    pub unpack: bool,

    #[arg(long, help = "Build an .sb3 at OUTPUT from the INPUT directory.")]
    pub pack: bool,

    #[arg(
        long,
        help = "Download the shared project named by INPUT (URL or id) to an .sb3 at OUTPUT."
    )]
    pub download: bool,

    #[arg(long, value_name = "TITLE", help = "Document title. Defaults to the input file name.")]
    pub title: Option<String>,

    #[arg(
        long,
        value_name = "URL_OR_ID",
        help = "Scratch project URL or id to link from the document."
    )]
    pub project: Option<String>,

    #[arg(short, long, help = "Enable debug logging on stderr.")]
    pub verbose: bool,
}

impl Args {
    /// Modes that replace document rendering entirely.
    pub(crate) fn exclusive_modes(&self) -> Vec<&'static str> {
        let mut modes = Vec::new();
        if self.stats {
            modes.push("--stats");
        }
        if self.verify_assets {
            modes.push("--verify-assets");
        }
        if self.unpack {
            modes.push("--unpack");
        }
        if self.pack {
            modes.push("--pack");
        }
        if self.download {
            modes.push("--download");
        }
        modes
    }
}
