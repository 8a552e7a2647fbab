use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "gitodb",
    about = "Read objects from a git repository without git",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log debug events to stderr
    #[arg(long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Start looking for the repository here instead of the current directory
    #[arg(short = 'C', global = true, default_value = ".")]
    pub repo: PathBuf,

    /// Verify checksums, CRCs and loose object digests on read
    #[arg(long, global = true)]
    pub strict: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the type, size or content of an object
    CatFile(CatFileArgs),
    /// Show first-parent history of a commit
    Log(LogArgs),
    /// List the entries of a tree
    LsTree(LsTreeArgs),
    /// Check a pack file and describe its objects
    VerifyPack(VerifyPackArgs),
}

#[derive(Args)]
#[command(group(ArgGroup::new("mode").required(true).args(["kind", "size", "pretty"])))]
pub struct CatFileArgs {
    /// Print the object type
    #[arg(short = 't')]
    pub kind: bool,
    /// Print the object size
    #[arg(short = 's')]
    pub size: bool,
    /// Pretty-print the object content
    #[arg(short = 'p')]
    pub pretty: bool,
    pub object: String,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long = "max-count")]
    pub limit: Option<usize>,
    #[arg(long)]
    pub oneline: bool,
    pub commit: String,
}

#[derive(Args)]
pub struct LsTreeArgs {
    /// Recurse into subtrees
    #[arg(short = 'r')]
    pub recursive: bool,
    /// A tree, or a commit whose root tree is listed
    pub tree: String,
}

#[derive(Args)]
pub struct VerifyPackArgs {
    /// List every object, then the chain length histogram
    #[arg(short = 'v')]
    pub list: bool,
    /// The `.idx` or `.pack` file
    pub pack: PathBuf,
}
