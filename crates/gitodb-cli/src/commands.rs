use std::borrow::Cow;
use std::io::{IsTerminal, Write};
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use gitodb_sdk::{
    Commit, Digest, ObjectKind, PackFile, PackOptions, Repository, RepositoryConfig, Signature,
    TreeEntry,
};
use serde::Serialize;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let json = cli.format == OutputFormat::Json;
    let config = if cli.strict {
        RepositoryConfig::strict()
    } else {
        RepositoryConfig::default()
    };
    match cli.command {
        Command::CatFile(args) => cmd_cat_file(&open(&cli.repo, config)?, args, json),
        Command::Log(args) => cmd_log(&open(&cli.repo, config)?, args, json),
        Command::LsTree(args) => cmd_ls_tree(&open(&cli.repo, config)?, args, json),
        Command::VerifyPack(args) => cmd_verify_pack(args, cli.strict, json),
    }
}

fn open(hint: &Path, config: RepositoryConfig) -> anyhow::Result<Repository> {
    Repository::open_with(hint, config)
        .with_context(|| format!("cannot open repository at {}", hint.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn use_color() -> bool {
    std::io::stdout().is_terminal()
}

// ---- cat-file ----

#[derive(Serialize)]
struct ObjectSummary {
    digest: Digest,
    #[serde(rename = "type")]
    kind: ObjectKind,
    size: usize,
}

fn cmd_cat_file(repo: &Repository, args: CatFileArgs, json: bool) -> anyhow::Result<()> {
    let digest = repo.resolve_id(&args.object)?;

    if args.kind {
        let kind = repo.kind_of(&digest)?;
        if json {
            return print_json(&serde_json::json!({ "digest": digest, "type": kind }));
        }
        println!("{kind}");
        return Ok(());
    }

    let raw = repo.read_raw(&digest)?;
    if args.size {
        if json {
            return print_json(&ObjectSummary {
                digest,
                kind: raw.kind,
                size: raw.data.len(),
            });
        }
        println!("{}", raw.data.len());
        return Ok(());
    }

    if json {
        return print_json(&repo.object(&digest)?);
    }
    match raw.kind {
        ObjectKind::Tree => {
            for entry in repo.tree(&digest)?.entries {
                println!("{}", format_tree_entry(&entry.name_lossy(), &entry));
            }
        }
        ObjectKind::Commit | ObjectKind::Blob | ObjectKind::Tag => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&raw.data)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

// ---- log ----

#[derive(Serialize)]
struct LogEntry<'a> {
    commit: Option<Digest>,
    tree: Digest,
    parents: &'a [Digest],
    author: &'a Signature,
    committer: &'a Signature,
    message: Cow<'a, str>,
}

impl<'a> From<&'a Commit> for LogEntry<'a> {
    fn from(commit: &'a Commit) -> Self {
        Self {
            commit: commit.digest,
            tree: commit.tree,
            parents: &commit.parents,
            author: &commit.author,
            committer: &commit.committer,
            message: commit.message_text(),
        }
    }
}

fn cmd_log(repo: &Repository, args: LogArgs, json: bool) -> anyhow::Result<()> {
    let start = repo.resolve_id(&args.commit)?;
    let history = repo.log_limit(&start, args.limit)?;

    if json {
        let entries: Vec<LogEntry<'_>> = history.iter().map(LogEntry::from).collect();
        return print_json(&entries);
    }

    let color = use_color();
    for (i, commit) in history.iter().enumerate() {
        if args.oneline {
            println!("{}", format_oneline(commit, color));
        } else {
            if i > 0 {
                println!();
            }
            print!("{}", format_commit(commit, color));
        }
    }
    Ok(())
}

/// `git log` medium format: header, author, date, then the message
/// indented by four spaces.
fn format_commit(commit: &Commit, color: bool) -> String {
    let header = format!("commit {}", digest_text(commit));
    let header = if color {
        header.yellow().to_string()
    } else {
        header
    };
    let mut out = format!(
        "{header}\nAuthor: {}\nDate:   {}\n\n",
        commit.author.identity(),
        git_date(&commit.author)
    );
    for line in commit.message_text().lines() {
        if line.is_empty() {
            out.push('\n');
        } else {
            out.push_str(&format!("    {line}\n"));
        }
    }
    out
}

fn format_oneline(commit: &Commit, color: bool) -> String {
    let short = match &commit.digest {
        Some(digest) => digest.short_hex(),
        None => String::new(),
    };
    let short = if color {
        short.yellow().to_string()
    } else {
        short
    };
    format!("{short} {}", commit.summary())
}

fn digest_text(commit: &Commit) -> String {
    commit.digest.map(|d| d.to_hex()).unwrap_or_default()
}

fn git_date(sig: &Signature) -> String {
    sig.when().format("%a %b %-d %H:%M:%S %Y %z").to_string()
}

// ---- ls-tree ----

#[derive(Serialize)]
struct ListedEntry<'a> {
    mode: &'a str,
    #[serde(rename = "type")]
    kind: ObjectKind,
    digest: Digest,
    path: &'a str,
}

fn cmd_ls_tree(repo: &Repository, args: LsTreeArgs, json: bool) -> anyhow::Result<()> {
    let digest = repo.resolve_id(&args.tree)?;
    let tree = repo.peel_to_tree(&digest)?;

    let listing: Vec<(String, TreeEntry)> = if args.recursive {
        let root = tree.digest.unwrap_or(digest);
        repo.walk_tree(&root)?
            .into_iter()
            .filter(|(_, entry)| !entry.is_tree())
            .collect()
    } else {
        tree.entries
            .into_iter()
            .map(|entry| (entry.name_lossy().into_owned(), entry))
            .collect()
    };

    if json {
        let entries: Vec<ListedEntry<'_>> = listing
            .iter()
            .map(|(path, entry)| ListedEntry {
                mode: &entry.mode,
                kind: entry.kind,
                digest: entry.digest,
                path,
            })
            .collect();
        return print_json(&entries);
    }
    for (path, entry) in &listing {
        println!("{}", format_tree_entry(path, entry));
    }
    Ok(())
}

fn format_tree_entry(path: &str, entry: &TreeEntry) -> String {
    format!("{} {} {}\t{}", entry.mode, entry.kind, entry.digest, path)
}

// ---- verify-pack ----

fn cmd_verify_pack(args: VerifyPackArgs, strict: bool, json: bool) -> anyhow::Result<()> {
    let options = PackOptions {
        verify_checksums: strict,
        ..PackOptions::default()
    };
    let pack = PackFile::open(&args.pack, &options)
        .with_context(|| format!("cannot read pack {}", args.pack.display()))?;
    let report = pack.verify_report();

    if json {
        print_json(&report)?;
    } else {
        let rendered = report.render(args.list);
        if use_color() && !report.is_ok() {
            print!("{}", rendered.red());
        } else {
            print!("{rendered}");
        }
    }

    if !report.is_ok() {
        bail!("{} of {} objects failed to resolve", report.failed, report.objects.len());
    }
    Ok(())
}
