//! Subcommands and their output.
//!
//! Sentences come from the command line, or one per line on stdin when none
//! are given. A sentence that fails to parse is reported on stderr and the
//! remaining sentences still run; session setup failures abort.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use linkgram::{
    ConfigOverrides, Endpoint, Error, Link, ParseOptionsConfig, ParsedLinkage, ParserConfig,
    ParserSession,
};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "linkgram", version, about = "Parse English sentences with link-grammar")]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Print one JSON object per sentence instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Session configuration flags, applied over config files.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Extra config file applied after the global and project files.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the link-grammar shared library.
    #[arg(long, global = true, value_name = "FILE")]
    pub library: Option<PathBuf>,

    /// Dictionary file.
    #[arg(long, global = true, value_name = "FILE")]
    pub dict: Option<PathBuf>,

    /// Post-processing knowledge file.
    #[arg(long, global = true, value_name = "FILE")]
    pub pp: Option<PathBuf>,

    /// Constituent knowledge file.
    #[arg(long, global = true, value_name = "FILE")]
    pub cons: Option<PathBuf>,

    /// Affix file.
    #[arg(long, global = true, value_name = "FILE")]
    pub affix: Option<PathBuf>,

    /// Maximum linkages enumerated per sentence.
    #[arg(long, global = true)]
    pub linkage_limit: Option<i32>,

    /// Seconds the engine may spend on one sentence.
    #[arg(long, global = true)]
    pub max_parse_time: Option<i32>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Constituent tree of the first linkage.
    Tree { sentences: Vec<String> },
    /// Links of every linkage.
    Links { sentences: Vec<String> },
    /// Words, links, link lengths and costs of every linkage.
    Details { sentences: Vec<String> },
    /// ASCII diagram of the first linkage.
    Diagram { sentences: Vec<String> },
    /// Number of linkages found.
    Count { sentences: Vec<String> },
}

impl ConfigArgs {
    fn resolve(&self) -> anyhow::Result<ParserConfig> {
        let cwd = std::env::current_dir().context("reading current directory")?;
        let mut config = ParserConfig::load(&cwd)?;
        if let Some(path) = &self.config {
            let layer = ConfigOverrides::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?;
            config = config.merge(layer);
        }
        Ok(config.merge(ConfigOverrides {
            dictionary: self.dict.clone(),
            post_process: self.pp.clone(),
            constituent: self.cons.clone(),
            affix: self.affix.clone(),
            library: self.library.clone(),
            options: ParseOptionsConfig {
                linkage_limit: self.linkage_limit,
                max_parse_time: self.max_parse_time,
                ..Default::default()
            },
        }))
    }
}

impl Command {
    fn sentences(&self) -> &[String] {
        match self {
            Command::Tree { sentences }
            | Command::Links { sentences }
            | Command::Details { sentences }
            | Command::Diagram { sentences }
            | Command::Count { sentences } => sentences,
        }
    }
}

#[derive(Serialize)]
struct Output<'a, T: Serialize> {
    sentence: &'a str,
    #[serde(flatten)]
    body: T,
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum Body {
    Tree(linkgram::ConstituentNode),
    Linkages(Vec<Vec<Link>>),
    Details(Vec<ParsedLinkage>),
    Diagram(String),
    Count(usize),
}

/// Run one command. Returns `false` if any sentence failed.
pub fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = cli.config.resolve()?;
    let session = ParserSession::create(&config).context("starting parser session")?;

    let sentences = match cli.command.sentences() {
        [] => read_stdin()?,
        given => given.to_vec(),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut all_ok = true;
    for sentence in &sentences {
        match parse(&session, &cli.command, sentence) {
            Ok(body) if cli.json => {
                serde_json::to_writer(&mut out, &Output { sentence, body })?;
                writeln!(out)?;
            }
            Ok(body) => write_text(&mut out, sentence, &body)?,
            Err(Error::NoLinkageFound) => {
                eprintln!("no linkage found: {sentence}");
                all_ok = false;
            }
            Err(e) => {
                eprintln!("{sentence}: {e}");
                all_ok = false;
            }
        }
    }
    Ok(all_ok)
}

fn parse(session: &ParserSession, command: &Command, sentence: &str) -> linkgram::Result<Body> {
    Ok(match command {
        Command::Tree { .. } => Body::Tree(session.parse_constituent_tree(sentence)?),
        Command::Links { .. } => Body::Linkages(session.parse_all_linkages(sentence)?),
        Command::Details { .. } => Body::Details(session.parse_linkages(sentence)?),
        Command::Diagram { .. } => Body::Diagram(session.diagram(sentence)?),
        Command::Count { .. } => Body::Count(session.linkage_count(sentence)?),
    })
}

fn read_stdin() -> anyhow::Result<Vec<String>> {
    let mut sentences = Vec::new();
    for line in std::io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        let line = line.trim();
        if !line.is_empty() {
            sentences.push(line.to_string());
        }
    }
    Ok(sentences)
}

fn endpoint(e: &Endpoint) -> String {
    match &e.word_type {
        Some(ty) => format!("{}.{ty}", e.word),
        None => e.word.clone(),
    }
}

fn write_link(out: &mut impl Write, link: &Link) -> std::io::Result<()> {
    write!(
        out,
        "    {:<8} {} -- {}",
        link.label,
        endpoint(&link.left),
        endpoint(&link.right)
    )
}

fn write_text(out: &mut impl Write, sentence: &str, body: &Body) -> std::io::Result<()> {
    match body {
        Body::Tree(tree) => writeln!(out, "{tree}"),
        Body::Diagram(diagram) => write!(out, "{diagram}"),
        Body::Count(count) => writeln!(out, "{count}\t{sentence}"),
        Body::Linkages(linkages) => {
            writeln!(out, "{sentence}")?;
            if linkages.is_empty() {
                writeln!(out, "  (no linkages)")?;
            }
            for (i, links) in linkages.iter().enumerate() {
                writeln!(out, "  linkage {i}:")?;
                for link in links {
                    write_link(out, link)?;
                    writeln!(out)?;
                }
            }
            Ok(())
        }
        Body::Details(linkages) => {
            writeln!(out, "{sentence}")?;
            if linkages.is_empty() {
                writeln!(out, "  (no linkages)")?;
            }
            for linkage in linkages {
                writeln!(
                    out,
                    "  linkage {} (cost {}, null count {}):",
                    linkage.index, linkage.link_cost, linkage.null_count
                )?;
                writeln!(out, "    words: {}", linkage.words.join(" "))?;
                for (link, length) in linkage.links.iter().zip(&linkage.link_lengths) {
                    write_link(out, link)?;
                    writeln!(out, "  [{length}]")?;
                }
            }
            Ok(())
        }
    }
}
