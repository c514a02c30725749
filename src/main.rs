use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use chat_anchor::app::{conversation_id, Navigator};
use chat_anchor::config::NavigatorConfig;
use chat_anchor::dom::Document;
use chat_anchor::engine::scanner::Scanner;
use chat_anchor::net::bridge::{BackgroundBridge, NoSummarizer, SummaryChannel, SummaryRequest};
use chat_anchor::net::fetch::load_source;
use chat_anchor::net::summarize::SummaryClient;
use chat_anchor::store::{normalize_label, JsonFileStore, LabelStore, MemoryStore};

/// Outline navigator for chat transcripts.
#[derive(Parser)]
#[command(name = "chat-anchor", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TOML file overriding the built-in configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Location to report for the page (e.g. https://chatgpt.com/c/<id>)
    #[arg(long, global = true)]
    location: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// List the questions of a transcript
    Outline {
        /// File path or http(s) URL
        source: String,
        #[arg(long)]
        json: bool,
    },
    /// Run the navigator headless and print the panel markup
    Panel {
        source: String,
        /// Jump to the question with this 1-based index
        #[arg(long)]
        jump: Option<usize>,
        /// Filter the panel as if typed into the search box
        #[arg(long)]
        search: Option<String>,
    },
    /// Ask the summarization proxy for a label for one question
    Summarize {
        source: String,
        /// 1-based question index
        #[arg(short, long)]
        entry: usize,
        #[arg(long)]
        api_base: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => NavigatorConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => NavigatorConfig::default(),
    };

    match cli.command {
        Command::Outline { source, json } => {
            let doc = load_document(&config, &source, cli.location.as_deref())?;
            let outline = Scanner::from_config(&config)?.scan(&doc, None);
            if json {
                println!("{}", serde_json::to_string_pretty(outline.entries())?);
            } else {
                for entry in outline.iter() {
                    println!("Q{}\t{}\t{}", entry.index, entry.id, entry.summary_text);
                }
            }
        }
        Command::Panel {
            source,
            jump,
            search,
        } => {
            let doc = load_document(&config, &source, cli.location.as_deref())?;
            let store = open_store(&config);
            let mut nav = Navigator::new(config, doc, store, Box::new(NoSummarizer))?;
            nav.start();
            nav.run_until_idle();

            if let Some(term) = search {
                nav.search_input(&term);
                nav.run_until_idle();
            }
            if let Some(index) = jump {
                let Some(entry) = nav.outline().by_index(index) else {
                    bail!("no question #{index} (outline has {})", nav.outline().len());
                };
                let id = entry.id.clone();
                nav.click_entry(&id);
                nav.run_until_idle();
                log::info!("scrolled to {} at {:.0}px", id, nav.document().scroll_top());
            }
            println!("{}", nav.panel_html().unwrap_or_default());
            nav.teardown();
        }
        Command::Summarize {
            source,
            entry,
            api_base,
        } => {
            let Some(api_base) = api_base.or_else(|| config.api_base.clone()) else {
                bail!("no summarization endpoint: pass --api-base or set api_base");
            };
            let doc = load_document(&config, &source, cli.location.as_deref())?;
            let mut scanner = Scanner::from_config(&config)?;
            let outline = scanner.scan(&doc, None);
            let Some(target) = outline.by_index(entry) else {
                bail!("no question #{entry} (outline has {})", outline.len());
            };

            let conversation = conversation_id(doc.location());
            let text = scanner.conversation_text(&doc, target, config.summary_input_max_chars);
            let client = SummaryClient::new(&api_base, Duration::from_secs(config.http_timeout_secs))?;
            let mut bridge = BackgroundBridge::spawn(client);
            bridge.send(SummaryRequest {
                conversation: conversation.clone(),
                entry_id: target.id.clone(),
                text,
            })?;
            let reply = bridge.recv().context("summarization worker exited")?;
            let summary = match reply.result {
                Ok(summary) => summary,
                Err(message) => bail!("summarization failed: {message}"),
            };
            let label = normalize_label(&summary, config.rename_max_len).unwrap_or(summary);

            if let Some(conversation) = conversation {
                let mut store = open_store(&config);
                if let Err(e) = store.set(&conversation, &target.id, Some(&label)) {
                    log::warn!("could not save label: {}", e);
                }
            }
            println!("{label}");
        }
    }
    Ok(())
}

fn load_document(config: &NavigatorConfig, source: &str, location: Option<&str>) -> Result<Document> {
    let page = load_source(source, Duration::from_secs(config.http_timeout_secs))
        .with_context(|| format!("loading {source}"))?;
    log::debug!("loaded {} ({} bytes)", page.url, page.html.len());
    Ok(Document::from_html(&page.html, location.unwrap_or(&page.url)))
}

fn open_store(config: &NavigatorConfig) -> Box<dyn LabelStore> {
    match &config.store_path {
        Some(path) => Box::new(JsonFileStore::new(path)),
        None => Box::new(MemoryStore::new()),
    }
}
