mod aggregator;
mod cli;
mod dispatcher;
mod filename;
mod http_host;
mod identifier;
mod page_scan;
mod picker;
mod prefs;

use anyhow::{Result, bail};
use clap::Parser;
use colored::*;
use log::{info, warn};
use std::collections::HashSet;
use std::time::Duration;

use aggregator::{Aggregator, HttpPageSource, TabInfo};
use cli::Args;
use dispatcher::Dispatcher;
use filename::{WhitespaceStyle, build_filename};
use http_host::HttpDownloadHost;
use page_scan::PaperRecord;
use prefs::Preferences;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    builder.format_timestamp_millis();
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    info!("Starting arxiv-fetch with args: {:?}", args);

    if args.tabs.is_empty() && args.active.is_none() {
        bail!("no tabs given; pass arXiv page URLs and/or --active <scholar-url>");
    }

    let style = resolve_whitespace_style(&args);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    // The active tab is enumerated like any other, then checked for Scholar.
    let mut tabs: Vec<TabInfo> = args.tabs.iter().map(|url| TabInfo::new(url.clone())).collect();
    let active = args.active.as_ref().map(|url| TabInfo::new(url.clone()));
    if let Some(ref active) = active {
        tabs.push(active.clone());
    }

    println!(
        "{} Scanning {} tab(s)...",
        "→".bright_blue().bold(),
        tabs.len().to_string().bright_cyan()
    );
    let aggregator = Aggregator::new(HttpPageSource::new(client.clone()));
    let mut report = aggregator.load_paper_items(&tabs, active.as_ref()).await;

    if report.scholar_scan_failed {
        println!(
            "{}  {}",
            "⚠️".yellow(),
            "Could not read the Google Scholar page; its results are missing.".yellow()
        );
    }

    if report.papers.is_empty() {
        let hint = if report.scholar_tab_active {
            "No arXiv links found on the Google Scholar page."
        } else {
            "No arXiv papers found in the given tabs."
        };
        println!("{} {}", "✗".red().bold(), hint);
        return Ok(());
    }

    println!("{} Fetching missing titles...", "→".bright_blue().bold());
    aggregator.hydrate_missing_titles(&mut report.papers).await;
    print_paper_list(&report.papers);

    let selected = match select_papers(&args, &report.papers)? {
        Some(selected) => selected,
        None => {
            println!("{}", "Cancelled.".yellow());
            return Ok(());
        }
    };

    if selected.is_empty() {
        println!("{} No papers selected", "✗".red().bold());
        return Ok(());
    }

    let requests: Vec<(String, String)> = report
        .papers
        .iter()
        .filter(|paper| selected.contains(&paper.arxiv_id))
        .map(|paper| {
            (
                paper.pdf_url.clone(),
                build_filename(paper.title.as_deref(), &paper.arxiv_id, style),
            )
        })
        .collect();

    if args.dry_run {
        println!("\n{}", "═══ DRY RUN MODE ═══".bold().bright_blue());
        for (url, filename) in &requests {
            println!(
                "{} {} {} {}",
                "DOWNLOAD:".green().bold(),
                url.bright_white(),
                "→".bright_blue().bold(),
                filename.bright_cyan()
            );
        }
        return Ok(());
    }

    let host = HttpDownloadHost::new(client, &args.out);
    let dispatcher = Dispatcher::new(host);

    let summary = dispatcher
        .download_all(&requests, |current, total| {
            println!(
                "{} Downloading {} of {}...",
                "→".bright_blue().bold(),
                current.to_string().bright_cyan(),
                total
            );
        })
        .await;

    for (filename, err) in &summary.failures {
        println!(
            "  {} {} ({})",
            "Download failed:".red().bold(),
            filename.bright_white(),
            err
        );
    }

    let line = format!("Started {}/{} downloads", summary.started, summary.total);
    if summary.failures.is_empty() {
        println!("\n{} {}", "✓".green().bold(), line.bright_green().bold());
    } else {
        println!("\n{}  {}", "⚠️".yellow(), line.yellow().bold());
    }

    Ok(())
}

/// `--whitespace` wins and becomes the new persisted default; otherwise the
/// stored preference (or plain spaces) applies.
fn resolve_whitespace_style(args: &Args) -> WhitespaceStyle {
    let mut prefs = Preferences::load();
    match &args.whitespace {
        Some(raw) => {
            let style = WhitespaceStyle::parse(raw);
            prefs.whitespace_option = Some(style.as_str().to_string());
            if let Err(err) = prefs.save() {
                warn!("Could not persist whitespace preference: {}", err);
            }
            style
        }
        None => prefs.whitespace_style(),
    }
}

fn print_paper_list(papers: &[PaperRecord]) {
    println!(
        "\n{} {}",
        "📄".bright_white(),
        format!("{} paper(s) found", papers.len()).bold()
    );
    for (index, paper) in papers.iter().enumerate() {
        let title = match &paper.title {
            Some(title) => title.bright_white(),
            None => "Title unavailable".bright_black(),
        };
        println!(
            "  {:>2}. {} {}",
            index + 1,
            title,
            format!("({} • {})", paper.arxiv_id, paper.source.label()).bright_black()
        );
    }
}

/// Resolve the SelectionSet: interactive picker, explicit `--select` list
/// (unknown identifiers are reported and skipped), or everything.
fn select_papers(args: &Args, papers: &[PaperRecord]) -> Result<Option<HashSet<String>>> {
    if args.pick {
        return picker::pick_papers(papers);
    }

    match args.selection() {
        Some(requested) => {
            let known: HashSet<&str> = papers.iter().map(|p| p.arxiv_id.as_str()).collect();
            let mut selected = HashSet::new();
            for id in requested {
                if known.contains(id.as_str()) {
                    selected.insert(id);
                } else {
                    warn!("Ignoring unknown identifier {}", id);
                    println!(
                        "  {}  Unknown identifier {}",
                        "⚠️".yellow(),
                        id.bright_white()
                    );
                }
            }
            Ok(Some(selected))
        }
        None => Ok(Some(papers.iter().map(|p| p.arxiv_id.clone()).collect())),
    }
}
