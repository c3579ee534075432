use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "arxiv-fetch",
    about = "Download arXiv PDFs named after their paper titles",
    version = "0.1.0"
)]
pub struct Args {
    /// Tab URLs to inspect for arXiv papers
    #[arg(
        value_name = "URL",
        help = "URLs of open tabs to inspect (arXiv abstract/PDF pages, or PDF-viewer wrappers)"
    )]
    pub tabs: Vec<String>,

    /// Active tab, typically a Google Scholar results page
    #[arg(
        long,
        value_name = "URL",
        help = "Active tab URL; a Google Scholar results page is scanned for arXiv links"
    )]
    pub active: Option<String>,

    /// Directory downloads are saved into
    #[arg(
        long,
        short = 'o',
        value_name = "DIR",
        default_value = ".",
        help = "Directory to save PDFs into"
    )]
    pub out: PathBuf,

    /// Whitespace style for filenames
    #[arg(
        long,
        value_name = "STYLE",
        help = "Whitespace style for filenames: underscore, hyphen or space (persisted as the new default)"
    )]
    pub whitespace: Option<String>,

    /// Only list detected papers, don't download
    #[arg(
        long,
        short = 'd',
        help = "List detected papers and filenames without downloading"
    )]
    pub dry_run: bool,

    /// Restrict the download to specific identifiers
    #[arg(
        long,
        value_name = "ID1,ID2",
        help = "Comma-separated arXiv identifiers to download (default: all detected)"
    )]
    pub select: Option<String>,

    /// Pick papers interactively
    #[arg(long, help = "Pick papers interactively before downloading")]
    pub pick: bool,

    /// Verbose output
    #[arg(long, short = 'v', help = "Enable verbose logging")]
    pub verbose: bool,
}

impl Args {
    /// Explicit identifier selection, if any.
    pub fn selection(&self) -> Option<Vec<String>> {
        self.select.as_ref().map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}
