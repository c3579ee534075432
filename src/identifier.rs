use regex::Regex;
use url::Url;

pub const ARXIV_ABS_BASE: &str = "https://arxiv.org/abs/";
pub const ARXIV_PDF_BASE: &str = "https://arxiv.org/pdf/";

/// Extract the arXiv identifier from an abstract or PDF URL.
///
/// Matches a path of the form `/abs/<id>` or `/pdf/<id>[.pdf]`. Anything
/// else, including unparsable input, yields `None` rather than an error.
pub fn extract_identifier(raw_url: &str) -> Option<String> {
    let parsed = Url::parse(raw_url).ok()?;
    let re = Regex::new(r"^/(abs|pdf)/(.+)$").unwrap();
    let caps = re.captures(parsed.path())?;

    let mut id_part = caps.get(2).unwrap().as_str();
    if let Some(stripped) = id_part.strip_suffix(".pdf") {
        id_part = stripped;
    }

    if id_part.is_empty() {
        None
    } else {
        Some(id_part.to_string())
    }
}

pub fn is_arxiv_url(url: &str) -> bool {
    url.contains("arxiv.org/abs/") || url.contains("arxiv.org/pdf/")
}

pub fn is_scholar_url(url: &str) -> bool {
    url.contains("scholar.google.")
}

/// Resolve the arXiv URL a tab is really showing.
///
/// Candidates are the tab URL and its in-flight navigation target, in that
/// order. A candidate counts if it is an arXiv abs/pdf URL itself, or if it
/// is a PDF-viewer wrapper whose `file` query parameter points at one.
pub fn resolve_arxiv_url<'a, I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    for candidate in candidates {
        if is_arxiv_url(candidate) {
            return Some(candidate.to_string());
        }

        if let Ok(parsed) = Url::parse(candidate) {
            if let Some((_, value)) = parsed.query_pairs().find(|(key, _)| key == "file") {
                if is_arxiv_url(&value) {
                    return Some(value.into_owned());
                }
            }
        }
    }

    None
}

/// Normalize a raw paper title into its canonical, filesystem-safe form.
///
/// Strips the characters `<>:"/\|?*`, collapses whitespace runs to single
/// spaces and trims. Empty input (or input that is empty after stripping)
/// yields `None`. Idempotent.
pub fn normalize_title(raw: &str) -> Option<String> {
    let stripped: String = raw
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect();

    let re = Regex::new(r"\s+").unwrap();
    let collapsed = re.replace_all(&stripped, " ");
    let trimmed = collapsed.trim();

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Remove the leading "Title:" label arXiv puts on its visible heading.
pub fn strip_title_label(text: &str) -> String {
    let re = Regex::new(r"(?i)^\s*Title:\s*").unwrap();
    re.replace(text, "").trim().to_string()
}
