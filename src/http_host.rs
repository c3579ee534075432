use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, info};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;

use crate::dispatcher::{DownloadHost, DownloadId, FilenameDecision, FilenameHook};

/// `DownloadHost` that streams over HTTP into a destination directory.
///
/// `begin` only opens the transfer and validates the response; nothing is
/// written until `settle` has asked the hook for a name. Conflicts are
/// resolved by appending " (1)", " (2)", ... before the extension.
pub struct HttpDownloadHost {
    client: reqwest::Client,
    dest_dir: PathBuf,
    next_id: AtomicU64,
    active: Mutex<HashMap<DownloadId, reqwest::Response>>,
}

impl HttpDownloadHost {
    pub fn new(client: reqwest::Client, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            dest_dir: dest_dir.into(),
            next_id: AtomicU64::new(1),
            active: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl DownloadHost for HttpDownloadHost {
    async fn begin(&self, url: &str, _suppress_prompt: bool) -> Result<DownloadId, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| err.to_string())?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.active.lock().unwrap().insert(id, response);
        debug!("Transfer {} opened for {}", id, url);
        Ok(id)
    }

    async fn settle(&self, id: DownloadId, hook: &dyn FilenameHook) -> Result<(), String> {
        let response = self
            .active
            .lock()
            .unwrap()
            .remove(&id)
            .ok_or_else(|| format!("unknown download handle {}", id))?;

        let filename = match hook.determine_filename(id) {
            FilenameDecision::Suggest { filename, .. } => filename,
            FilenameDecision::Default => default_filename(response.url().as_str()),
        };

        let dest = unique_destination(&self.dest_dir, &filename);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| err.to_string())?;
        }

        let mut file = tokio::fs::File::create(&dest)
            .await
            .map_err(|err| err.to_string())?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| err.to_string())?;
            file.write_all(&chunk).await.map_err(|err| err.to_string())?;
        }
        file.flush().await.map_err(|err| err.to_string())?;

        info!("Saved {}", dest.display());
        Ok(())
    }
}

/// Last path segment of the URL, the way a download manager would name an
/// unmanaged transfer.
fn default_filename(url: &str) -> String {
    url.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or("download.pdf")
        .to_string()
}

/// First non-colliding path for `filename` under `dir`.
fn unique_destination(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, extension) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{}", ext)),
        _ => (filename.to_string(), String::new()),
    };

    let mut counter = 1;
    loop {
        let renamed = dir.join(format!("{} ({}){}", stem, counter, extension));
        if !renamed.exists() {
            return renamed;
        }
        counter += 1;
    }
}
