use async_trait::async_trait;
use log::{debug, info};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Opaque download handle issued by the host, valid for one download.
pub type DownloadId = u64;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// The host refused to start the download; carries its message verbatim.
    #[error("{0}")]
    Rejected(String),
    /// The transfer started but did not complete.
    #[error("{0}")]
    Transfer(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictAction {
    /// Auto-rename on collision rather than overwrite or prompt.
    Uniquify,
}

/// What the filename hook tells the host to do with a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilenameDecision {
    Suggest {
        filename: String,
        conflict: ConflictAction,
    },
    /// Not one of ours; the host names it however it normally would.
    Default,
}

/// Host-side download facility, e.g. a browser's download manager or the
/// HTTP implementation in `http_host`.
///
/// `begin` must not write anything to disk; the final name is only known
/// once `settle` has consulted the hook. The host calls the hook exactly
/// once per accepted download.
#[async_trait]
pub trait DownloadHost: Send + Sync {
    async fn begin(&self, url: &str, suppress_prompt: bool) -> Result<DownloadId, String>;
    async fn settle(&self, id: DownloadId, hook: &dyn FilenameHook) -> Result<(), String>;
}

pub trait FilenameHook: Send + Sync {
    fn determine_filename(&self, id: DownloadId) -> FilenameDecision;
}

/// Handle-to-filename side table. The host silently ignores any filename
/// passed at initiation time, so the desired name is parked here and
/// applied from the naming hook instead. Insert on start, take once on
/// callback; an entry that is never taken just sits until teardown.
#[derive(Debug, Default)]
pub struct OverrideTable {
    pending: Mutex<HashMap<DownloadId, String>>,
}

impl OverrideTable {
    pub fn insert(&self, id: DownloadId, filename: impl Into<String>) {
        self.pending.lock().unwrap().insert(id, filename.into());
    }

    /// Read-once: removes and returns the entry for this handle.
    pub fn take(&self, id: DownloadId) -> Option<String> {
        self.pending.lock().unwrap().remove(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().unwrap().is_empty()
    }
}

/// Outcome of a bulk download sequence.
#[derive(Debug, Default)]
pub struct BulkReport {
    pub started: usize,
    pub total: usize,
    /// (filename, error) per failed item, in order.
    pub failures: Vec<(String, DownloadError)>,
}

pub struct Dispatcher<H: DownloadHost> {
    host: H,
    overrides: OverrideTable,
}

impl<H: DownloadHost> Dispatcher<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            overrides: OverrideTable::default(),
        }
    }

    /// Start one download and record the filename override for its handle.
    /// A rejection carries the host's message and records nothing; there is
    /// no automatic retry.
    pub async fn start_download(
        &self,
        url: &str,
        filename: &str,
    ) -> Result<DownloadId, DownloadError> {
        let id = self
            .host
            .begin(url, true)
            .await
            .map_err(DownloadError::Rejected)?;

        self.overrides.insert(id, filename);
        debug!("Download {} accepted for {} -> {}", id, url, filename);
        Ok(id)
    }

    /// Drive a previously accepted transfer to completion. The host calls
    /// back into `determine_filename` before naming the file.
    pub async fn settle(&self, id: DownloadId) -> Result<(), DownloadError> {
        self.host
            .settle(id, self)
            .await
            .map_err(DownloadError::Transfer)
    }

    /// Download every (url, filename) request strictly in order, one full
    /// start-and-settle cycle per item. A failed item is counted and the
    /// sequence moves on; nothing aborts the rest.
    pub async fn download_all(
        &self,
        requests: &[(String, String)],
        mut progress: impl FnMut(usize, usize),
    ) -> BulkReport {
        let mut report = BulkReport {
            total: requests.len(),
            ..BulkReport::default()
        };

        for (index, (url, filename)) in requests.iter().enumerate() {
            progress(index + 1, requests.len());

            let outcome = match self.start_download(url, filename).await {
                Ok(id) => self.settle(id).await,
                Err(err) => Err(err),
            };

            match outcome {
                Ok(()) => report.started += 1,
                Err(err) => report.failures.push((filename.clone(), err)),
            }
        }

        info!(
            "Bulk download finished: started {}/{}",
            report.started, report.total
        );
        report
    }
}

impl<H: DownloadHost> FilenameHook for Dispatcher<H> {
    fn determine_filename(&self, id: DownloadId) -> FilenameDecision {
        match self.overrides.take(id) {
            Some(filename) => FilenameDecision::Suggest {
                filename,
                conflict: ConflictAction::Uniquify,
            },
            None => FilenameDecision::Default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Scripted host: rejects URLs containing "reject", records the
    /// filename decision made for each settled download.
    #[derive(Default)]
    struct FakeHost {
        next_id: AtomicU64,
        decisions: Mutex<Vec<(DownloadId, FilenameDecision)>>,
    }

    #[async_trait]
    impl DownloadHost for FakeHost {
        async fn begin(&self, url: &str, _suppress_prompt: bool) -> Result<DownloadId, String> {
            if url.contains("reject") {
                return Err("NETWORK_FAILED".to_string());
            }
            Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
        }

        async fn settle(&self, id: DownloadId, hook: &dyn FilenameHook) -> Result<(), String> {
            let decision = hook.determine_filename(id);
            self.decisions.lock().unwrap().push((id, decision));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_start_records_override_and_settle_consumes_it() {
        let dispatcher = Dispatcher::new(FakeHost::default());

        let id = dispatcher
            .start_download("https://arxiv.org/pdf/1706.03762.pdf", "Attention.pdf")
            .await
            .unwrap();
        assert!(!dispatcher.overrides.is_empty());

        dispatcher.settle(id).await.unwrap();
        assert!(dispatcher.overrides.is_empty());

        let decisions = dispatcher.host.decisions.lock().unwrap();
        assert_eq!(
            decisions[0].1,
            FilenameDecision::Suggest {
                filename: "Attention.pdf".to_string(),
                conflict: ConflictAction::Uniquify,
            }
        );
    }

    #[tokio::test]
    async fn test_rejection_carries_host_message_and_records_nothing() {
        let dispatcher = Dispatcher::new(FakeHost::default());

        let err = dispatcher
            .start_download("https://reject.example/x.pdf", "x.pdf")
            .await
            .unwrap_err();

        assert!(matches!(&err, DownloadError::Rejected(msg) if msg == "NETWORK_FAILED"));
        assert!(dispatcher.overrides.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_handle_defers_to_host_default() {
        let dispatcher = Dispatcher::new(FakeHost::default());
        assert_eq!(dispatcher.determine_filename(42), FilenameDecision::Default);
    }

    #[tokio::test]
    async fn test_override_is_taken_at_most_once() {
        let dispatcher = Dispatcher::new(FakeHost::default());
        let id = dispatcher
            .start_download("https://ok.example/x.pdf", "x.pdf")
            .await
            .unwrap();

        assert!(matches!(
            dispatcher.determine_filename(id),
            FilenameDecision::Suggest { .. }
        ));
        assert_eq!(dispatcher.determine_filename(id), FilenameDecision::Default);
    }

    #[tokio::test]
    async fn test_bulk_counts_failures_without_aborting() {
        let dispatcher = Dispatcher::new(FakeHost::default());
        let requests = vec![
            ("https://ok.example/1.pdf".to_string(), "one.pdf".to_string()),
            ("https://reject.example/2.pdf".to_string(), "two.pdf".to_string()),
            ("https://ok.example/3.pdf".to_string(), "three.pdf".to_string()),
        ];

        let mut seen = Vec::new();
        let report = dispatcher
            .download_all(&requests, |current, total| seen.push((current, total)))
            .await;

        assert_eq!(report.started, 2);
        assert_eq!(report.total, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "two.pdf");
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
    }
}
