//! Upload orchestration
//!
//! One upload runs `Idle -> Uploading -> (Succeeded | Failed)`. The view
//! state is shared with whoever renders it; it is written only on those
//! transitions and its lock is never held across an `.await`.

use crate::analytics::AnalyticsSummary;
use crate::client::{ProcessingService, Upload};
use crate::error::ViewerError;
use crate::loader::Decoder;
use crate::notify::{Notification, Notifier};
use crate::record::{DatasetKind, Datasets};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub const SUCCESS_MESSAGE: &str = "Repository analytics generated successfully";
pub const UPLOAD_FAILED_MESSAGE: &str = "Upload failed";
pub const PROCESSING_FAILED_MESSAGE: &str = "Failed to process the repository file";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowState {
    #[default]
    Idle,
    Uploading,
    Succeeded,
    Failed,
}

/// Where published data comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DataSource {
    /// Upload to the processing service and decode its CSV resources.
    #[default]
    Remote,
    /// Skip the network and publish the demo summary after a delay.
    Mock,
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "remote" => Ok(DataSource::Remote),
            "mock" => Ok(DataSource::Mock),
            other => Err(format!("Unknown data source: {}", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FlowOptions {
    pub data_source: DataSource,
    pub decoder: Decoder,
    pub mock_delay: Duration,
}

impl Default for FlowOptions {
    fn default() -> Self {
        FlowOptions {
            data_source: DataSource::Remote,
            decoder: Decoder::Hand,
            mock_delay: Duration::from_millis(2000),
        }
    }
}

/// Everything a renderer needs to draw the current page.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ViewState {
    pub state: FlowState,
    pub seq: u64,
    pub file_name: Option<String>,
    pub datasets: Option<Datasets>,
    pub summary: Option<AnalyticsSummary>,
    pub report_url: Option<String>,
    pub error: Option<String>,
}

impl ViewState {
    pub fn is_loading(&self) -> bool {
        self.state == FlowState::Uploading
    }

    fn clear_published(&mut self) {
        self.datasets = None;
        self.summary = None;
        self.report_url = None;
        self.error = None;
    }
}

/// Proof that `begin` accepted an upload; carries its sequence number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadTicket {
    seq: u64,
}

impl UploadTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed(String),
    /// A newer upload or a reset happened first; the result was dropped.
    Superseded,
    /// Another upload was already running; nothing was started.
    Busy,
}

#[derive(Default)]
struct Published {
    datasets: Option<Datasets>,
    summary: Option<AnalyticsSummary>,
    report_url: Option<String>,
}

#[derive(Clone)]
pub struct UploadFlow {
    service: Arc<dyn ProcessingService>,
    notifier: Arc<dyn Notifier>,
    options: FlowOptions,
    view: Arc<Mutex<ViewState>>,
}

impl UploadFlow {
    pub fn new(
        service: Arc<dyn ProcessingService>,
        notifier: Arc<dyn Notifier>,
        options: FlowOptions,
    ) -> Self {
        UploadFlow {
            service,
            notifier,
            options,
            view: Arc::new(Mutex::new(ViewState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> ViewState {
        self.lock().clone()
    }

    pub fn state(&self) -> FlowState {
        self.lock().state
    }

    pub fn is_loading(&self) -> bool {
        self.lock().is_loading()
    }

    /// Start an upload
    ///
    /// Returns `None` while another upload is running. Otherwise clears
    /// everything previously published, enters `Uploading` and hands out a
    /// ticket for [`UploadFlow::run`].
    pub fn begin(&self, file_name: &str) -> Option<UploadTicket> {
        let mut view = self.lock();
        if view.is_loading() {
            warn!("ignoring {}: an upload is already in progress", file_name);
            return None;
        }
        view.clear_published();
        view.seq += 1;
        view.state = FlowState::Uploading;
        view.file_name = Some(file_name.to_string());
        info!("upload #{} started: {}", view.seq, file_name);
        Some(UploadTicket { seq: view.seq })
    }

    /// Return to `Idle`, dropping published data and any in-flight result.
    pub fn reset(&self) {
        let mut view = self.lock();
        view.clear_published();
        view.seq += 1;
        view.state = FlowState::Idle;
        view.file_name = None;
        debug!("view reset, sequence now {}", view.seq);
    }

    /// Drive an accepted upload to `Succeeded` or `Failed`.
    pub async fn run(&self, ticket: UploadTicket, upload: Upload) -> Outcome {
        let result = match self.options.data_source {
            DataSource::Remote => self.process_remote(upload).await,
            DataSource::Mock => self.process_mock().await,
        };

        let mut view = self.lock();
        if view.seq != ticket.seq {
            debug!(
                "discarding result of upload #{}, current is #{}",
                ticket.seq, view.seq
            );
            return Outcome::Superseded;
        }

        match result {
            Ok(published) => {
                view.datasets = published.datasets;
                view.summary = published.summary;
                view.report_url = published.report_url;
                view.state = FlowState::Succeeded;
                drop(view);
                info!("upload #{} succeeded", ticket.seq);
                self.notifier.notify(Notification::success(SUCCESS_MESSAGE));
                Outcome::Succeeded
            }
            Err(e) => {
                let message = if e.is_upload_failure() {
                    UPLOAD_FAILED_MESSAGE
                } else {
                    PROCESSING_FAILED_MESSAGE
                };
                view.error = Some(e.to_string());
                view.state = FlowState::Failed;
                drop(view);
                error!("upload #{} failed: {}", ticket.seq, e);
                self.notifier.notify(Notification::failure(message));
                Outcome::Failed(e.to_string())
            }
        }
    }

    /// `begin` followed by `run`.
    pub async fn upload(&self, upload: Upload) -> Outcome {
        match self.begin(&upload.file_name) {
            Some(ticket) => self.run(ticket, upload).await,
            None => Outcome::Busy,
        }
    }

    async fn process_remote(&self, upload: Upload) -> Result<Published, ViewerError> {
        let manifest = self.service.process(upload).await?;
        let files = &manifest.files;

        let issues_path = files.require(DatasetKind::Issues)?;
        let mr_path = files.require(DatasetKind::MergeRequests)?;
        let comments_path = files.require(DatasetKind::Comments)?;

        let (issues, merge_requests, comments) = futures::try_join!(
            self.service.fetch_text(issues_path),
            self.service.fetch_text(mr_path),
            self.service.fetch_text(comments_path),
        )?;

        let decoder = self.options.decoder;
        let datasets = Datasets {
            issues: decoder.decode(&issues),
            merge_requests: decoder.decode(&merge_requests),
            comments: decoder.decode(&comments),
        };
        info!(
            "decoded {} issues, {} merge requests, {} comments",
            datasets.issues.len(),
            datasets.merge_requests.len(),
            datasets.comments.len()
        );

        Ok(Published {
            datasets: Some(datasets),
            summary: None,
            report_url: files.gitstats.as_deref().map(|p| self.service.resolve(p)),
        })
    }

    async fn process_mock(&self) -> Result<Published, ViewerError> {
        tokio::time::sleep(self.options.mock_delay).await;
        Ok(Published {
            summary: Some(AnalyticsSummary::demo()),
            ..Published::default()
        })
    }
}
