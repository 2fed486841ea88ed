//! Errors for the export viewer
//!
//! Every fallible operation in the library returns [`ViewerError`]. Decoding
//! CSV never fails, so there is no decode variant.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The upload request itself could not be sent or answered.
    #[cfg(feature = "web")]
    #[error("upload to {url} failed: {source}")]
    UploadTransport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A resource listed in the manifest could not be fetched.
    #[cfg(feature = "web")]
    #[error("request to {url} failed: {source}")]
    FetchTransport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upload rejected with HTTP status {0}")]
    UploadStatus(u16),

    #[error("fetching {path} returned HTTP status {status}")]
    ResourceStatus { path: String, status: u16 },

    #[error("invalid manifest: {0}")]
    Manifest(String),

    #[error(transparent)]
    Template(#[from] handlebars::TemplateError),

    #[error(transparent)]
    Render(#[from] handlebars::RenderError),

    #[error("timeline has {labels} labels but {values} values")]
    InvalidTimeline { labels: usize, values: usize },

    #[error("configuration error: {0}")]
    Config(String),
}

impl ViewerError {
    /// True when the upload request failed, as opposed to anything that
    /// happened after the service accepted the archive.
    pub fn is_upload_failure(&self) -> bool {
        match self {
            ViewerError::UploadStatus(_) => true,
            #[cfg(feature = "web")]
            ViewerError::UploadTransport { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_status_counts_as_upload_failure() {
        assert!(ViewerError::UploadStatus(500).is_upload_failure());
        assert!(!ViewerError::Manifest("missing issues".to_string()).is_upload_failure());
        assert!(!ViewerError::ResourceStatus {
            path: "out/issues.csv".to_string(),
            status: 404
        }
        .is_upload_failure());
    }

    #[test]
    fn messages_name_the_failing_resource() {
        let err = ViewerError::ResourceStatus {
            path: "out/mr.csv".to_string(),
            status: 502,
        };
        assert_eq!(err.to_string(), "fetching out/mr.csv returned HTTP status 502");
    }
}
