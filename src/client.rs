//! Talking to the remote processing service
//!
//! The service accepts an export archive on `POST /process` and answers with
//! a [`Manifest`] naming where the derived CSV resources can be fetched.

use crate::error::ViewerError;
use crate::record::DatasetKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Paths of the resources derived from one archive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFiles {
    #[serde(default)]
    pub issues: Option<String>,
    #[serde(default)]
    pub merge_requests: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
    /// Static HTML report; linked, never fetched.
    #[serde(default)]
    pub gitstats: Option<String>,
}

impl ManifestFiles {
    pub fn path(&self, kind: DatasetKind) -> Option<&str> {
        match kind {
            DatasetKind::Issues => self.issues.as_deref(),
            DatasetKind::MergeRequests => self.merge_requests.as_deref(),
            DatasetKind::Comments => self.comments.as_deref(),
        }
    }

    /// Path for `kind`, or a manifest error naming the missing entry.
    pub fn require(&self, kind: DatasetKind) -> Result<&str, ViewerError> {
        self.path(kind)
            .ok_or_else(|| ViewerError::Manifest(format!("no path for {}", kind)))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub files: ManifestFiles,
}

/// An archive selected by the user.
#[derive(Clone, Debug)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Upload {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Archive extensions offered by the file picker. A hint only; the service
/// decides what it accepts.
pub const ACCEPTED_EXTENSIONS: [&str; 4] = [".zip", ".tar", ".gz", ".7z"];

#[async_trait]
pub trait ProcessingService: Send + Sync {
    /// Send the archive and return the manifest of derived resources.
    async fn process(&self, upload: Upload) -> Result<Manifest, ViewerError>;

    /// Fetch the text behind a manifest path.
    async fn fetch_text(&self, path: &str) -> Result<String, ViewerError>;

    /// Absolute URL for a manifest path.
    fn resolve(&self, path: &str) -> String;
}

/// Join a manifest path onto the service base URL
///
/// Leading slashes are stripped from the path and trailing slashes from the
/// base. Paths that already are absolute URLs are returned unchanged.
///
/// # Examples
/// ```
/// use export_viewer::client::join_url;
///
/// assert_eq!(join_url("http://svc:8000/", "/out/issues.csv"), "http://svc:8000/out/issues.csv");
/// ```
pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(feature = "web")]
pub use remote::HttpProcessingService;

#[cfg(feature = "web")]
mod remote {
    use super::*;
    use log::{debug, info};
    use reqwest::multipart::{Form, Part};
    use reqwest::Client;
    use std::time::Duration;

    /// [`ProcessingService`] over HTTP with reqwest.
    #[derive(Clone, Debug)]
    pub struct HttpProcessingService {
        client: Client,
        base_url: String,
    }

    impl HttpProcessingService {
        pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ViewerError> {
            let mut builder = Client::builder();
            if let Some(timeout) = timeout {
                builder = builder.timeout(timeout);
            }
            let client = builder
                .build()
                .map_err(|e| ViewerError::Config(format!("cannot build HTTP client: {}", e)))?;
            Ok(HttpProcessingService {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
            })
        }
    }

    #[async_trait]
    impl ProcessingService for HttpProcessingService {
        async fn process(&self, upload: Upload) -> Result<Manifest, ViewerError> {
            let url = join_url(&self.base_url, "process");
            info!(
                "uploading {} ({} bytes) to {}",
                upload.file_name,
                upload.bytes.len(),
                url
            );

            let file_part = Part::bytes(upload.bytes).file_name(upload.file_name);
            let form = Form::new().part("file", file_part);
            let res = self
                .client
                .post(&url)
                .multipart(form)
                .send()
                .await
                .map_err(|source| ViewerError::UploadTransport {
                    url: url.clone(),
                    source,
                })?;

            let status = res.status();
            if !status.is_success() {
                return Err(ViewerError::UploadStatus(status.as_u16()));
            }

            let manifest: Manifest = res
                .json()
                .await
                .map_err(|e| ViewerError::Manifest(format!("cannot parse response: {}", e)))?;
            debug!("manifest: {:?}", manifest);
            Ok(manifest)
        }

        async fn fetch_text(&self, path: &str) -> Result<String, ViewerError> {
            let url = self.resolve(path);
            debug!("fetching {}", url);

            let res = self.client.get(&url).send().await.map_err(|source| {
                ViewerError::FetchTransport {
                    url: url.clone(),
                    source,
                }
            })?;

            let status = res.status();
            if !status.is_success() {
                return Err(ViewerError::ResourceStatus {
                    path: path.to_string(),
                    status: status.as_u16(),
                });
            }

            res.text()
                .await
                .map_err(|source| ViewerError::FetchTransport { url, source })
        }

        fn resolve(&self, path: &str) -> String {
            join_url(&self.base_url, path)
        }
    }
}


#[cfg(all(test, feature = "web"))]
mod http_tests {
    use super::*;

    #[tokio::test]
    async fn test_process_posts_multipart_file() -> Result<(), ViewerError> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/process")
            .match_body(mockito::Matcher::Regex(r#"name="file""#.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"message":"Processed successfully","files":{"issues":"/out/issues.csv","merge_requests":"out/mr.csv","comments":"out/comments.csv"}}"#,
            )
            .create_async()
            .await;

        let service = HttpProcessingService::new(&server.url(), None)?;
        let manifest = service
            .process(Upload::new("export.tar.gz", b"archive".to_vec()))
            .await?;

        mock.assert_async().await;
        assert_eq!(manifest.files.issues.as_deref(), Some("/out/issues.csv"));
        assert_eq!(manifest.message.as_deref(), Some("Processed successfully"));
        Ok(())
    }

    #[tokio::test]
    async fn test_process_rejects_error_status() -> Result<(), ViewerError> {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/process")
            .with_status(500)
            .create_async()
            .await;

        let service = HttpProcessingService::new(&server.url(), None)?;
        let err = service
            .process(Upload::new("export.zip", vec![1, 2, 3]))
            .await
            .unwrap_err();

        assert!(matches!(err, ViewerError::UploadStatus(500)));
        assert!(err.is_upload_failure());
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_text_strips_leading_slash() -> Result<(), ViewerError> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/out/issues.csv")
            .with_status(200)
            .with_body("id,title\n1,Crash\n")
            .create_async()
            .await;

        let service = HttpProcessingService::new(&format!("{}/", server.url()), None)?;
        let text = service.fetch_text("/out/issues.csv").await?;

        mock.assert_async().await;
        assert_eq!(text, "id,title\n1,Crash\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_text_reports_status() -> Result<(), ViewerError> {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/out/missing.csv")
            .with_status(404)
            .create_async()
            .await;

        let service = HttpProcessingService::new(&server.url(), None)?;
        let err = service.fetch_text("out/missing.csv").await.unwrap_err();

        assert!(matches!(
            err,
            ViewerError::ResourceStatus { status: 404, .. }
        ));
        assert!(!err.is_upload_failure());
        Ok(())
    }
}
