/*!
# GitLab Export Viewer

A small web front-end for GitLab project exports, built in Rust.

## Overview

The user uploads an export archive. The archive is forwarded to a remote
processing service, which answers with a manifest naming three CSV
resources (issues, merge requests, comments) and optionally a static Git
statistics report. The CSV resources are fetched concurrently, decoded and
shown as tables, either as standalone documents opened in a new tab or as a
scrollable table embedded in the page.

## Architecture

### Frontend Layer
- **Technologies**: server-rendered HTML (handlebars), axum
- **Key Components**:
  - Upload form - Accepts one archive (`.zip`, `.tar`, `.gz`, `.7z`)
  - Loading indicator - Shown while an upload is being processed
  - Notifications - One success or failure message per upload
  - Dashboard - Commit, contributor and churn summary

### Core Layer
- CSV Decoder - Hand-rolled quoted splitter or the `csv` crate
- Tabular Renderer - HTML tables and CSV downloads
- Upload Flow - `Idle -> Uploading -> Succeeded | Failed` state machine

### Service Layer
- reqwest client for the processing service (`POST /process`, `GET` resources)

## Modules

- **record**: Row records, datasets and dataset kinds
- **loader**: CSV decoding
- **downloader**: CSV re-encoding and download names
- **analytics**: Dashboard summary data and bar geometry
- **render**: Handlebars templates, document sinks and page composition
- **client**: Processing service manifest and HTTP client
- **flow**: Upload orchestration
- **notify**: User-facing notifications
- **config**: Environment and command line configuration
- **error**: Error type
- **app**: Routing (web feature)
*/

pub mod analytics;
pub mod client;
pub mod config;
pub mod downloader;
pub mod error;
pub mod flow;
pub mod loader;
pub mod notify;
pub mod record;
pub mod render;

#[cfg(feature = "web")]
pub mod app;

/// Re-export the types most callers need
pub use error::ViewerError;
pub use flow::{FlowState, Outcome, UploadFlow};
pub use record::{Dataset, DatasetKind, Datasets, Record};
