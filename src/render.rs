//! HTML rendering with handlebars
//!
//! Templates live in `src/static` and are compiled into the binary. A dataset
//! is shown either as a standalone document (popup mode) or as a table
//! embedded in the page (in-page mode).

use crate::analytics::DashboardView;
use crate::client::ACCEPTED_EXTENSIONS;
use crate::downloader::download_filename;
use crate::error::ViewerError;
use crate::flow::ViewState;
use crate::notify::Notification;
use crate::record::{Dataset, DatasetKind};
use handlebars::{handlebars_helper, Handlebars};
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const PAGE_TITLE: &str = "GitLab Export Viewer";

/// How a dataset is presented.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Standalone document opened in a new browsing context.
    #[default]
    Popup,
    /// Scrollable table inside the page, one dataset at a time.
    InPage,
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "popup" | "document" => Ok(RenderMode::Popup),
            "inpage" | "in-page" | "in_page" => Ok(RenderMode::InPage),
            other => Err(format!("Unknown render mode: {}", other)),
        }
    }
}

/// Escape a cell value for HTML and turn line breaks into `<br>`
///
/// # Examples
/// ```
/// use export_viewer::render::cell_html;
///
/// assert_eq!(cell_html("a < b\nc"), "a &lt; b<br>c");
/// ```
pub fn cell_html(value: &str) -> String {
    handlebars::html_escape(value).replace('\n', "<br>")
}

handlebars_helper!(cell_helper: |value: str| cell_html(value));

/// Column names and positional rows, in the shape the table partial wants.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableView {
    /// A dataset without rows has no header either.
    pub fn from_dataset(dataset: &Dataset) -> Self {
        if dataset.is_empty() {
            return TableView::default();
        }
        TableView {
            columns: dataset.columns().to_vec(),
            rows: dataset.ordered_rows(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
struct DownloadLink {
    href: String,
    file_name: String,
}

#[derive(Serialize)]
struct DocumentView<'a> {
    title: &'a str,
    download: Option<DownloadLink>,
    table_html: String,
}

/// The page view plus its in-page table, already rendered.
#[derive(Serialize)]
struct PageDocument<'a> {
    #[serde(flatten)]
    page: &'a PageView,
    table_html: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DatasetLink {
    pub slug: &'static str,
    pub title: &'static str,
    pub rows: usize,
    pub download_name: String,
}

/// Data behind the single page.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PageView {
    pub title: &'static str,
    pub accept: String,
    pub loading: bool,
    pub file_name: Option<String>,
    pub notifications: Vec<Notification>,
    pub dashboard: Option<DashboardView>,
    pub datasets: Vec<DatasetLink>,
    pub report_url: Option<String>,
    pub popup: bool,
    pub selected: Option<&'static str>,
    #[serde(skip)]
    pub table: Option<TableView>,
    pub has_results: bool,
}

impl PageView {
    /// Compose the page for the current view state.
    ///
    /// `selected` only matters in in-page mode, and only once datasets are
    /// published; nothing is selected while loading.
    pub fn build(
        view: &ViewState,
        notifications: Vec<Notification>,
        mode: RenderMode,
        selected: Option<DatasetKind>,
    ) -> Self {
        let loading = view.is_loading();
        let datasets = match &view.datasets {
            Some(datasets) if !loading => DatasetKind::ALL
                .iter()
                .map(|kind| DatasetLink {
                    slug: kind.slug(),
                    title: kind.title(),
                    rows: datasets.get(*kind).len(),
                    download_name: download_filename(kind.title()),
                })
                .collect(),
            _ => Vec::new(),
        };

        let selected = match (&view.datasets, mode, selected) {
            (Some(_), RenderMode::InPage, Some(kind)) if !loading => Some(kind),
            _ => None,
        };
        let table = selected.and_then(|kind| {
            view.datasets
                .as_ref()
                .map(|datasets| TableView::from_dataset(datasets.get(kind)))
        });

        PageView {
            title: PAGE_TITLE,
            accept: ACCEPTED_EXTENSIONS.join(","),
            loading,
            file_name: view.file_name.clone(),
            notifications,
            dashboard: view
                .summary
                .as_ref()
                .filter(|_| !loading)
                .map(DashboardView::from_summary),
            datasets,
            report_url: view.report_url.clone().filter(|_| !loading),
            popup: mode == RenderMode::Popup,
            selected: selected.map(|kind| kind.slug()),
            table,
            has_results: !loading && (view.datasets.is_some() || view.summary.is_some()),
        }
    }
}

/// Destination for rendered standalone documents.
pub trait DocumentSink {
    fn present(&mut self, title: &str, html: &str) -> Result<(), ViewerError>;
}

/// Writes each document to `<dir>/<Title>.html`.
pub struct DirectorySink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, ViewerError> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(DirectorySink {
            dir: dir.as_ref().to_path_buf(),
            written: Vec::new(),
        })
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl DocumentSink for DirectorySink {
    fn present(&mut self, title: &str, html: &str) -> Result<(), ViewerError> {
        let path = self.dir.join(format!("{}.html", title.replace(' ', "_")));
        fs::write(&path, html)?;
        info!("wrote {}", path.display());
        self.written.push(path);
        Ok(())
    }
}

pub struct Renderer {
    registry: Handlebars<'static>,
}

impl Renderer {
    pub fn new() -> Result<Self, ViewerError> {
        let mut registry = Handlebars::new();
        registry.register_helper("cell", Box::new(cell_helper));
        registry.register_template_string("table", include_str!("./static/table.hbs"))?;
        registry.register_template_string("document", include_str!("./static/document.hbs"))?;
        registry.register_template_string("page", include_str!("./static/page.hbs"))?;
        Ok(Renderer { registry })
    }

    /// Standalone HTML document for one dataset
    ///
    /// # Arguments
    /// * `dataset` - Rows to show
    /// * `title` - Heading and document title
    /// * `download_href` - Where the CSV download of the same rows lives, if anywhere
    pub fn render_document(
        &self,
        dataset: &Dataset,
        title: &str,
        download_href: Option<&str>,
    ) -> Result<String, ViewerError> {
        let view = DocumentView {
            title,
            download: download_href.map(|href| DownloadLink {
                href: href.to_string(),
                file_name: download_filename(title),
            }),
            table_html: self.render_table(dataset)?,
        };
        Ok(self.registry.render("document", &view)?)
    }

    /// Render `dataset` as a document and hand it to `sink`.
    pub fn present(
        &self,
        sink: &mut dyn DocumentSink,
        dataset: &Dataset,
        title: &str,
        download_href: Option<&str>,
    ) -> Result<(), ViewerError> {
        let html = self.render_document(dataset, title, download_href)?;
        sink.present(title, &html)
    }

    /// Table fragment for in-page display.
    pub fn render_table(&self, dataset: &Dataset) -> Result<String, ViewerError> {
        self.render_table_view(&TableView::from_dataset(dataset))
    }

    fn render_table_view(&self, table: &TableView) -> Result<String, ViewerError> {
        Ok(self.registry.render("table", table)?)
    }

    pub fn render_page(&self, page: &PageView) -> Result<String, ViewerError> {
        let table_html = page
            .table
            .as_ref()
            .map(|table| self.render_table_view(table))
            .transpose()?;
        Ok(self.registry.render("page", &PageDocument { page, table_html })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::AnalyticsSummary;
    use crate::flow::FlowState;
    use crate::loader::decode;
    use crate::record::Datasets;

    struct RecordingSink(Vec<(String, String)>);

    impl DocumentSink for RecordingSink {
        fn present(&mut self, title: &str, html: &str) -> Result<(), ViewerError> {
            self.0.push((title.to_string(), html.to_string()));
            Ok(())
        }
    }

    fn sample() -> Dataset {
        decode("title,notes\n<script>,\"line one\nline two\"\nPlain,\"a & b\"\n")
    }

    fn published() -> ViewState {
        ViewState {
            state: FlowState::Succeeded,
            seq: 1,
            datasets: Some(Datasets {
                issues: decode("id,title\n1,Crash\n2,Leak\n"),
                merge_requests: decode("id,title\n9,Refactor\n"),
                comments: Dataset::default(),
            }),
            ..ViewState::default()
        }
    }

    #[test]
    fn document_has_table_structure_and_escapes() -> Result<(), ViewerError> {
        let renderer = Renderer::new()?;
        let html = renderer.render_document(&decode("a,b\n<b>x</b>,\"1\"\n"), "Issues", None)?;

        assert!(html.contains("<h1>Issues</h1>"));
        assert!(html.contains("<thead>"));
        assert!(html.contains("<tbody>"));
        assert!(html.contains("<th>a</th>"));
        assert!(html.contains("&lt;b&gt;x&lt;/b&gt;"));
        assert!(!html.contains("<b>x</b>"));
        Ok(())
    }

    #[test]
    fn multiline_cells_render_line_breaks() -> Result<(), ViewerError> {
        let renderer = Renderer::new()?;
        let mut ds = Dataset::new(&["notes".to_string()]);
        ds.push_fields(&["notes".to_string()], vec!["first\nsecond".to_string()]);

        let html = renderer.render_table(&ds)?;
        assert!(html.contains("<td>first<br>second</td>"));
        Ok(())
    }

    #[test]
    fn empty_dataset_renders_without_header_or_rows() -> Result<(), ViewerError> {
        let renderer = Renderer::new()?;
        let html = renderer.render_document(&decode("col1,col2"), "Comments", None)?;

        assert!(html.contains("<table>"));
        assert!(!html.contains("<th>"));
        assert!(!html.contains("<td>"));
        Ok(())
    }

    #[test]
    fn document_links_csv_download() -> Result<(), ViewerError> {
        let renderer = Renderer::new()?;
        let html = renderer.render_document(&sample(), "Merge Requests", Some("/download/merge_requests"))?;
        assert!(html.contains("Merge_Requests.csv"));
        assert!(html.contains("/download/merge_requests"));
        Ok(())
    }

    #[test]
    fn present_hands_document_to_sink() -> Result<(), ViewerError> {
        let renderer = Renderer::new()?;
        let mut sink = RecordingSink(Vec::new());
        renderer.present(&mut sink, &sample(), "Issues", None)?;

        assert_eq!(sink.0.len(), 1);
        assert_eq!(sink.0[0].0, "Issues");
        assert!(sink.0[0].1.contains("a &amp; b"));
        Ok(())
    }

    #[test]
    fn directory_sink_writes_html_files() -> Result<(), ViewerError> {
        let dir = tempfile::tempdir()?;
        let renderer = Renderer::new()?;
        let mut sink = DirectorySink::new(dir.path())?;
        renderer.present(&mut sink, &sample(), "Merge Requests", None)?;

        let path = dir.path().join("Merge_Requests.html");
        assert_eq!(sink.written(), &[path.clone()]);
        assert!(fs::read_to_string(path)?.contains("<table>"));
        Ok(())
    }

    #[test]
    fn in_page_shows_only_selected_dataset() -> Result<(), ViewerError> {
        let renderer = Renderer::new()?;
        let view = published();

        let page = PageView::build(&view, Vec::new(), RenderMode::InPage, Some(DatasetKind::Issues));
        assert_eq!(page.selected, Some("issues"));
        let html = renderer.render_page(&page)?;
        assert!(html.contains("<td>Crash</td>"));
        assert!(!html.contains("<td>Refactor</td>"));

        let page = PageView::build(&view, Vec::new(), RenderMode::InPage, Some(DatasetKind::MergeRequests));
        let html = renderer.render_page(&page)?;
        assert!(html.contains("<td>Refactor</td>"));
        assert!(!html.contains("<td>Crash</td>"));

        let page = PageView::build(&view, Vec::new(), RenderMode::InPage, None);
        assert!(page.table.is_none());
        assert!(!renderer.render_page(&page)?.contains("<table>"));
        Ok(())
    }

    #[test]
    fn popup_mode_links_documents_instead_of_tables() -> Result<(), ViewerError> {
        let renderer = Renderer::new()?;
        let page = PageView::build(&published(), Vec::new(), RenderMode::Popup, Some(DatasetKind::Issues));

        assert!(page.table.is_none());
        let html = renderer.render_page(&page)?;
        assert!(html.contains("href=\"/document/issues\""));
        assert!(html.contains("target=\"_blank\""));
        Ok(())
    }

    #[test]
    fn loading_page_hides_results_and_disables_upload() -> Result<(), ViewerError> {
        let renderer = Renderer::new()?;
        let view = ViewState {
            state: FlowState::Uploading,
            file_name: Some("export.zip".to_string()),
            summary: Some(AnalyticsSummary::demo()),
            ..ViewState::default()
        };

        let page = PageView::build(&view, Vec::new(), RenderMode::InPage, Some(DatasetKind::Issues));
        assert!(page.loading);
        assert!(page.dashboard.is_none());
        let html = renderer.render_page(&page)?;
        assert!(html.contains("Processing repository data"));
        assert!(html.contains("disabled"));
        assert!(html.contains("http-equiv=\"refresh\""));
        Ok(())
    }

    #[test]
    fn dashboard_and_notifications_render() -> Result<(), ViewerError> {
        let renderer = Renderer::new()?;
        let view = ViewState {
            state: FlowState::Succeeded,
            summary: Some(AnalyticsSummary::demo()),
            ..ViewState::default()
        };
        let notes = vec![Notification::success("Repository analytics generated successfully")];

        let html = renderer.render_page(&PageView::build(&view, notes, RenderMode::Popup, None))?;
        assert!(html.contains("1,243"));
        assert!(html.contains("src/components/App.js"));
        assert!(html.contains("Repository analytics generated successfully"));
        assert!(!html.contains("Processing repository data"));
        assert!(html.contains(".zip,.tar,.gz,.7z"));
        Ok(())
    }

    #[test]
    fn render_mode_from_str() {
        assert_eq!("in-page".parse(), Ok(RenderMode::InPage));
        assert_eq!("popup".parse(), Ok(RenderMode::Popup));
        assert!("modal".parse::<RenderMode>().is_err());
    }
}
