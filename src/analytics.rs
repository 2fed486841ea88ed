use crate::error::ViewerError;
use serde::{Deserialize, Serialize};

/// A file and how often it changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub name: String,
    pub changes: u64,
}

/// Commit activity over time; `labels` and `data` are parallel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    labels: Vec<String>,
    data: Vec<u64>,
}

impl Timeline {
    pub fn new(labels: Vec<String>, data: Vec<u64>) -> Result<Self, ViewerError> {
        if labels.len() != data.len() {
            return Err(ViewerError::InvalidTimeline {
                labels: labels.len(),
                values: data.len(),
            });
        }
        Ok(Timeline { labels, data })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn data(&self) -> &[u64] {
        &self.data
    }
}

/// Repository overview shown on the dashboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub commits: u64,
    pub contributors: u64,
    pub lines_added: u64,
    pub lines_removed: u64,
    pub top_files: Vec<FileChange>,
    pub timeline: Timeline,
}

impl AnalyticsSummary {
    /// Fixed summary published by the mock data source.
    pub fn demo() -> Self {
        let labels = ["Jan", "Feb", "Mar", "Apr", "May"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        AnalyticsSummary {
            commits: 1243,
            contributors: 28,
            lines_added: 24680,
            lines_removed: 12340,
            top_files: vec![
                FileChange {
                    name: "src/main.js".to_string(),
                    changes: 456,
                },
                FileChange {
                    name: "src/components/App.js".to_string(),
                    changes: 321,
                },
                FileChange {
                    name: "src/utils/helpers.js".to_string(),
                    changes: 198,
                },
            ],
            timeline: Timeline {
                labels,
                data: vec![45, 73, 102, 87, 127],
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatCard {
    pub label: &'static str,
    pub value: String,
    pub tone: &'static str,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FileBar {
    pub name: String,
    pub changes: u64,
    pub width_pct: f64,
    pub last: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimelineBar {
    pub label: String,
    pub value: u64,
    pub height_pct: f64,
}

/// Everything the dashboard template needs, with bar geometry precomputed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DashboardView {
    pub cards: Vec<StatCard>,
    pub files: Vec<FileBar>,
    pub timeline: Vec<TimelineBar>,
}

const MIN_TIMELINE_HEIGHT_PCT: f64 = 10.0;

impl DashboardView {
    pub fn from_summary(summary: &AnalyticsSummary) -> Self {
        let cards = vec![
            StatCard {
                label: "Total Commits",
                value: format_thousands(summary.commits),
                tone: "primary",
            },
            StatCard {
                label: "Contributors",
                value: summary.contributors.to_string(),
                tone: "primary",
            },
            StatCard {
                label: "Lines Added",
                value: format_thousands(summary.lines_added),
                tone: "added",
            },
            StatCard {
                label: "Lines Removed",
                value: format_thousands(summary.lines_removed),
                tone: "removed",
            },
        ];

        let max_changes = summary.top_files.iter().map(|f| f.changes).max().unwrap_or(0);
        let count = summary.top_files.len();
        let files = summary
            .top_files
            .iter()
            .enumerate()
            .map(|(i, file)| FileBar {
                name: file.name.clone(),
                changes: file.changes,
                width_pct: percent(file.changes, max_changes).min(100.0),
                last: i + 1 == count,
            })
            .collect();

        let max_value = summary.timeline.data.iter().copied().max().unwrap_or(0);
        let timeline = summary
            .timeline
            .labels
            .iter()
            .zip(summary.timeline.data.iter())
            .map(|(label, &value)| TimelineBar {
                label: label.clone(),
                value,
                height_pct: percent(value, max_value).max(MIN_TIMELINE_HEIGHT_PCT),
            })
            .collect();

        DashboardView {
            cards,
            files,
            timeline,
        }
    }
}

fn percent(value: u64, max: u64) -> f64 {
    if max == 0 {
        return 0.0;
    }
    value as f64 / max as f64 * 100.0
}

/// Format a count with comma thousands separators
///
/// # Examples
/// ```
/// use export_viewer::analytics::format_thousands;
///
/// assert_eq!(format_thousands(24680), "24,680");
/// assert_eq!(format_thousands(999), "999");
/// ```
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
