use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// One decoded CSV line, keyed by column name.
pub type Record = HashMap<String, String>;

/// An ordered sequence of records that share one header set.
///
/// `columns` keeps the header names in source order with duplicates removed,
/// since a `Record` alone has no column order to render from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Dataset {
    pub fn new(headers: &[String]) -> Self {
        let mut columns: Vec<String> = Vec::with_capacity(headers.len());
        for header in headers {
            if !columns.contains(header) {
                columns.push(header.clone());
            }
        }
        Dataset {
            columns,
            rows: Vec::new(),
        }
    }

    /// Zip `fields` against `headers` positionally and append the record.
    ///
    /// Missing trailing fields become empty strings, surplus fields are
    /// dropped, and a repeated header keeps the value of its last position.
    pub fn push_fields(&mut self, headers: &[String], fields: Vec<String>) {
        let mut record = Record::with_capacity(self.columns.len());
        let mut fields = fields.into_iter();
        for header in headers {
            let value = fields.next().unwrap_or_default();
            record.insert(header.clone(), value);
        }
        self.rows.push(record);
    }

    pub fn push(&mut self, record: Record) {
        self.rows.push(record);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell value for `column` in row `index`; absent values read as "".
    pub fn value(&self, index: usize, column: &str) -> &str {
        self.rows
            .get(index)
            .and_then(|row| row.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Rows as positional vectors in column order, for templates.
    pub fn ordered_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|col| row.get(col).cloned().unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

/// The three tabular resources the processing service produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Issues,
    MergeRequests,
    Comments,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 3] = [
        DatasetKind::Issues,
        DatasetKind::MergeRequests,
        DatasetKind::Comments,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            DatasetKind::Issues => "issues",
            DatasetKind::MergeRequests => "merge_requests",
            DatasetKind::Comments => "comments",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DatasetKind::Issues => "Issues",
            DatasetKind::MergeRequests => "Merge Requests",
            DatasetKind::Comments => "Comments",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "issues" => Ok(DatasetKind::Issues),
            "merge_requests" | "merge-requests" | "mrs" => Ok(DatasetKind::MergeRequests),
            "comments" => Ok(DatasetKind::Comments),
            other => Err(format!("Unknown dataset kind: {}", other)),
        }
    }
}

/// The decoded result of one successful upload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Datasets {
    pub issues: Dataset,
    pub merge_requests: Dataset,
    pub comments: Dataset,
}

impl Datasets {
    pub fn get(&self, kind: DatasetKind) -> &Dataset {
        match kind {
            DatasetKind::Issues => &self.issues,
            DatasetKind::MergeRequests => &self.merge_requests,
            DatasetKind::Comments => &self.comments,
        }
    }
}
