use crate::record::Dataset;
use log::{debug, warn};
use std::str::FromStr;

/// Strategy used to turn CSV text into a [`Dataset`].
///
/// Both strategies share one contract: the first non-empty line names the
/// columns, empty lines are skipped, short rows are padded with empty
/// strings and malformed quoting never raises.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Decoder {
    /// Line based splitter that respects quoted commas.
    #[default]
    Hand,
    /// The `csv` crate reader; also accepts quoted line breaks.
    Library,
}

impl Decoder {
    pub fn decode(self, text: &str) -> Dataset {
        match self {
            Decoder::Hand => decode(text),
            Decoder::Library => decode_with_library(text),
        }
    }
}

impl FromStr for Decoder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hand" | "manual" => Ok(Decoder::Hand),
            "library" | "csv" => Ok(Decoder::Library),
            other => Err(format!("Unsupported decoder: {}", other)),
        }
    }
}

/// Decode CSV text into a dataset
///
/// The first non-empty line is the header. Every following non-empty line is
/// split on commas that are not inside a double-quoted field.
///
/// # Arguments
/// * `text` - Raw CSV text as returned by the processing service
///
/// # Returns
/// * `Dataset` - The decoded rows; empty when `text` has no lines
///
/// # Examples
/// ```
/// use export_viewer::loader::decode;
///
/// let ds = decode("x,y,z\na,\"b,c\",d\n");
/// assert_eq!(ds.len(), 1);
/// assert_eq!(ds.value(0, "y"), "b,c");
/// ```
pub fn decode(text: &str) -> Dataset {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let headers = match lines.next() {
        Some(line) => split_line(line),
        None => return Dataset::default(),
    };

    let mut dataset = Dataset::new(&headers);
    for line in lines {
        dataset.push_fields(&headers, split_line(line));
    }

    debug!(
        "decoded {} rows with {} columns",
        dataset.len(),
        dataset.columns().len()
    );
    dataset
}

/// Split one CSV line into unquoted fields
///
/// A comma ends the current field only when an even number of double quotes
/// has been seen in that field so far. Unbalanced quotes simply keep the rest
/// of the line in the last field.
///
/// # Examples
/// ```
/// use export_viewer::loader::split_line;
///
/// assert_eq!(split_line("a,\"he said \"\"hi\"\"\",c"), vec!["a", "he said \"hi\"", "c"]);
/// ```
pub fn split_line(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current_field = String::new();
    let mut quotes = 0usize;

    for c in line.chars() {
        match c {
            ',' if quotes % 2 == 0 => {
                result.push(unquote(&current_field));
                current_field.clear();
                quotes = 0;
            }
            '"' => {
                quotes += 1;
                current_field.push(c);
            }
            _ => current_field.push(c),
        }
    }

    // Add the last field
    result.push(unquote(&current_field));
    result
}

// Strip one leading and one trailing quote; collapse doubled quotes of a quoted field
fn unquote(field: &str) -> String {
    match field.strip_prefix('"') {
        Some(rest) => rest.strip_suffix('"').unwrap_or(rest).replace("\"\"", "\""),
        None => field.strip_suffix('"').unwrap_or(field).to_string(),
    }
}

/// Decode CSV text with the `csv` crate
///
/// Configured with a header row, `"` as quote and `,` as delimiter. Rows of
/// any width are accepted and records the reader cannot parse are skipped.
pub fn decode_with_library(text: &str) -> Dataset {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .quote(b'"')
        .delimiter(b',')
        .from_reader(text.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(record) => record.iter().map(str::to_string).collect(),
        Err(e) => {
            warn!("could not read CSV header: {}", e);
            return Dataset::default();
        }
    };
    if headers.is_empty() {
        return Dataset::default();
    }

    let mut dataset = Dataset::new(&headers);
    for (index, result) in reader.records().enumerate() {
        match result {
            Ok(record) => {
                if is_blank_line(text, &record) {
                    continue;
                }
                dataset.push_fields(&headers, record.iter().map(str::to_string).collect());
            }
            Err(e) => warn!("skipping unreadable CSV record {}: {}", index + 1, e),
        }
    }
    dataset
}

// True when the record came from a whitespace-only line. A quoted `""` line
// also reads as one blank field but is a row.
fn is_blank_line(text: &str, record: &csv::StringRecord) -> bool {
    if record.len() != 1 || !record[0].trim().is_empty() {
        return false;
    }
    record
        .position()
        .and_then(|pos| usize::try_from(pos.byte()).ok())
        .and_then(|start| text.get(start..))
        .and_then(|rest| rest.trim_start_matches(['\r', '\n']).lines().next())
        .is_none_or(|line| line.trim().is_empty())
}
