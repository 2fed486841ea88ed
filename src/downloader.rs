use crate::record::Dataset;

/// Convert a dataset back to CSV text
///
/// The header line lists the dataset columns, followed by one line per
/// record. Special characters (commas, quotes, line breaks) are escaped by
/// quoting the field and doubling any quote inside it.
///
/// # Arguments
/// * `dataset` - Reference to the dataset to encode
///
/// # Returns
/// * `String` - CSV content, decodable back into an equal dataset
///
/// # Examples
/// ```
/// use export_viewer::downloader::to_csv;
/// use export_viewer::loader::decode;
///
/// let ds = decode("title,note\nBug,\"a, b\"\n");
/// assert_eq!(to_csv(&ds), "title,note\nBug,\"a, b\"\n");
/// ```
pub fn to_csv(dataset: &Dataset) -> String {
    let mut csv_content = String::new();

    if dataset.columns().is_empty() {
        return csv_content;
    }

    // Add header row
    push_line(&mut csv_content, dataset.columns().iter().map(String::as_str));

    // Add data rows
    for row in dataset.ordered_rows() {
        push_line(&mut csv_content, row.iter().map(String::as_str));
    }

    csv_content
}

fn push_line<'a>(csv_content: &mut String, fields: impl ExactSizeIterator<Item = &'a str>) {
    let lone = fields.len() == 1;
    for (i, value) in fields.enumerate() {
        if i > 0 {
            csv_content.push(',');
        }
        // A lone blank field would leave a blank line, which decoders skip
        if lone && value.trim().is_empty() {
            csv_content.push('"');
            csv_content.push_str(value);
            csv_content.push('"');
        } else {
            csv_content.push_str(&escape_field(value));
        }
    }
    csv_content.push('\n');
}

/// Quote a field when it holds a comma, a quote or a line break
pub fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Name of the downloadable CSV for a dataset titled `title`
///
/// # Examples
/// ```
/// use export_viewer::downloader::download_filename;
///
/// assert_eq!(download_filename("Merge Requests"), "Merge_Requests.csv");
/// ```
pub fn download_filename(title: &str) -> String {
    format!("{}.csv", title.replace(' ', "_"))
}
