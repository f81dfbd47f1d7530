// Presentation helpers: human-readable sizes, content-type guessing and
// the columnar layout used by `ls`. Nothing in here talks to the network.

use crate::backend::DocumentEntry;
use crossterm::style::Stylize;

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;

/// Content type sent when the extension tells us nothing.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Width `ls` lays its columns out in.
pub const DISPLAY_WIDTH: usize = 80;

const COLUMN_GAP: usize = 2;

/// `512 bytes`, `1.50 KB`, `3.00 MB`, `1.25 GB`.
pub fn represent_size(bytes: u64) -> String {
    if bytes < KIB {
        format!("{bytes} bytes")
    } else if bytes < MIB {
        format!("{:.2} KB", bytes as f64 / KIB as f64)
    } else if bytes < GIB {
        format!("{:.2} MB", bytes as f64 / MIB as f64)
    } else {
        format!("{:.2} GB", bytes as f64 / GIB as f64)
    }
}

/// Classifies a file by the extension of `name`.
pub fn content_type_for(name: &str) -> &'static str {
    mime_guess::from_path(name)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

pub fn folder_name(name: &str) -> String {
    name.red().to_string()
}

/// One `ll` line: name, size and modification time separated by tabs.
pub fn long_row(doc: &DocumentEntry) -> String {
    let modified = doc
        .modified_at
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| "-".into());
    format!("{}\t{}\t{}", doc.name, represent_size(doc.size_bytes), modified)
}

/// Lays `items` out column by column in as few rows as fit in `width`.
/// Padding is computed on the plain text; `paint` styles each cell after.
pub fn columnize<F>(items: &[String], width: usize, paint: F) -> Vec<String>
where
    F: Fn(&str) -> String,
{
    if items.is_empty() {
        return Vec::new();
    }

    let lengths: Vec<usize> = items.iter().map(|s| s.chars().count()).collect();
    let (rows, widths) = (1..=items.len())
        .find_map(|rows| {
            let widths = column_widths(&lengths, rows);
            let total = widths.iter().sum::<usize>() + COLUMN_GAP * (widths.len() - 1);
            (total <= width || rows == items.len()).then_some((rows, widths))
        })
        .unwrap_or_else(|| (items.len(), vec![lengths.iter().copied().max().unwrap_or(0)]));

    (0..rows)
        .map(|row| {
            let cells: Vec<(usize, &String)> = (row..items.len())
                .step_by(rows)
                .enumerate()
                .map(|(col, idx)| (col, &items[idx]))
                .collect();
            let mut line = String::new();
            for (pos, (col, item)) in cells.iter().enumerate() {
                line.push_str(&paint(item));
                if pos + 1 < cells.len() {
                    let pad = widths[*col] - item.chars().count() + COLUMN_GAP;
                    line.push_str(&" ".repeat(pad));
                }
            }
            line
        })
        .collect()
}

fn column_widths(lengths: &[usize], rows: usize) -> Vec<usize> {
    lengths
        .chunks(rows)
        .map(|column| column.iter().copied().max().unwrap_or(0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn sizes_switch_units_at_powers_of_1024() {
        assert_eq!(represent_size(0), "0 bytes");
        assert_eq!(represent_size(1023), "1023 bytes");
        assert_eq!(represent_size(1024), "1.00 KB");
        assert_eq!(represent_size(1536), "1.50 KB");
        assert_eq!(represent_size(MIB - 1), "1024.00 KB");
        assert_eq!(represent_size(MIB), "1.00 MB");
        assert_eq!(represent_size(5 * MIB + MIB / 4), "5.25 MB");
        assert_eq!(represent_size(GIB), "1.00 GB");
        assert_eq!(represent_size(3 * GIB), "3.00 GB");
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(content_type_for("report.pdf"), "application/pdf");
        assert_eq!(content_type_for("notes.txt"), "text/plain");
        assert_eq!(content_type_for("IMAGE.PNG"), "image/png");
        assert_eq!(content_type_for("Makefile"), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type_for("blob.zzzunknown"), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn long_row_shows_size_and_timestamp() {
        let doc = DocumentEntry {
            id: "D1".into(),
            latest_version_id: "V1".into(),
            name: "a.txt".into(),
            size_bytes: 2048,
            modified_at: Some(Utc.with_ymd_and_hms(2023, 5, 1, 12, 30, 0).unwrap()),
        };
        assert_eq!(long_row(&doc), "a.txt\t2.00 KB\t2023-05-01T12:30:00+00:00");

        let undated = DocumentEntry { modified_at: None, ..doc };
        assert_eq!(long_row(&undated), "a.txt\t2.00 KB\t-");
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn short_lists_fit_on_one_line() {
        let lines = columnize(&names(&["a", "bb", "ccc"]), 80, str::to_string);
        assert_eq!(lines, vec!["a  bb  ccc"]);
    }

    #[test]
    fn wraps_column_major_when_too_wide() {
        let lines = columnize(&names(&["alpha", "beta", "gamma", "delta"]), 14, str::to_string);
        assert_eq!(lines, vec!["alpha  gamma", "beta   delta"]);
    }

    #[test]
    fn overlong_names_get_a_line_each() {
        let lines = columnize(&names(&["abcdefghij", "klmnopqrst"]), 5, str::to_string);
        assert_eq!(lines, vec!["abcdefghij", "klmnopqrst"]);
    }

    #[test]
    fn paint_does_not_affect_padding() {
        let lines = columnize(&names(&["a", "bb"]), 80, |s| format!("<{s}>"));
        assert_eq!(lines, vec!["<a>  <bb>"]);
    }

    #[test]
    fn nothing_to_lay_out() {
        assert!(columnize(&[], 80, str::to_string).is_empty());
    }
}
