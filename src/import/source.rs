//! Row sources: CSV text and Google Sheets value ranges.
//!
//! Both sources produce the same shape: an ordered list of column-label →
//! raw-value pairs per data row, keyed by the header row. Missing trailing
//! cells read as empty strings and unnamed header columns are skipped.

use csv::{ReaderBuilder, Trim};

use crate::error::AppError;

/// One raw input record: an ordered mapping of column label to raw value.
///
/// Immutable once parsed; the mapper consumes it without modification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// Column label → raw value pairs in source order.
    pub columns: Vec<(String, String)>,
}

/// Parses CSV text into raw rows.
///
/// Quoted fields (embedded commas, quotes) are handled by the `csv` crate;
/// fields are trimmed and rows may have fewer or more cells than the header.
/// Cells beyond the header width are dropped, missing cells read as empty.
///
/// # Errors
///
/// Returns `AppError::CsvInvalid` if the text cannot be parsed as CSV.
/// An empty result (header only, or nothing) is not an error here; callers
/// treat a rowless source as a fatal source-read failure.
pub fn parse_csv(text: &str) -> Result<Vec<RawRow>, AppError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(headers) => headers.iter().map(|h| h.to_string()).collect(),
        Err(e) => return Err(AppError::CsvInvalid(format!("Failed to read headers: {}", e))),
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| AppError::CsvInvalid(format!("Failed to read record: {}", e)))?;
        let cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
        rows.push(pair_with_headers(&headers, cells));
    }

    Ok(rows)
}

/// Shapes a Google Sheets value range (header row + data rows) into raw rows.
///
/// Mirrors the sheet read contract: fewer than two rows means no data.
pub fn rows_from_values(values: Vec<Vec<String>>) -> Vec<RawRow> {
    if values.len() < 2 {
        return Vec::new();
    }

    let mut iter = values.into_iter();
    let headers = iter.next().unwrap_or_default();

    iter.map(|cells| pair_with_headers(&headers, cells)).collect()
}

/// Pairs one row of cells with the header row, skipping unnamed columns.
fn pair_with_headers(headers: &[String], mut cells: Vec<String>) -> RawRow {
    // Pad so every named header has a value.
    if cells.len() < headers.len() {
        cells.resize(headers.len(), String::new());
    }

    let columns = headers
        .iter()
        .zip(cells)
        .filter(|(header, _)| !header.is_empty())
        .map(|(header, cell)| (header.clone(), cell))
        .collect();

    RawRow { columns }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_csv() {
        let rows = parse_csv("Business,Number\nAcme,555-1234\nGlobex,555-9876\n").unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].columns,
            vec![
                ("Business".to_string(), "Acme".to_string()),
                ("Number".to_string(), "555-1234".to_string()),
            ]
        );
        assert_eq!(rows[1].columns[0].1, "Globex");
    }

    #[test]
    fn handles_quoted_fields_with_commas_and_quotes() {
        let rows =
            parse_csv("Business,City\n\"Acme, Inc.\",\"Sydney\"\n\"Bob \"\"The Builder\"\"\",Perth\n")
                .unwrap();

        assert_eq!(rows[0].columns[0].1, "Acme, Inc.");
        assert_eq!(rows[1].columns[0].1, "Bob \"The Builder\"");
    }

    #[test]
    fn short_rows_read_as_empty_cells() {
        let rows = parse_csv("Business,Number,City\nAcme\n").unwrap();

        assert_eq!(
            rows[0].columns,
            vec![
                ("Business".to_string(), "Acme".to_string()),
                ("Number".to_string(), String::new()),
                ("City".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn fields_are_trimmed() {
        let rows = parse_csv("Business , Number\n  Acme ,  555-1234 \n").unwrap();

        assert_eq!(rows[0].columns[0], ("Business".to_string(), "Acme".to_string()));
        assert_eq!(rows[0].columns[1].1, "555-1234");
    }

    #[test]
    fn header_only_yields_no_rows() {
        assert!(parse_csv("Business,Number\n").unwrap().is_empty());
        assert!(parse_csv("").unwrap().is_empty());
    }

    #[test]
    fn sheet_values_pair_with_headers() {
        let values = vec![
            vec!["Business".to_string(), "".to_string(), "Number".to_string()],
            vec!["Acme".to_string(), "ignored".to_string(), "555-1234".to_string()],
            vec!["Globex".to_string()],
        ];

        let rows = rows_from_values(values);

        assert_eq!(rows.len(), 2);
        // Unnamed middle column is skipped entirely.
        assert_eq!(
            rows[0].columns,
            vec![
                ("Business".to_string(), "Acme".to_string()),
                ("Number".to_string(), "555-1234".to_string()),
            ]
        );
        // Missing trailing cell reads as empty.
        assert_eq!(
            rows[1].columns,
            vec![
                ("Business".to_string(), "Globex".to_string()),
                ("Number".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn sheet_with_fewer_than_two_rows_is_empty() {
        assert!(rows_from_values(vec![]).is_empty());
        assert!(rows_from_values(vec![vec!["Business".to_string()]]).is_empty());
    }

    #[test]
    fn csv_file_fixture_with_bom_and_crlf_parses() {
        use std::io::Write;

        // Excel-style export: UTF-8 BOM plus CRLF line endings.
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("export.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"\xEF\xBB\xBFBusiness,Number\r\nAcme,555-1234\r\n")
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let rows = parse_csv(&text).unwrap();

        assert_eq!(rows.len(), 1);
        // The BOM must not leak into the first header label.
        assert_eq!(
            rows[0].columns,
            vec![
                ("Business".to_string(), "Acme".to_string()),
                ("Number".to_string(), "555-1234".to_string()),
            ]
        );
    }
}
