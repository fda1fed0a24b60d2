//! Spreadsheet reading
//!
//! Turns an uploaded file (xlsx, xls, ods or csv) into header-keyed rows
//! taken from its first sheet.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use shared::normalize::{CellValue, SheetRow};
use thiserror::Error;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];
const UTF8_BOM: &str = "\u{feff}";

#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("file is empty")]
    Empty,

    #[error("workbook has no sheets")]
    NoSheets,

    #[error("header row is missing")]
    MissingHeader,

    #[error("{0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("{0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Workbook,
    Csv,
}

fn detect_format(filename: &str, bytes: &[u8]) -> Format {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" | "txt" => Format::Csv,
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Format::Workbook,
        _ if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) => Format::Workbook,
        _ => Format::Csv,
    }
}

/// Read the first sheet of an uploaded file.
///
/// The first row is the header. Columns with an empty header are ignored and
/// rows without any non-blank cell are dropped.
pub fn read_rows(filename: &str, bytes: Vec<u8>) -> Result<Vec<SheetRow>, WorkbookError> {
    if bytes.is_empty() {
        return Err(WorkbookError::Empty);
    }

    match detect_format(filename, &bytes) {
        Format::Workbook => read_workbook(bytes),
        Format::Csv => read_csv(&bytes),
    }
}

fn read_workbook(bytes: Vec<u8>) -> Result<Vec<SheetRow>, WorkbookError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(WorkbookError::NoSheets)??;
    rows_from_range(&range)
}

fn rows_from_range(range: &Range<Data>) -> Result<Vec<SheetRow>, WorkbookError> {
    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .ok_or(WorkbookError::MissingHeader)?
        .iter()
        .map(|cell| header_text(&cell_value(cell)))
        .collect();

    if header.iter().all(String::is_empty) {
        return Err(WorkbookError::MissingHeader);
    }

    Ok(rows
        .map(|cells| {
            header
                .iter()
                .zip(cells)
                .filter(|(name, _)| !name.is_empty())
                .map(|(name, cell)| (name.clone(), cell_value(cell)))
                .collect::<SheetRow>()
        })
        .filter(|row| !row.is_empty())
        .collect())
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) => CellValue::Text(s.clone()),
        // dates stay as serials so the date normalizer sees one shape
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}

fn header_text(value: &CellValue) -> String {
    value
        .as_text()
        .trim_start_matches(UTF8_BOM)
        .trim()
        .to_string()
}

/// Semicolon when the header line has more semicolons than commas
fn detect_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    let semicolons = first_line.iter().filter(|b| **b == b';').count();
    let commas = first_line.iter().filter(|b| **b == b',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// UTF-8 when valid, Latin-1 otherwise
fn decode_field(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(text) => text.to_string(),
        Err(_) => raw.iter().map(|b| char::from(*b)).collect(),
    }
}

fn read_csv(bytes: &[u8]) -> Result<Vec<SheetRow>, WorkbookError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(bytes))
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let header: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|raw| {
            decode_field(raw)
                .trim_start_matches(UTF8_BOM)
                .trim()
                .to_string()
        })
        .collect();

    if header.iter().all(String::is_empty) {
        return Err(WorkbookError::MissingHeader);
    }

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        let row: SheetRow = header
            .iter()
            .zip(record.iter())
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, raw)| (name.clone(), CellValue::Text(decode_field(raw))))
            .collect();
        if !row.is_empty() {
            rows.push(row);
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format("matriz.xlsx", b""), Format::Workbook);
        assert_eq!(detect_format("MATRIZ.CSV", b"PK\x03\x04"), Format::Csv);
        assert_eq!(detect_format("upload", b"PK\x03\x04rest"), Format::Workbook);
        assert_eq!(detect_format("upload", b"SKU;Estoque"), Format::Csv);
    }

    #[test]
    fn test_read_semicolon_csv() {
        let data = "\u{feff}SKU;Descrição;Estoque\n ab 12 ;Condensadora Daikin;1.250,00\n;;\n"
            .as_bytes()
            .to_vec();
        let rows = read_rows("matriz.csv", data).unwrap();

        assert_eq!(rows.len(), 1);
        let cells: Vec<(&str, &CellValue)> = rows[0].iter().collect();
        assert_eq!(cells[0].0, "SKU");
        assert_eq!(cells[0].1, &CellValue::Text(" ab 12 ".to_string()));
        assert_eq!(cells[2].1, &CellValue::Text("1.250,00".to_string()));
    }

    #[test]
    fn test_read_latin1_csv() {
        let mut data = b"SKU,Descri".to_vec();
        data.extend_from_slice(&[0xE7, 0xE3]);
        data.extend_from_slice(b"o\nX1,Evap\n");
        let rows = read_rows("transito.csv", data).unwrap();

        let headers: Vec<&str> = rows[0].iter().map(|(h, _)| h).collect();
        assert_eq!(headers, vec!["SKU", "Descrição"]);
    }

    #[test]
    fn test_empty_file_rejected() {
        assert!(matches!(
            read_rows("matriz.csv", Vec::new()),
            Err(WorkbookError::Empty)
        ));
    }

    #[test]
    fn test_invalid_workbook_rejected() {
        let result = read_rows("matriz.xlsx", b"not a workbook".to_vec());
        assert!(matches!(result, Err(WorkbookError::Spreadsheet(_))));
    }

    #[test]
    fn test_cell_value_mapping() {
        assert_eq!(cell_value(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(cell_value(&Data::Empty), CellValue::Empty);
        assert_eq!(
            cell_value(&Data::String("Daikin".into())),
            CellValue::Text("Daikin".into())
        );
    }
}
