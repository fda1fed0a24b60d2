//! Report rendering for spreadsheet downloads

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use shared::export::{ExportCell, ExportTable};

use crate::error::{AppError, AppResult};

const UTF8_BOM: &str = "\u{feff}";

/// Content type of an xlsx download
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

fn xlsx_error(e: XlsxError) -> AppError {
    AppError::Internal(format!("Workbook serialization error: {}", e))
}

/// Renders built reports into downloadable files
pub struct ReportingService;

impl ReportingService {
    /// Export a report as a single-sheet workbook named after the report.
    /// The header row is bold; sales and stock figures stay numeric.
    pub fn export_to_xlsx(table: &ExportTable) -> AppResult<Vec<u8>> {
        let mut workbook = Workbook::new();
        let header = Format::new().set_bold();

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&table.sheet_name).map_err(xlsx_error)?;

        for (col, title) in (0u16..).zip(&table.columns) {
            worksheet
                .write_string_with_format(0, col, title.as_str(), &header)
                .map_err(xlsx_error)?;
        }
        for (row, cells) in (1u32..).zip(&table.rows) {
            for (col, cell) in (0u16..).zip(cells) {
                match cell {
                    ExportCell::Text(text) => worksheet.write_string(row, col, text.as_str()),
                    ExportCell::Number(n) => worksheet.write_number(row, col, *n),
                }
                .map_err(xlsx_error)?;
            }
        }

        workbook.save_to_buffer().map_err(xlsx_error)
    }

    /// Export a report as CSV for spreadsheet software set to pt-BR:
    /// semicolon separated, decimal comma, UTF-8 with BOM
    pub fn export_to_csv(table: &ExportTable) -> AppResult<String> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b';')
            .from_writer(vec![]);

        wtr.write_record(&table.columns)
            .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        for row in &table.rows {
            wtr.write_record(row.iter().map(format_cell))
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }

        let body = String::from_utf8(
            wtr.into_inner()
                .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?,
        )
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;

        Ok(format!("{}{}", UTF8_BOM, body))
    }

    /// Attachment filename for a CSV report
    pub fn csv_filename(table: &ExportTable) -> String {
        format!("{}.csv", table.file_stem)
    }

    pub fn xlsx_filename(table: &ExportTable) -> String {
        format!("{}.xlsx", table.file_stem)
    }
}

fn format_cell(cell: &ExportCell) -> String {
    match cell {
        ExportCell::Text(text) => text.clone(),
        ExportCell::Number(n) if n.fract() == 0.0 => format!("{:.0}", n),
        ExportCell::Number(n) => format!("{:.2}", n).replace('.', ","),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use calamine::{open_workbook_auto_from_rs, Data, Reader};

    fn table() -> ExportTable {
        ExportTable {
            sheet_name: "Relatório".to_string(),
            file_stem: "relatorio_DAIKIN_TOTAL_TODOS".to_string(),
            columns: vec![
                "SKU".to_string(),
                "Descrição".to_string(),
                "Dias de Estoque".to_string(),
            ],
            rows: vec![
                vec![
                    ExportCell::text("DK9000"),
                    ExportCell::text("CONDENSADORA; DAIKIN"),
                    ExportCell::Number(45.0),
                ],
                vec![
                    ExportCell::text("DK12"),
                    ExportCell::text("EVAPORADORA"),
                    ExportCell::Number(12.5),
                ],
            ],
        }
    }

    #[test]
    fn test_export_to_csv() {
        let csv = ReportingService::export_to_csv(&table()).unwrap();
        let mut lines = csv.lines();

        assert_eq!(lines.next(), Some("\u{feff}SKU;Descrição;Dias de Estoque"));
        assert_eq!(lines.next(), Some("DK9000;\"CONDENSADORA; DAIKIN\";45"));
        assert_eq!(lines.next(), Some("DK12;EVAPORADORA;12,50"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_csv_filename() {
        assert_eq!(
            ReportingService::csv_filename(&table()),
            "relatorio_DAIKIN_TOTAL_TODOS.csv"
        );
    }

    #[test]
    fn test_export_to_xlsx() {
        let bytes = ReportingService::export_to_xlsx(&table()).unwrap();
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Relatório".to_string()]);

        let range = workbook.worksheet_range("Relatório").unwrap();
        assert_eq!(range.get_size(), (3, 3));
        assert_eq!(range.get((0, 1)), Some(&Data::String("Descrição".to_string())));
        assert_eq!(
            range.get((1, 1)),
            Some(&Data::String("CONDENSADORA; DAIKIN".to_string()))
        );
        assert_eq!(range.get((2, 2)), Some(&Data::Float(12.5)));
    }

    #[test]
    fn test_xlsx_filename() {
        assert_eq!(
            ReportingService::xlsx_filename(&table()),
            "relatorio_DAIKIN_TOTAL_TODOS.xlsx"
        );
    }
}
