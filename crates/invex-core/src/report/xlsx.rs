//! XLSX report writer with completeness colouring.

use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::{Color, Format, FormatPattern, Workbook, Worksheet};
use tracing::debug;

use super::{column_widths, Report, Result, COMPLETENESS_COLUMN, HEADERS};
use crate::convert::cell_text;
use crate::error::ReportError;

const COMPLETE_FILL: u32 = 0x00FF00;
const INCOMPLETE_FILL: u32 = 0xFF0000;

/// A sheet read back from an existing report.
struct ExistingSheet {
    name: String,
    rows: Vec<Vec<Data>>,
}

/// Write `report` to `path`, appending below the rows of an existing report.
///
/// The header is written only when `sheet_name` is created, either with a
/// new workbook or as a new sheet of one that lacks it. Other sheets of an
/// existing workbook are carried over unchanged.
pub fn write_xlsx(report: &Report, path: &Path, sheet_name: &str, max_width: usize) -> Result<()> {
    let mut sheets = if path.exists() { read_existing(path)? } else { Vec::new() };

    let target = match sheets.iter().position(|s| s.name == sheet_name) {
        Some(index) => index,
        None => {
            sheets.push(ExistingSheet {
                name: sheet_name.to_string(),
                rows: vec![HEADERS.iter().map(|h| Data::String(h.to_string())).collect()],
            });
            sheets.len() - 1
        }
    };
    debug!(
        "Appending {} row(s) to sheet {} after {} existing",
        report.len(),
        sheets[target].name,
        sheets[target].rows.len()
    );

    for row in report.rows() {
        let mut cells: Vec<Data> = row.cells().into_iter().map(Data::String).collect();
        if let Some(amount) = row.amount {
            cells[3] = Data::Float(amount as f64);
        }
        sheets[target].rows.push(cells);
    }

    let complete = Format::new()
        .set_background_color(Color::RGB(COMPLETE_FILL))
        .set_pattern(FormatPattern::Solid);
    let incomplete = Format::new()
        .set_background_color(Color::RGB(INCOMPLETE_FILL))
        .set_pattern(FormatPattern::Solid);

    let mut workbook = Workbook::new();
    for (index, sheet) in sheets.iter().enumerate() {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        for (r, row) in sheet.rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let fill = match cell {
                    Data::String(s) if index == target && c == COMPLETENESS_COLUMN && r > 0 => match s.as_str() {
                        "True" => Some(&complete),
                        "False" => Some(&incomplete),
                        _ => None,
                    },
                    _ => None,
                };
                write_cell(worksheet, r as u32, c as u16, cell, fill)?;
            }
        }

        let texts: Vec<Vec<String>> = sheet
            .rows
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        let widths = column_widths(texts.iter().map(|row| row.iter().map(String::as_str)), max_width);
        for (c, width) in widths.into_iter().enumerate() {
            worksheet.set_column_width(c as u16, width as f64)?;
        }
    }

    workbook.save(path)?;
    Ok(())
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, cell: &Data, fill: Option<&Format>) -> Result<()> {
    match (cell, fill) {
        (Data::Empty, _) => {}
        (Data::String(s), None) if s.is_empty() => {}
        (Data::String(s), Some(format)) => {
            sheet.write_string_with_format(row, col, s, format)?;
        }
        (Data::String(s), None) => {
            sheet.write_string(row, col, s)?;
        }
        (Data::Float(f), _) => {
            sheet.write_number(row, col, *f)?;
        }
        (Data::Int(i), _) => {
            sheet.write_number(row, col, *i as f64)?;
        }
        (Data::Bool(b), _) => {
            sheet.write_boolean(row, col, *b)?;
        }
        (other, _) => {
            sheet.write_string(row, col, cell_text(other))?;
        }
    }
    Ok(())
}

fn read_existing(path: &Path) -> Result<Vec<ExistingSheet>> {
    let mut workbook: Xlsx<_> =
        open_workbook(path).map_err(|e: calamine::XlsxError| ReportError::Existing(e.to_string()))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| ReportError::Existing(format!("sheet {}: {}", name, e)))?;

        // Keep absolute positions: the range may not start at A1
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut rows: Vec<Vec<Data>> = vec![Vec::new(); start_row as usize];
        for row in range.rows() {
            let mut cells = vec![Data::Empty; start_col as usize];
            cells.extend(row.iter().cloned());
            rows.push(cells);
        }
        sheets.push(ExistingSheet { name, rows });
    }

    Ok(sheets)
}
