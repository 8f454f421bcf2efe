//! Spreadsheet flattening using calamine.

use std::io::Cursor;

use calamine::{Data, Reader, SheetVisible, Xlsx};
use tracing::debug;

use super::Result;
use crate::error::ConvertError;

/// Flatten every visible sheet of `.xlsx` bytes into aligned text.
pub fn xlsx_to_text(data: &[u8]) -> Result<String> {
    let mut workbook =
        Xlsx::new(Cursor::new(data)).map_err(|e: calamine::XlsxError| ConvertError::Spreadsheet(e.to_string()))?;

    let visible: Vec<String> = workbook
        .sheets_metadata()
        .iter()
        .filter(|sheet| sheet.visible == SheetVisible::Visible)
        .map(|sheet| sheet.name.clone())
        .collect();

    let mut sections = Vec::new();
    for name in visible {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| ConvertError::Spreadsheet(format!("sheet {}: {}", name, e)))?;

        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();

        let table = align_rows(&rows);
        debug!("Sheet {}: {} rows, {} chars", name, range.height(), table.len());
        if !table.is_empty() {
            sections.push(format!("## {}\n{}", name, table));
        }
    }

    Ok(sections.join("\n\n"))
}

pub(crate) fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("#ERR:{e:?}"),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Row-major text table with columns padded to a common width.
///
/// Empty rows are dropped and trailing empty columns trimmed.
pub fn align_rows(rows: &[Vec<String>]) -> String {
    let rows: Vec<&[String]> = rows
        .iter()
        .map(|row| {
            let used = row.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
            &row[..used]
        })
        .filter(|row| !row.is_empty())
        .collect();

    let columns = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    rows.iter()
        .map(|row| {
            let mut line = String::new();
            for (i, cell) in row.iter().enumerate() {
                if i > 0 {
                    line.push_str("  ");
                }
                line.push_str(cell);
                let pad = widths[i] - cell.chars().count();
                line.extend(std::iter::repeat_n(' ', pad));
            }
            line.trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_align_rows() {
        let rows = vec![
            row(&["品名", "金額", ""]),
            row(&["", "", ""]),
            row(&["Consulting", "1,000"]),
        ];

        assert_eq!(align_rows(&rows), "品名          金額\nConsulting  1,000");
    }

    #[test]
    fn test_align_rows_empty() {
        assert_eq!(align_rows(&[row(&["", ""])]), "");
    }

    #[test]
    fn test_xlsx_to_text() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("請求書").unwrap();
        sheet.write_string(0, 0, "取引先").unwrap();
        sheet.write_string(0, 1, "ABC Corp").unwrap();
        sheet.write_string(1, 0, "合計").unwrap();
        sheet.write_number(1, 1, 12000.0).unwrap();
        let data = workbook.save_to_buffer().unwrap();

        let text = xlsx_to_text(&data).unwrap();
        assert_eq!(text, "## 請求書\n取引先  ABC Corp\n合計   12000");
    }

    #[test]
    fn test_hidden_sheets_are_skipped() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        workbook.add_worksheet().set_name("Visible").unwrap().write_string(0, 0, "shown").unwrap();
        let hidden = workbook.add_worksheet();
        hidden.set_name("Scratch").unwrap().write_string(0, 0, "hidden").unwrap();
        hidden.set_hidden(true);
        let data = workbook.save_to_buffer().unwrap();

        assert_eq!(xlsx_to_text(&data).unwrap(), "## Visible\nshown");
    }

    #[test]
    fn test_xlsx_garbage_fails() {
        assert!(matches!(xlsx_to_text(b"not a zip"), Err(ConvertError::Spreadsheet(_))));
    }
}
