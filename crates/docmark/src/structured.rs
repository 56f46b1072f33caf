//! Structured-Data Reader: turns each sheet of a workbook into one page of
//! text, bypassing rasterization and OCR entirely.

use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

use crate::error::{DocMarkError, Result};
use crate::types::Page;

/// Reads every sheet in `path` into one [`Page`] each, in workbook sheet
/// order, as a tab-separated serialization headed by the sheet name.
pub fn read_structured_pages(path: &Path) -> Result<Vec<Page>> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| DocMarkError::acquisition(format!("failed to open workbook {}: {e}", path.display())))?;

    let mut pages = Vec::new();
    for (index, sheet_name) in workbook.sheet_names().iter().enumerate() {
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| DocMarkError::acquisition(format!("failed to read sheet {sheet_name}: {e}")))?;

        let mut content = format!("# {sheet_name}\n\n");
        for row in range.rows() {
            let cells: Vec<String> = row.iter().map(render_cell).collect();
            content.push_str(&cells.join("\t"));
            content.push('\n');
        }

        pages.push(Page::success(index + 1, content, 0, 0));
    }
    Ok(pages)
}

fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("#ERROR({e:?})"),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}
