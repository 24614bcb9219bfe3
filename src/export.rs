use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Local;
use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::render::{CellValue, ResultsTable};

pub struct ExportReport {
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
}

pub fn default_export_path(dir: &Path, job_id: &str) -> PathBuf {
    let safe_id: String = job_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    dir.join(format!("standings_{safe_id}_{stamp}.xlsx"))
}

/// Writes the rendered table to a single "Standings" sheet. Rounded cells
/// are stored as numbers so they stay sortable.
pub fn export_table_xlsx(
    path: &Path,
    table: &ResultsTable,
    league_name: Option<&str>,
) -> Result<ExportReport> {
    if !table.visible {
        bail!("results are not ready yet");
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Standings")?;
        write_table(sheet, table, league_name)?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        path: path.to_path_buf(),
        rows: table.rows.len(),
        columns: table.headers.len(),
    })
}

fn write_table(sheet: &mut Worksheet, table: &ResultsTable, league_name: Option<&str>) -> Result<()> {
    let bold = Format::new().set_bold();
    let mut first_row = 0u32;
    if let Some(name) = league_name.filter(|n| !n.is_empty()) {
        sheet
            .write_string_with_format(0, 0, name, &bold)
            .context("write league name")?;
        first_row = 2;
    }

    for (col_idx, header) in table.headers.iter().enumerate() {
        sheet
            .write_string_with_format(first_row, col_idx as u16, header, &bold)
            .with_context(|| format!("write header {col_idx}"))?;
    }

    for (idx, row) in table.rows.iter().enumerate() {
        let row_idx = first_row + 1 + idx as u32;
        sheet
            .write_string(row_idx, 0, &row.logo.src)
            .with_context(|| format!("write cell ({row_idx},0)"))?;
        for (cell_idx, cell) in row.cells.iter().enumerate() {
            let col_idx = (cell_idx + 1) as u16;
            let written = match cell {
                CellValue::Text(text) => sheet.write_string(row_idx, col_idx, text),
                CellValue::Number(value) if value.is_finite() => {
                    sheet.write_number(row_idx, col_idx, *value)
                }
                CellValue::Number(value) => sheet.write_string(row_idx, col_idx, value.to_string()),
                CellValue::Blank => continue,
            };
            written.with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{default_export_path, export_table_xlsx};
    use crate::render::ResultsTable;

    #[test]
    fn export_path_sanitizes_job_id() {
        let path = default_export_path(Path::new("/tmp"), "a/b:c");
        let name = path.file_name().and_then(|n| n.to_str()).expect("file name");
        assert!(name.starts_with("standings_a_b_c_"));
        assert!(name.ends_with(".xlsx"));
    }

    #[test]
    fn hidden_table_is_not_exported() {
        let table = ResultsTable::with_identity_headers();
        let path = std::env::temp_dir().join("playodds_hidden.xlsx");
        assert!(export_table_xlsx(&path, &table, None).is_err());
    }
}
