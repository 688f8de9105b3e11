// src/export/mod.rs
//! Aggregated dataset output: one spreadsheet, one CSV, same columns.

use crate::extractors::{FieldRecord, COLUMNS};
use crate::storage::RecordStore;
use crate::utils::error::ExportError;
use crate::utils::BatchReport;
use rust_xlsxwriter::{Format, Workbook};
use std::fs;
use std::path::Path;

const SHEET_NAME: &str = "reports";

/// Rebuilds both outputs from every readable record in the store.
///
/// Records that fail to parse are excluded and show up as failures in the
/// returned batch. An empty store still produces headered files.
pub fn aggregate(
    store: &RecordStore,
    excel_path: &Path,
    csv_path: &Path,
) -> Result<BatchReport<FieldRecord>, ExportError> {
    let batch = store.load_all()?;
    let records: Vec<&FieldRecord> = batch.values().collect();
    if records.is_empty() {
        tracing::warn!("No records to aggregate; writing header-only outputs");
    }

    write_xlsx(&records, excel_path)?;
    tracing::info!("Exported {} records to Excel: {}", records.len(), excel_path.display());
    write_csv(&records, csv_path)?;
    tracing::info!("Exported {} records to CSV: {}", records.len(), csv_path.display());

    Ok(batch)
}

fn ensure_parent(path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn write_xlsx(records: &[&FieldRecord], path: &Path) -> Result<(), ExportError> {
    ensure_parent(path)?;
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;
    for (col, name) in COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *name, &header)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, cell) in record.text_cells().iter().enumerate() {
            worksheet.write_string(row, col as u16, *cell)?;
        }
        worksheet.write_number(row, (COLUMNS.len() - 1) as u16, record.text_length as f64)?;
    }

    workbook.save(path)?;
    Ok(())
}

pub fn write_csv(records: &[&FieldRecord], path: &Path) -> Result<(), ExportError> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(COLUMNS)?;
    for record in records {
        let mut row: Vec<String> = record.text_cells().iter().map(|c| c.to_string()).collect();
        row.push(record.text_length.to_string());
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}
