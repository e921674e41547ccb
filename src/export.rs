// src/export.rs

use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use std::fmt;
use std::io::Write;
use tracing::{debug, info};

use crate::error::{io_context, PayrollError};
use crate::models::{wire, PayrollRecord};

pub const EXPORT_SHEET_NAME: &str = "Payroll";
pub const LOCAL_EXPORT_FILE_NAME: &str = "payroll_export.xlsx";

/// Column order of every payroll export.
pub const EXPORT_COLUMNS: [&str; 12] = [
    "Employee ID",
    "Employee Name",
    "Position",
    "Vessel",
    "Rate",
    "Regular Hours",
    "Overtime Hours",
    "Night Differential Hours",
    "Sunday Hours",
    "Sunday Overtime Hours",
    "Gross Pay",
    "Net Pay",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    Csv,
    Pdf,
    #[default]
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = PayrollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            other => Err(PayrollError::Validation(format!(
                "unknown export format '{}'",
                other
            ))),
        }
    }
}

/// `<resource>_<start>_<end>.<format>`; a missing bound renders as `all`.
pub fn ranged_file_name(
    resource: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    format: ExportFormat,
) -> String {
    let bound = |date: Option<NaiveDate>| {
        date.map(|d| d.format(wire::DATE_FORMAT).to_string())
            .unwrap_or_else(|| "all".to_string())
    };
    format!(
        "{}_{}_{}.{}",
        resource,
        bound(start),
        bound(end),
        format.extension()
    )
}

/// One flat row of the payroll export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Employee ID")]
    pub employee_id: String,
    #[serde(rename = "Employee Name")]
    pub employee_name: String,
    #[serde(rename = "Position")]
    pub position: String,
    #[serde(rename = "Vessel")]
    pub vessel: String,
    #[serde(rename = "Rate")]
    pub rate: Decimal,
    #[serde(rename = "Regular Hours")]
    pub regular_hours: Decimal,
    #[serde(rename = "Overtime Hours")]
    pub overtime_hours: Decimal,
    #[serde(rename = "Night Differential Hours")]
    pub night_differential_hours: Decimal,
    #[serde(rename = "Sunday Hours")]
    pub sunday_hours: Decimal,
    #[serde(rename = "Sunday Overtime Hours")]
    pub sunday_overtime_hours: Decimal,
    #[serde(rename = "Gross Pay")]
    pub gross_pay: Decimal,
    #[serde(rename = "Net Pay")]
    pub net_pay: Decimal,
}

impl From<&PayrollRecord> for ExportRow {
    fn from(record: &PayrollRecord) -> Self {
        let employee = record.employee.as_ref().and_then(|e| e.embedded());
        Self {
            employee_id: record.employee_key().unwrap_or_default(),
            employee_name: employee.map(|e| e.full_name()).unwrap_or_default(),
            position: employee.map(|e| e.position.clone()).unwrap_or_default(),
            vessel: record
                .vessel
                .as_ref()
                .map(|v| v.display_name().to_string())
                .unwrap_or_default(),
            rate: record.rate,
            regular_hours: record.regular_hours,
            overtime_hours: record.overtime_hours,
            night_differential_hours: record.night_differential_hours,
            sunday_hours: record.sunday_hours,
            sunday_overtime_hours: record.sunday_overtime_hours,
            gross_pay: record.gross_pay.unwrap_or_default(),
            net_pay: record.net_pay.unwrap_or_default(),
        }
    }
}

impl ExportRow {
    fn text_cells(&self) -> [&str; 4] {
        [
            self.employee_id.as_str(),
            self.employee_name.as_str(),
            self.position.as_str(),
            self.vessel.as_str(),
        ]
    }

    fn number_cells(&self) -> [Decimal; 8] {
        [
            self.rate,
            self.regular_hours,
            self.overtime_hours,
            self.night_differential_hours,
            self.sunday_hours,
            self.sunday_overtime_hours,
            self.gross_pay,
            self.net_pay,
        ]
    }
}

pub fn export_rows(records: &[PayrollRecord]) -> Vec<ExportRow> {
    records.iter().map(ExportRow::from).collect()
}

/// Serializes rows into an xlsx workbook with a single `Payroll` sheet.
pub fn write_xlsx(rows: &[ExportRow]) -> Result<Vec<u8>, PayrollError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(EXPORT_SHEET_NAME)?;

    for (col, title) in EXPORT_COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &header_format)?;
    }

    for (index, row) in rows.iter().enumerate() {
        let row_num = index as u32 + 1;
        let text = row.text_cells();
        for (col, value) in text.iter().enumerate() {
            worksheet.write_string(row_num, col as u16, *value)?;
        }
        for (offset, value) in row.number_cells().iter().enumerate() {
            let number = value.to_f64().unwrap_or_default();
            worksheet.write_number(row_num, (text.len() + offset) as u16, number)?;
        }
    }

    let buffer = workbook.save_to_buffer()?;
    info!(
        "Wrote {} payroll rows to xlsx ({} bytes)",
        rows.len(),
        buffer.len()
    );
    Ok(buffer)
}

pub fn write_csv<W: Write>(rows: &[ExportRow], writer: W) -> Result<(), PayrollError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    if rows.is_empty() {
        csv_writer.write_record(EXPORT_COLUMNS)?;
    }
    csv_writer
        .flush()
        .map_err(|e| io_context(e, "Failed to flush CSV export"))?;
    debug!("Wrote {} payroll rows to CSV", rows.len());
    Ok(())
}
