// src/import.rs

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{io_context, PayrollError};
use crate::models::{wire, PayPeriod, PayrollInput};

/// Canonical columns of a payroll import sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportField {
    EmployeeId,
    VesselId,
    StartDate,
    EndDate,
    RegularHours,
    OvertimeHours,
    NightDifferentialHours,
    SundayHours,
    SundayOvertimeHours,
    Rate,
}

/// Accepted header spellings per column, in priority order.
pub const COLUMN_ALIASES: &[(ImportField, &[&str])] = &[
    (ImportField::EmployeeId, &["EmployeeID", "employeeId", "Employee ID"]),
    (ImportField::VesselId, &["VesselID", "vesselId", "Vessel ID"]),
    (ImportField::StartDate, &["StartDate", "startDate", "Start Date"]),
    (ImportField::EndDate, &["EndDate", "endDate", "End Date"]),
    (ImportField::RegularHours, &["RegularHours", "regularHours", "Regular Hours"]),
    (ImportField::OvertimeHours, &["OvertimeHours", "overtimeHours", "Overtime Hours"]),
    (
        ImportField::NightDifferentialHours,
        &[
            "NightDifferentialHours",
            "nightDifferentialHours",
            "Night Differential Hours",
        ],
    ),
    (ImportField::SundayHours, &["SundayHours", "sundayHours", "Sunday Hours"]),
    (
        ImportField::SundayOvertimeHours,
        &["SundayOvertimeHours", "sundayOvertimeHours", "Sunday Overtime Hours"],
    ),
    (ImportField::Rate, &["Rate", "rate"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Workbook,
    Csv,
}

impl ImportFormat {
    pub fn from_path(path: &Path) -> Result<Self, PayrollError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Ok(ImportFormat::Workbook),
            "csv" => Ok(ImportFormat::Csv),
            other => Err(PayrollError::Parse(format!(
                "unsupported import file type '{}' ({:?})",
                other, path
            ))),
        }
    }
}

/// Spreadsheet cell, independent of the source format.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Number(f64),
    DateSerial(f64),
    Bool(bool),
    Text(String),
}

impl Cell {
    fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::Int(v) => Cell::Number(*v as f64),
            Data::Float(v) => Cell::Number(*v),
            Data::Bool(v) => Cell::Bool(*v),
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::DateTime(dt) => Cell::DateSerial(dt.as_f64()),
            Data::Error(e) => Cell::Text(format!("#{:?}", e)),
        }
    }
}

/// Header positions per field, resolved once per import.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    columns: HashMap<ImportField, Vec<usize>>,
}

impl ColumnMap {
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Self {
        let mut columns = HashMap::new();
        for (field, aliases) in COLUMN_ALIASES {
            let positions: Vec<usize> = aliases
                .iter()
                .filter_map(|alias| {
                    headers
                        .iter()
                        .position(|header| header.as_ref().trim() == *alias)
                })
                .collect();
            if positions.is_empty() {
                debug!("Import sheet has no column for {:?}", field);
            }
            columns.insert(*field, positions);
        }
        Self { columns }
    }

    pub fn has(&self, field: ImportField) -> bool {
        self.columns.get(&field).map_or(false, |p| !p.is_empty())
    }

    /// First non-empty cell among the field's resolved columns.
    fn cell<'a>(&self, row: &'a [Cell], field: ImportField) -> Option<&'a Cell> {
        self.columns
            .get(&field)?
            .iter()
            .filter_map(|&index| row.get(index))
            .find(|cell| !cell.is_empty())
    }
}

fn identifier(cell: Option<&Cell>) -> String {
    match cell {
        None | Some(Cell::Empty) => String::new(),
        Some(Cell::Text(text)) => text.trim().to_string(),
        Some(Cell::Number(n)) | Some(Cell::DateSerial(n)) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                n.to_string()
            }
        }
        Some(Cell::Bool(b)) => b.to_string(),
    }
}

/// Missing reads as zero; anything present but not a number reads as `None`.
fn number(cell: Option<&Cell>) -> Option<Decimal> {
    match cell {
        None | Some(Cell::Empty) => Some(Decimal::ZERO),
        Some(Cell::Number(n)) | Some(Cell::DateSerial(n)) => Decimal::from_f64(*n),
        Some(Cell::Bool(b)) => Some(if *b { Decimal::ONE } else { Decimal::ZERO }),
        Some(Cell::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Some(Decimal::ZERO);
            }
            Decimal::from_str(text)
                .or_else(|_| Decimal::from_scientific(text))
                .ok()
        }
    }
}

fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::try_days(serial.floor() as i64)?)
}

fn date(cell: Option<&Cell>) -> Option<NaiveDate> {
    match cell? {
        Cell::Empty | Cell::Bool(_) => None,
        Cell::Number(n) | Cell::DateSerial(n) => excel_serial_to_date(*n),
        Cell::Text(text) => {
            let text = text.trim();
            wire::parse_date(text)
                .or_else(|| NaiveDate::parse_from_str(text, "%m/%d/%Y").ok())
                .or_else(|| NaiveDate::parse_from_str(text, "%Y/%m/%d").ok())
        }
    }
}

fn build_input(row: &[Cell], columns: &ColumnMap) -> PayrollInput {
    PayrollInput {
        employee_id: identifier(columns.cell(row, ImportField::EmployeeId)),
        vessel_id: identifier(columns.cell(row, ImportField::VesselId)),
        pay_period: PayPeriod {
            start_date: date(columns.cell(row, ImportField::StartDate)),
            end_date: date(columns.cell(row, ImportField::EndDate)),
        },
        regular_hours: number(columns.cell(row, ImportField::RegularHours)),
        overtime_hours: number(columns.cell(row, ImportField::OvertimeHours)),
        night_differential_hours: number(columns.cell(row, ImportField::NightDifferentialHours)),
        sunday_hours: number(columns.cell(row, ImportField::SundayHours)),
        sunday_overtime_hours: number(columns.cell(row, ImportField::SundayOvertimeHours)),
        rate: number(columns.cell(row, ImportField::Rate)),
    }
}

/// Turns header + data rows into candidate records, one per non-blank row, in order.
///
/// Rows are not validated here; incomplete ones are forwarded as-is and the
/// backend decides what to reject.
fn rows_to_inputs(mut rows: impl Iterator<Item = Vec<Cell>>) -> Vec<PayrollInput> {
    let Some(header) = rows.next() else {
        return Vec::new();
    };
    let headers: Vec<String> = header.iter().map(|cell| identifier(Some(cell))).collect();
    let columns = ColumnMap::resolve(&headers);

    let inputs: Vec<PayrollInput> = rows
        .filter(|row| !row.iter().all(Cell::is_empty))
        .map(|row| build_input(&row, &columns))
        .collect();

    let incomplete = inputs
        .iter()
        .filter(|input| input.employee_id.is_empty() || input.vessel_id.is_empty())
        .count();
    if incomplete > 0 {
        warn!(
            "{} of {} import rows lack an employee or vessel id; forwarding them for the backend to reject",
            incomplete,
            inputs.len()
        );
    }
    inputs
}

/// Reads the first sheet of an xlsx/xls/ods workbook.
pub fn parse_workbook(bytes: &[u8]) -> Result<Vec<PayrollInput>, PayrollError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| PayrollError::Parse(format!("unreadable workbook: {}", e)))?;

    let sheet_names = workbook.sheet_names();
    let first_sheet = sheet_names
        .first()
        .cloned()
        .ok_or_else(|| PayrollError::Parse("workbook has no sheets".to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PayrollError::Parse("workbook has no sheets".to_string()))?
        .map_err(|e| PayrollError::Parse(format!("unreadable sheet '{}': {}", first_sheet, e)))?;

    let rows = range
        .rows()
        .map(|row| row.iter().map(Cell::from).collect::<Vec<_>>());
    let inputs = rows_to_inputs(rows);
    info!(
        "Parsed {} payroll rows from sheet '{}'",
        inputs.len(),
        first_sheet
    );
    Ok(inputs)
}

/// Reads a CSV export with the same column aliases as the workbook import.
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<PayrollInput>, PayrollError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|e| PayrollError::Parse(format!("unreadable CSV: {}", e)))?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect::<Vec<_>>(),
        );
    }

    let inputs = rows_to_inputs(rows.into_iter());
    info!("Parsed {} payroll rows from CSV", inputs.len());
    Ok(inputs)
}

pub fn parse_file(path: &Path) -> Result<Vec<PayrollInput>, PayrollError> {
    let format = ImportFormat::from_path(path)?;
    let bytes =
        fs::read(path).map_err(|e| io_context(e, format!("Failed to read import file: {:?}", path)))?;
    match format {
        ImportFormat::Workbook => parse_workbook(&bytes),
        ImportFormat::Csv => parse_csv(bytes.as_slice()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use rust_xlsxwriter::Workbook;

    fn workbook_bytes(header: &[&str], rows: &[Vec<Option<&str>>]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        for (col, name) in header.iter().enumerate() {
            worksheet.write_string(0, col as u16, *name).unwrap();
        }
        for (r, row) in rows.iter().enumerate() {
            for (col, value) in row.iter().enumerate() {
                let Some(value) = value else { continue };
                let (row_idx, col_idx) = (r as u32 + 1, col as u16);
                match value.parse::<f64>() {
                    Ok(n) => worksheet.write_number(row_idx, col_idx, n).unwrap(),
                    Err(_) => worksheet.write_string(row_idx, col_idx, *value).unwrap(),
                };
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn missing_overtime_column_defaults_to_zero() {
        let bytes = workbook_bytes(
            &["EmployeeID", "VesselID", "StartDate", "EndDate", "RegularHours"],
            &[vec![Some("E1"), Some("V1"), Some("2024-01-01"), Some("2024-01-15"), Some("40")]],
        );

        let inputs = parse_workbook(&bytes).unwrap();
        assert_eq!(inputs.len(), 1);
        let input = &inputs[0];
        assert_eq!(input.employee_id, "E1");
        assert_eq!(input.vessel_id, "V1");
        assert_eq!(input.pay_period.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(input.pay_period.end_date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(input.regular_hours, Some(dec!(40)));
        assert_eq!(input.overtime_hours, Some(Decimal::ZERO));
        assert_eq!(input.rate, Some(Decimal::ZERO));
    }

    #[test]
    fn missing_employee_id_is_forwarded_empty() {
        let bytes = workbook_bytes(
            &["EmployeeID", "VesselID", "RegularHours"],
            &[
                vec![None, Some("V1"), Some("8")],
                vec![Some("E2"), Some("V1"), Some("8")],
            ],
        );

        let inputs = parse_workbook(&bytes).unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].employee_id, "");
        assert_eq!(inputs[1].employee_id, "E2");
    }

    #[test]
    fn camel_case_aliases_and_row_order() {
        let bytes = workbook_bytes(
            &["employeeId", "vesselId", "overtimeHours", "rate"],
            &[
                vec![Some("E3"), Some("V2"), Some("2.5"), Some("120")],
                vec![Some("E1"), Some("V2"), Some("1"), Some("90")],
            ],
        );

        let inputs = parse_workbook(&bytes).unwrap();
        let ids: Vec<&str> = inputs.iter().map(|i| i.employee_id.as_str()).collect();
        assert_eq!(ids, vec!["E3", "E1"]);
        assert_eq!(inputs[0].overtime_hours, Some(dec!(2.5)));
        assert_eq!(inputs[0].rate, Some(dec!(120)));
    }

    #[test]
    fn capitalized_header_wins_and_empty_cell_falls_back_to_alias() {
        let bytes = workbook_bytes(
            &["EmployeeID", "employeeId", "RegularHours", "regularHours"],
            &[
                vec![Some("E1"), Some("ignored"), None, Some("6")],
            ],
        );

        let inputs = parse_workbook(&bytes).unwrap();
        assert_eq!(inputs[0].employee_id, "E1");
        assert_eq!(inputs[0].regular_hours, Some(dec!(6)));
    }

    #[test]
    fn numeric_ids_and_date_serials() {
        // 45292 is 2024-01-01 in spreadsheet serial form
        let bytes = workbook_bytes(
            &["EmployeeID", "VesselID", "StartDate", "EndDate"],
            &[vec![Some("1001"), Some("7"), Some("45292"), Some("01/15/2024")]],
        );

        let inputs = parse_workbook(&bytes).unwrap();
        assert_eq!(inputs[0].employee_id, "1001");
        assert_eq!(inputs[0].vessel_id, "7");
        assert_eq!(inputs[0].pay_period.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(inputs[0].pay_period.end_date, NaiveDate::from_ymd_opt(2024, 1, 15));
    }

    #[test]
    fn out_of_range_date_serials_are_forwarded_as_null() {
        let bytes = workbook_bytes(
            &["EmployeeID", "StartDate", "EndDate"],
            &[vec![Some("E1"), Some("1e15"), Some("3000000")]],
        );

        let inputs = parse_workbook(&bytes).unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].employee_id, "E1");
        assert_eq!(inputs[0].pay_period.start_date, None);
        assert_eq!(inputs[0].pay_period.end_date, None);
    }

    #[test]
    fn non_numeric_hours_are_forwarded_as_null() {
        let bytes = workbook_bytes(
            &["EmployeeID", "VesselID", "RegularHours", "StartDate"],
            &[vec![Some("E1"), Some("V1"), Some("forty"), Some("someday")]],
        );

        let inputs = parse_workbook(&bytes).unwrap();
        assert_eq!(inputs[0].regular_hours, None);
        assert_eq!(inputs[0].pay_period.start_date, None);
    }

    #[test]
    fn blank_rows_are_skipped_and_header_only_is_empty() {
        let bytes = workbook_bytes(
            &["EmployeeID", "RegularHours"],
            &[
                vec![Some("E1"), Some("8")],
                vec![None, None],
                vec![Some("E2"), Some("8")],
            ],
        );
        assert_eq!(parse_workbook(&bytes).unwrap().len(), 2);

        let header_only = workbook_bytes(&["EmployeeID"], &[]);
        assert!(parse_workbook(&header_only).unwrap().is_empty());
    }

    #[test]
    fn unreadable_bytes_fail_with_parse_error() {
        match parse_workbook(b"definitely not a spreadsheet") {
            Err(PayrollError::Parse(msg)) => assert!(msg.contains("unreadable")),
            other => panic!("Expected Parse error but got: {:?}", other),
        }
    }

    #[test]
    fn csv_uses_the_same_aliases() {
        let data = "Employee ID,vesselId,Start Date,End Date,Regular Hours,Rate\n\
                    E1,V1,2024-01-01,2024-01-15,40,100\n\
                    ,V1,2024-01-01,2024-01-15,,100\n";
        let inputs = parse_csv(data.as_bytes()).unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].employee_id, "E1");
        assert_eq!(inputs[0].regular_hours, Some(dec!(40)));
        assert_eq!(inputs[1].employee_id, "");
        assert_eq!(inputs[1].regular_hours, Some(Decimal::ZERO));
    }

    #[test]
    fn import_format_follows_extension() {
        assert_eq!(ImportFormat::from_path(Path::new("a.XLSX")).unwrap(), ImportFormat::Workbook);
        assert_eq!(ImportFormat::from_path(Path::new("a.xls")).unwrap(), ImportFormat::Workbook);
        assert_eq!(ImportFormat::from_path(Path::new("a.csv")).unwrap(), ImportFormat::Csv);
        assert!(matches!(
            ImportFormat::from_path(Path::new("a.pdf")),
            Err(PayrollError::Parse(_))
        ));
    }

    #[test]
    fn parse_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payroll.csv");
        fs::write(&path, "EmployeeID,VesselID\nE9,V9\n").unwrap();

        let inputs = parse_file(&path).unwrap();
        assert_eq!(inputs[0].employee_id, "E9");

        let missing = parse_file(&dir.path().join("absent.xlsx"));
        assert!(matches!(missing, Err(PayrollError::Io { .. })));
    }
}
