// src/models.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// --- Wire helpers ---

pub(crate) mod wire {
    use chrono::{DateTime, NaiveDate, Utc};
    use rust_decimal::Decimal;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub const DATE_FORMAT: &str = "%Y-%m-%d";

    /// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (as the backend sends).
    pub fn parse_date(value: &str) -> Option<NaiveDate> {
        let value = value.trim();
        if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) {
            return Some(date);
        }
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    }

    pub mod date {
        use super::*;

        pub fn serialize<S: Serializer>(value: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&value.format(DATE_FORMAT).to_string())
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
            let raw = String::deserialize(deserializer)?;
            parse_date(&raw).ok_or_else(|| de::Error::custom(format!("invalid date '{}'", raw)))
        }
    }

    pub mod date_option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<NaiveDate>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(date) => serializer.serialize_str(&date.format(DATE_FORMAT).to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDate>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => parse_date(&raw)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("invalid date '{}'", raw))),
            }
        }
    }

    /// Numbers that the backend may omit or send as null; both read as zero.
    pub mod decimal_or_zero {
        use super::*;

        pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
            rust_decimal::serde::float::serialize(value, serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
            Ok(rust_decimal::serde::float_option::deserialize(deserializer)?.unwrap_or_default())
        }
    }

    /// Form fields that arrive as numbers, numeric strings or empty strings.
    pub mod count_option {
        use super::*;
        use serde_json::Value;

        pub fn serialize<S: Serializer>(value: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.serialize_u32(*v),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
            match Value::deserialize(deserializer)? {
                Value::Null => Ok(None),
                Value::Number(n) => n
                    .as_u64()
                    .and_then(|v| u32::try_from(v).ok())
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("invalid count {}", n))),
                Value::String(s) if s.trim().is_empty() => Ok(None),
                Value::String(s) => s
                    .trim()
                    .parse::<u32>()
                    .map(Some)
                    .map_err(|_| de::Error::custom(format!("invalid count '{}'", s))),
                other => Err(de::Error::custom(format!("invalid count {}", other))),
            }
        }
    }
}

/// A reference to another resource: the backend either populates it or sends the bare id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ref<T> {
    Embedded(T),
    Id(String),
}

impl<T> Ref<T> {
    pub fn embedded(&self) -> Option<&T> {
        match self {
            Ref::Embedded(value) => Some(value),
            Ref::Id(_) => None,
        }
    }
}

// --- Users ---

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    #[serde(rename = "_id", alias = "id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub message: Option<String>,
}

// --- Employees ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EmployeeStatus {
    #[default]
    Active,
    #[serde(rename = "On Leave")]
    OnLeave,
    Terminated,
}

impl fmt::Display for EmployeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EmployeeStatus::Active => "Active",
            EmployeeStatus::OnLeave => "On Leave",
            EmployeeStatus::Terminated => "Terminated",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Employee {
    #[serde(rename = "_id", alias = "id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<Ref<Department>>,
    pub position: String,
    #[serde(with = "wire::date_option", skip_serializing_if = "Option::is_none")]
    pub hire_date: Option<NaiveDate>,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub salary: Option<Decimal>,
    pub status: EmployeeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<EmergencyContact>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// The business identifier when set, otherwise the storage id.
    pub fn display_id(&self) -> &str {
        self.employee_id
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or_default()
    }
}

impl Ref<Employee> {
    /// Identifier used to key attendance and payroll aggregation.
    pub fn key(&self) -> String {
        match self {
            Ref::Embedded(employee) => employee.display_id().to_string(),
            Ref::Id(id) => id.clone(),
        }
    }
}

// --- Departments ---

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Department {
    #[serde(rename = "_id", alias = "id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// --- Vessels ---

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Vessel {
    #[serde(rename = "_id", alias = "id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(alias = "name")]
    pub vessel_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imo: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub vessel_type: Option<String>,
    #[serde(with = "wire::count_option", skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(with = "wire::date_option", skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<NaiveDate>,
    #[serde(with = "wire::date_option", skip_serializing_if = "Option::is_none")]
    pub registration_date: Option<NaiveDate>,
    #[serde(alias = "employees")]
    pub assigned_employees: Vec<Ref<Employee>>,
}

impl Vessel {
    pub fn assigned_employee_ids(&self) -> Vec<String> {
        self.assigned_employees.iter().map(|e| e.key()).collect()
    }
}

impl Ref<Vessel> {
    pub fn key(&self) -> String {
        match self {
            Ref::Embedded(vessel) => vessel.id.clone().unwrap_or_else(|| vessel.vessel_name.clone()),
            Ref::Id(id) => id.clone(),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Ref::Embedded(vessel) => &vessel.vessel_name,
            Ref::Id(_) => "",
        }
    }
}

// --- Attendance ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[serde(alias = "employeeId")]
    pub employee: Ref<Employee>,
    #[serde(with = "wire::date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub day: bool,
    #[serde(default)]
    pub night: bool,
    #[serde(default)]
    pub ot_day: bool,
    #[serde(default)]
    pub ot_night: bool,
    #[serde(default)]
    pub np: bool,
    #[serde(default)]
    pub status: EmployeeStatus,
}

/// Body of `PUT /attendance/{employeeId}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceUpdate {
    #[serde(with = "wire::date")]
    pub date: NaiveDate,
    pub day: bool,
    pub night: bool,
    pub ot_day: bool,
    pub ot_night: bool,
    pub np: bool,
    pub status: EmployeeStatus,
}

impl From<&AttendanceRecord> for AttendanceUpdate {
    fn from(record: &AttendanceRecord) -> Self {
        Self {
            date: record.date,
            day: record.day,
            night: record.night,
            ot_day: record.ot_day,
            ot_night: record.ot_night,
            np: record.np,
            status: record.status,
        }
    }
}

// --- Payroll ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayPeriod {
    #[serde(with = "wire::date_option", default)]
    pub start_date: Option<NaiveDate>,
    #[serde(with = "wire::date_option", default)]
    pub end_date: Option<NaiveDate>,
}

impl PayPeriod {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date: Some(start_date),
            end_date: Some(end_date),
        }
    }

    /// Open bounds contain everything on that side.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date.map_or(true, |start| date >= start)
            && self.end_date.map_or(true, |end| date <= end)
    }
}

/// A payroll record as stored by the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollRecord {
    #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, alias = "employeeId")]
    pub employee: Option<Ref<Employee>>,
    #[serde(default, alias = "vesselId")]
    pub vessel: Option<Ref<Vessel>>,
    #[serde(default)]
    pub pay_period: Option<PayPeriod>,
    #[serde(with = "wire::decimal_or_zero", default)]
    pub rate: Decimal,
    #[serde(with = "wire::decimal_or_zero", default)]
    pub regular_hours: Decimal,
    #[serde(with = "wire::decimal_or_zero", default)]
    pub overtime_hours: Decimal,
    #[serde(with = "wire::decimal_or_zero", default)]
    pub night_differential_hours: Decimal,
    #[serde(with = "wire::decimal_or_zero", default)]
    pub sunday_hours: Decimal,
    #[serde(with = "wire::decimal_or_zero", default)]
    pub sunday_overtime_hours: Decimal,
    #[serde(with = "rust_decimal::serde::float_option", default)]
    pub gross_pay: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option", default)]
    pub net_pay: Option<Decimal>,
}

impl PayrollRecord {
    pub fn employee_key(&self) -> Option<String> {
        self.employee.as_ref().map(|e| e.key())
    }

    pub fn vessel_key(&self) -> Option<String> {
        self.vessel.as_ref().map(|v| v.key())
    }
}

/// A candidate payroll record headed for `POST /payroll` or `POST /payroll/bulk`.
///
/// Numeric fields are `None` only when the source cell held something that is
/// not a number; that is sent as `null` and left for the backend to reject.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollInput {
    pub employee_id: String,
    pub vessel_id: String,
    pub pay_period: PayPeriod,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub regular_hours: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub overtime_hours: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub night_differential_hours: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub sunday_hours: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub sunday_overtime_hours: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub rate: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkPayrollRequest<'a> {
    pub payrolls: &'a [PayrollInput],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BulkCreateResponse {
    #[serde(default)]
    pub success: Option<bool>,
    pub count: usize,
}

/// Filter for payroll listings and exports.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PayrollFilter {
    pub vessel_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl PayrollFilter {
    pub fn date_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(start) = self.start_date {
            params.push(("startDate", start.format(wire::DATE_FORMAT).to_string()));
        }
        if let Some(end) = self.end_date {
            params.push(("endDate", end.format(wire::DATE_FORMAT).to_string()));
        }
        params
    }
}

// --- Vouchers ---

/// A generated disbursement voucher. Read-only snapshot of what the backend produced.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
    #[serde(rename = "_id", alias = "id", default)]
    id: Option<String>,
    #[serde(default)]
    voucher_number: Option<String>,
    #[serde(default)]
    payroll_ids: Vec<String>,
    #[serde(with = "rust_decimal::serde::float_option", default)]
    total_amount: Option<Decimal>,
    #[serde(default)]
    created_at: Option<String>,
}

impl Voucher {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn voucher_number(&self) -> Option<&str> {
        self.voucher_number.as_deref()
    }

    pub fn payroll_ids(&self) -> &[String] {
        &self.payroll_ids
    }

    pub fn total_amount(&self) -> Option<Decimal> {
        self.total_amount
    }

    pub fn created_at(&self) -> Option<&str> {
        self.created_at.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VoucherResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Voucher>,
}

// --- Reports & dashboard ---

/// Backend-defined figures; the set of keys is not fixed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    #[serde(flatten)]
    pub figures: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(flatten)]
    pub figures: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Employees,
    Payroll,
    Attendance,
    Vessels,
}

impl ReportKind {
    pub fn path_segment(&self) -> &'static str {
        match self {
            ReportKind::Employees => "employees",
            ReportKind::Payroll => "payroll",
            ReportKind::Attendance => "attendance",
            ReportKind::Vessels => "vessels",
        }
    }

    /// Prefix of the downloaded file name, e.g. `employee_report`.
    pub fn file_prefix(&self) -> &'static str {
        match self {
            ReportKind::Employees => "employee_report",
            ReportKind::Payroll => "payroll_report",
            ReportKind::Attendance => "attendance_report",
            ReportKind::Vessels => "vessel_report",
        }
    }
}

// --- Envelopes ---

#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ApiAck {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
