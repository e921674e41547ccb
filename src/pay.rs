// src/pay.rs

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

use crate::error::PayrollError;
use crate::models::{AttendanceRecord, EmployeeStatus, PayPeriod, PayrollRecord};

// --- Multipliers ---
// Fixed by business rule; not configurable.

pub const REGULAR_MULTIPLIER: Decimal = dec!(1.00);
pub const OVERTIME_MULTIPLIER: Decimal = dec!(1.25);
/// Additive premium on top of base pay, not a replacement rate.
pub const NIGHT_DIFFERENTIAL_MULTIPLIER: Decimal = dec!(0.10);
pub const SUNDAY_MULTIPLIER: Decimal = dec!(1.30);
pub const SUNDAY_OVERTIME_MULTIPLIER: Decimal = dec!(1.30);

const CURRENCY_DP: u32 = 2;

/// Worked hours for one pay period, by pay category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoursWorked {
    pub regular: Decimal,
    pub overtime: Decimal,
    pub night_differential: Decimal,
    pub sunday: Decimal,
    pub sunday_overtime: Decimal,
}

impl HoursWorked {
    pub fn total(&self) -> Decimal {
        self.regular + self.overtime + self.sunday + self.sunday_overtime
    }

    fn categories(&self) -> [(&'static str, Decimal); 5] {
        [
            ("regular", self.regular),
            ("overtime", self.overtime),
            ("night differential", self.night_differential),
            ("sunday", self.sunday),
            ("sunday overtime", self.sunday_overtime),
        ]
    }

    fn add(&mut self, other: &HoursWorked) {
        self.regular += other.regular;
        self.overtime += other.overtime;
        self.night_differential += other.night_differential;
        self.sunday += other.sunday;
        self.sunday_overtime += other.sunday_overtime;
    }
}

impl From<&PayrollRecord> for HoursWorked {
    fn from(record: &PayrollRecord) -> Self {
        Self {
            regular: record.regular_hours,
            overtime: record.overtime_hours,
            night_differential: record.night_differential_hours,
            sunday: record.sunday_hours,
            sunday_overtime: record.sunday_overtime_hours,
        }
    }
}

/// Amounts per pay category plus gross and net.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayBreakdown {
    pub regular: Decimal,
    pub overtime: Decimal,
    pub night_differential: Decimal,
    pub sunday: Decimal,
    pub sunday_overtime: Decimal,
    pub gross: Decimal,
    pub deductions: Decimal,
    pub net: Decimal,
}

impl PayBreakdown {
    /// Applies a deduction amount supplied by the caller. No deduction rules live here.
    pub fn with_deductions(mut self, deductions: Decimal) -> Result<Self, PayrollError> {
        if deductions.is_sign_negative() && !deductions.is_zero() {
            return Err(PayrollError::Validation(format!(
                "deductions must not be negative, got {}",
                deductions
            )));
        }
        self.deductions = round_currency(deductions);
        self.net = self.gross - self.deductions;
        Ok(self)
    }
}

fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Computes gross pay for one period.
///
/// Each category amount is `rate * multiplier * hours`, rounded to centavos;
/// gross is the sum of the rounded amounts. Net equals gross until
/// deductions are applied with [`PayBreakdown::with_deductions`].
pub fn compute_pay(rate: Decimal, hours: &HoursWorked) -> Result<PayBreakdown, PayrollError> {
    if rate <= Decimal::ZERO {
        return Err(PayrollError::Validation(format!(
            "rate must be greater than zero, got {}",
            rate
        )));
    }
    for (category, value) in hours.categories() {
        if value < Decimal::ZERO {
            return Err(PayrollError::Validation(format!(
                "{} hours must not be negative, got {}",
                category, value
            )));
        }
    }

    let amount = |multiplier: Decimal, hours: Decimal| round_currency(rate * multiplier * hours);

    let regular = amount(REGULAR_MULTIPLIER, hours.regular);
    let overtime = amount(OVERTIME_MULTIPLIER, hours.overtime);
    let night_differential = amount(NIGHT_DIFFERENTIAL_MULTIPLIER, hours.night_differential);
    let sunday = amount(SUNDAY_MULTIPLIER, hours.sunday);
    let sunday_overtime = amount(SUNDAY_OVERTIME_MULTIPLIER, hours.sunday_overtime);
    let gross = regular + overtime + night_differential + sunday + sunday_overtime;

    Ok(PayBreakdown {
        regular,
        overtime,
        night_differential,
        sunday,
        sunday_overtime,
        gross,
        deductions: Decimal::ZERO,
        net: gross,
    })
}

/// Gross and net for a stored record: the backend's figures when it sent them,
/// otherwise computed from the record's rate and hours.
pub fn record_pay(record: &PayrollRecord) -> Result<(Decimal, Decimal), PayrollError> {
    match (record.gross_pay, record.net_pay) {
        (Some(gross), Some(net)) => Ok((gross, net)),
        (Some(gross), None) => Ok((gross, gross)),
        (None, net) => {
            let breakdown = compute_pay(record.rate, &HoursWorked::from(record))?;
            Ok((breakdown.gross, net.unwrap_or(breakdown.net)))
        }
    }
}

// --- Attendance aggregation ---

/// Hours credited for each attendance flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftHours {
    pub day: Decimal,
    pub night: Decimal,
    pub ot_day: Decimal,
    pub ot_night: Decimal,
    /// Night premium hours credited by the `np` flag.
    pub night_premium: Decimal,
}

impl Default for ShiftHours {
    fn default() -> Self {
        Self {
            day: dec!(8),
            night: dec!(8),
            ot_day: dec!(4),
            ot_night: dec!(4),
            night_premium: dec!(8),
        }
    }
}

impl ShiftHours {
    fn hours_for(&self, record: &AttendanceRecord) -> HoursWorked {
        let mut regular = Decimal::ZERO;
        let mut overtime = Decimal::ZERO;
        let mut night_hours = Decimal::ZERO;

        if record.day {
            regular += self.day;
        }
        if record.night {
            regular += self.night;
            night_hours += self.night;
        }
        if record.ot_day {
            overtime += self.ot_day;
        }
        if record.ot_night {
            overtime += self.ot_night;
            night_hours += self.ot_night;
        }
        // np credits a night premium by itself; with night shifts it must not double count
        let night_differential = if record.np {
            night_hours.max(self.night_premium)
        } else {
            night_hours
        };

        if record.date.weekday() == Weekday::Sun {
            HoursWorked {
                sunday: regular,
                sunday_overtime: overtime,
                night_differential,
                ..Default::default()
            }
        } else {
            HoursWorked {
                regular,
                overtime,
                night_differential,
                ..Default::default()
            }
        }
    }
}

/// Hours per employee for a pay period, keyed by employee identifier.
///
/// Only records inside the period and with `Active` status count. Two
/// records for the same employee and date are rejected.
pub fn aggregate_attendance(
    records: &[AttendanceRecord],
    period: &PayPeriod,
    shifts: &ShiftHours,
) -> Result<BTreeMap<String, HoursWorked>, PayrollError> {
    let mut seen: HashSet<(String, NaiveDate)> = HashSet::new();
    let mut totals: BTreeMap<String, HoursWorked> = BTreeMap::new();

    for record in records {
        let employee = record.employee.key();
        if !seen.insert((employee.clone(), record.date)) {
            return Err(PayrollError::Validation(format!(
                "duplicate attendance for employee {} on {}",
                employee, record.date
            )));
        }
        if !period.contains(record.date) {
            debug!(
                "Skipping attendance for {} on {}: outside pay period",
                employee, record.date
            );
            continue;
        }
        if record.status != EmployeeStatus::Active {
            debug!(
                "Skipping attendance for {} on {}: status {}",
                employee, record.date, record.status
            );
            continue;
        }

        totals
            .entry(employee)
            .or_default()
            .add(&shifts.hours_for(record));
    }

    Ok(totals)
}

// --- Summaries ---

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayTotals {
    pub records: usize,
    pub hours: HoursWorked,
    pub gross: Decimal,
    pub net: Decimal,
}

impl PayTotals {
    fn add(&mut self, hours: &HoursWorked, gross: Decimal, net: Decimal) {
        self.records += 1;
        self.hours.add(hours);
        self.gross += gross;
        self.net += net;
    }
}

/// Payroll totals per employee, per vessel and overall.
///
/// Records that cannot be priced (no backend gross and no usable rate) are
/// left out of every total and listed in `unpriced`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollSummary {
    pub per_employee: BTreeMap<String, PayTotals>,
    pub per_vessel: BTreeMap<String, PayTotals>,
    pub overall: PayTotals,
    pub earliest_start: Option<NaiveDate>,
    pub latest_end: Option<NaiveDate>,
    pub unpriced: Vec<String>,
}

const UNASSIGNED: &str = "(unassigned)";

impl PayrollSummary {
    pub fn from_records(records: &[PayrollRecord]) -> Self {
        let mut summary = PayrollSummary::default();

        for record in records {
            let hours = HoursWorked::from(record);
            let employee = record.employee_key().unwrap_or_else(|| UNASSIGNED.to_string());
            let (gross, net) = match record_pay(record) {
                Ok(pay) => pay,
                Err(e) => {
                    warn!("Skipping unpriced payroll record {:?} for {}: {}", record.id, employee, e);
                    summary
                        .unpriced
                        .push(record.id.clone().unwrap_or_else(|| employee.clone()));
                    continue;
                }
            };
            let vessel = record.vessel_key().unwrap_or_else(|| UNASSIGNED.to_string());

            summary.per_employee.entry(employee).or_default().add(&hours, gross, net);
            summary.per_vessel.entry(vessel).or_default().add(&hours, gross, net);
            summary.overall.add(&hours, gross, net);

            if let Some(period) = record.pay_period {
                if let Some(start) = period.start_date {
                    summary.earliest_start = Some(summary.earliest_start.map_or(start, |s| s.min(start)));
                }
                if let Some(end) = period.end_date {
                    summary.latest_end = Some(summary.latest_end.map_or(end, |e| e.max(end)));
                }
            }
        }

        if !summary.unpriced.is_empty() {
            warn!("{} payroll records left out of the summary", summary.unpriced.len());
        }
        summary
    }
}
