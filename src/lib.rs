// src/lib.rs

pub mod api_client;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod import;
pub mod models;
pub mod pay;
pub mod payroll_service;
pub mod session;
pub mod voucher;

#[cfg(test)]
mod pay_tests;

pub use api_client::{ApiClient, Download, PayrollBackend};
pub use config::ClientConfig;
pub use error::PayrollError;
pub use export::{ExportFormat, ExportRow};
pub use fetch::{ActionGuard, FetchOutcome, RequestGeneration};
pub use import::{parse_csv, parse_file, parse_workbook};
pub use pay::{compute_pay, HoursWorked, PayBreakdown, PayrollSummary};
pub use payroll_service::{PayrollService, PayrollView};
pub use session::{AuthContract, Session, SessionStore};
pub use voucher::{VoucherFilter, VoucherRequest};
