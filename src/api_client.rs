// src/api_client.rs

use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{io_context, PayrollError};
use crate::export::{ranged_file_name, ExportFormat};
use crate::models::*;
use crate::session::{AuthContract, Session};
use crate::voucher::VoucherRequest;

/// Whether a call needs a logged-in session or merely forwards one when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Public,
    Authenticated,
}

/// A binary response (CSV/PDF/XLSX) with the file name it should be saved under.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub file_name: String,
    pub bytes: Bytes,
}

impl Download {
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf, PayrollError> {
        fs::create_dir_all(dir)
            .map_err(|e| io_context(e, format!("Failed to create download directory: {:?}", dir)))?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.bytes)
            .map_err(|e| io_context(e, format!("Failed to write download: {:?}", path)))?;
        info!("Saved {} bytes to {:?}", self.bytes.len(), path);
        Ok(path)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssignEmployeeBody<'a> {
    employee_id: &'a str,
}

#[derive(Debug, Serialize)]
struct BulkAttendanceBody<'a> {
    records: &'a [AttendanceRecord],
}

fn date_range_params(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Vec<(&'static str, String)> {
    PayrollFilter {
        vessel_id: None,
        start_date: start,
        end_date: end,
    }
    .date_params()
}

/// Typed client for the payroll REST backend.
///
/// Cheap to clone. A client carries at most one [`Session`]; every request
/// builds its own `Authorization` header from it.
#[derive(Clone)]
pub struct ApiClient {
    config: Arc<ClientConfig>,
    http_client: Client,
    session: Option<Arc<Session>>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, PayrollError> {
        config.validate()?;
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            http_client,
            session: None,
        })
    }

    /// A client that authenticates as `session`. The original client is unchanged.
    pub fn with_session(&self, session: Session) -> Self {
        Self {
            config: Arc::clone(&self.config),
            http_client: self.http_client.clone(),
            session: Some(Arc::new(session)),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_deref()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn auth_contract(&self) -> AuthContract {
        self.config.auth_contract
    }

    fn build_request(
        &self,
        method: Method,
        endpoint: &str,
        access: Access,
    ) -> Result<RequestBuilder, PayrollError> {
        let url = format!("{}{}", self.config.base_url(), endpoint);
        Url::parse(&url)?;

        let mut request = self
            .http_client
            .request(method, &url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");

        match (&self.session, access) {
            (Some(session), _) => {
                if session.is_expired() {
                    warn!("Session expired, refusing request to {}", endpoint);
                    return Err(PayrollError::SessionExpired);
                }
                request = request.header(AUTHORIZATION, session.bearer_header());
            }
            (None, Access::Authenticated) => return Err(PayrollError::MissingSession),
            (None, Access::Public) => {}
        }
        Ok(request)
    }

    /// Sends the request and returns the response if its status is a success.
    async fn execute(
        &self,
        request_builder: RequestBuilder,
        context_msg: &str,
    ) -> Result<Response, PayrollError> {
        let request = request_builder.build().map_err(|e| {
            error!("Request build failed for '{}': {}", context_msg, e);
            PayrollError::Network(e)
        })?;
        let request_url = request.url().to_string();
        debug!("Sending request for '{}' to URL: {}", context_msg, request_url);

        let resp = self.http_client.execute(request).await.map_err(|e| {
            error!(
                "HTTP execution failed before receiving response for '{}' (URL: {}): {}",
                context_msg, request_url, e
            );
            PayrollError::Network(e)
        })?;

        let status = resp.status();
        info!(
            "Received response for '{}' (URL: {}): Status={}",
            context_msg, request_url, status
        );
        if status.is_success() {
            return Ok(resp);
        }

        let error_body = resp
            .text()
            .await
            .unwrap_or_else(|e| format!("Failed to read error body: {}", e));
        error!(
            "API Error Response: Status={}, Body='{}' for URL: {}",
            status, error_body, request_url
        );
        let message = match serde_json::from_str::<ErrorBody>(&error_body) {
            Ok(parsed) => parsed.message.or(parsed.error).unwrap_or(error_body),
            Err(_) => error_body,
        };
        Err(PayrollError::Http { status, message })
    }

    async fn send_and_deserialize<T: DeserializeOwned>(
        &self,
        request_builder: RequestBuilder,
        context_msg: &str,
    ) -> Result<T, PayrollError> {
        let bytes = self.execute(request_builder, context_msg).await?.bytes().await?;
        if let Ok(text) = std::str::from_utf8(&bytes) {
            debug!("Raw Success Response Body for '{}': {}", context_msg, text);
        }
        serde_json::from_slice::<T>(&bytes).map_err(|e| {
            error!("JSON deserialization failed for '{}': {}", context_msg, e);
            PayrollError::Json(e)
        })
    }

    /// Unwraps the `{ data: ... }` envelope every resource response uses.
    async fn send_for_data<T: DeserializeOwned>(
        &self,
        request_builder: RequestBuilder,
        context_msg: &str,
    ) -> Result<T, PayrollError> {
        let envelope: ApiEnvelope<T> = self.send_and_deserialize(request_builder, context_msg).await?;
        Ok(envelope.data)
    }

    async fn download(
        &self,
        request_builder: RequestBuilder,
        file_name: String,
        context_msg: &str,
    ) -> Result<Download, PayrollError> {
        let bytes = self.execute(request_builder, context_msg).await?.bytes().await?;
        debug!("Downloaded {} bytes for '{}'", bytes.len(), context_msg);
        Ok(Download { file_name, bytes })
    }

    // --- Auth ---

    /// Logs in against the configured contract and returns a new session.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, PayrollError> {
        let contract = self.auth_contract();
        let request = self
            .build_request(Method::POST, contract.login_path(), Access::Public)?
            .json(&LoginRequest { email, password });
        let response: LoginResponse = self.send_and_deserialize(request, "login").await?;

        match (response.success, response.token) {
            (Some(false), _) | (_, None) => Err(PayrollError::Http {
                status: reqwest::StatusCode::UNAUTHORIZED,
                message: response
                    .message
                    .unwrap_or_else(|| "login rejected".to_string()),
            }),
            (_, Some(token)) => {
                info!("Logged in via {:?} contract", contract);
                Ok(Session::new(token, response.user))
            }
        }
    }

    pub async fn current_user(&self) -> Result<User, PayrollError> {
        let request = self.build_request(
            Method::GET,
            self.auth_contract().current_user_path(),
            Access::Authenticated,
        )?;
        self.send_for_data(request, "current user").await
    }

    // --- Employees ---

    pub async fn list_employees(&self) -> Result<Vec<Employee>, PayrollError> {
        let request = self.build_request(Method::GET, "/employees", Access::Public)?;
        self.send_for_data(request, "list employees").await
    }

    pub async fn get_employee(&self, id: &str) -> Result<Employee, PayrollError> {
        let request = self.build_request(Method::GET, &format!("/employees/{}", id), Access::Public)?;
        self.send_for_data(request, "get employee").await
    }

    pub async fn create_employee(&self, employee: &Employee) -> Result<Employee, PayrollError> {
        let request = self
            .build_request(Method::POST, "/employees", Access::Public)?
            .json(employee);
        self.send_for_data(request, "create employee").await
    }

    pub async fn update_employee(&self, id: &str, employee: &Employee) -> Result<Employee, PayrollError> {
        let request = self
            .build_request(Method::PUT, &format!("/employees/{}", id), Access::Public)?
            .json(employee);
        self.send_for_data(request, "update employee").await
    }

    pub async fn delete_employee(&self, id: &str) -> Result<ApiAck, PayrollError> {
        let request = self.build_request(Method::DELETE, &format!("/employees/{}", id), Access::Public)?;
        self.send_and_deserialize(request, "delete employee").await
    }

    // --- Vessels ---

    pub async fn list_vessels(&self) -> Result<Vec<Vessel>, PayrollError> {
        let request = self.build_request(Method::GET, "/vessels", Access::Public)?;
        self.send_for_data(request, "list vessels").await
    }

    pub async fn get_vessel(&self, id: &str) -> Result<Vessel, PayrollError> {
        let request = self.build_request(Method::GET, &format!("/vessels/{}", id), Access::Public)?;
        self.send_for_data(request, "get vessel").await
    }

    pub async fn create_vessel(&self, vessel: &Vessel) -> Result<Vessel, PayrollError> {
        let request = self
            .build_request(Method::POST, "/vessels", Access::Authenticated)?
            .json(vessel);
        self.send_for_data(request, "create vessel").await
    }

    pub async fn update_vessel(&self, id: &str, vessel: &Vessel) -> Result<Vessel, PayrollError> {
        let request = self
            .build_request(Method::PUT, &format!("/vessels/{}", id), Access::Authenticated)?
            .json(vessel);
        self.send_for_data(request, "update vessel").await
    }

    pub async fn delete_vessel(&self, id: &str) -> Result<ApiAck, PayrollError> {
        let request =
            self.build_request(Method::DELETE, &format!("/vessels/{}", id), Access::Authenticated)?;
        self.send_and_deserialize(request, "delete vessel").await
    }

    pub async fn assign_employee(&self, vessel_id: &str, employee_id: &str) -> Result<Vessel, PayrollError> {
        let request = self
            .build_request(
                Method::POST,
                &format!("/vessels/{}/employees", vessel_id),
                Access::Authenticated,
            )?
            .json(&AssignEmployeeBody { employee_id });
        self.send_for_data(request, "assign employee to vessel").await
    }

    pub async fn unassign_employee(&self, vessel_id: &str, employee_id: &str) -> Result<Vessel, PayrollError> {
        let request = self.build_request(
            Method::DELETE,
            &format!("/vessels/{}/employees/{}", vessel_id, employee_id),
            Access::Authenticated,
        )?;
        self.send_for_data(request, "remove employee from vessel").await
    }

    // --- Attendance ---

    pub async fn list_attendance(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        vessel: Option<&str>,
    ) -> Result<Vec<AttendanceRecord>, PayrollError> {
        let mut params = date_range_params(Some(start), Some(end));
        if let Some(vessel) = vessel.filter(|v| !v.is_empty()) {
            params.push(("vessel", vessel.to_string()));
        }
        let request = self
            .build_request(Method::GET, "/attendance", Access::Public)?
            .query(&params);
        self.send_for_data(request, "list attendance").await
    }

    pub async fn update_attendance(
        &self,
        employee_id: &str,
        update: &AttendanceUpdate,
    ) -> Result<AttendanceRecord, PayrollError> {
        let request = self
            .build_request(Method::PUT, &format!("/attendance/{}", employee_id), Access::Public)?
            .json(update);
        self.send_for_data(request, "update attendance").await
    }

    pub async fn save_bulk_attendance(&self, records: &[AttendanceRecord]) -> Result<ApiAck, PayrollError> {
        let request = self
            .build_request(Method::POST, "/attendance/bulk", Access::Public)?
            .json(&BulkAttendanceBody { records });
        self.send_and_deserialize(request, "save bulk attendance").await
    }

    pub async fn export_attendance(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        vessel: Option<&str>,
        format: ExportFormat,
    ) -> Result<Download, PayrollError> {
        let mut params = date_range_params(Some(start), Some(end));
        params.push(("format", format.to_string()));
        if let Some(vessel) = vessel.filter(|v| !v.is_empty()) {
            params.push(("vessel", vessel.to_string()));
        }
        let request = self
            .build_request(Method::GET, "/attendance/export", Access::Public)?
            .query(&params);
        let file_name = ranged_file_name("attendance", Some(start), Some(end), format);
        self.download(request, file_name, "export attendance").await
    }

    // --- Payroll ---

    pub async fn list_payrolls(&self, filter: &PayrollFilter) -> Result<Vec<PayrollRecord>, PayrollError> {
        let mut params = Vec::new();
        if let Some(vessel_id) = filter.vessel_id.as_deref().filter(|v| !v.is_empty()) {
            params.push(("vesselId", vessel_id.to_string()));
        }
        params.extend(filter.date_params());
        let request = self
            .build_request(Method::GET, "/payroll", Access::Authenticated)?
            .query(&params);
        self.send_for_data(request, "list payrolls").await
    }

    pub async fn list_payrolls_by_vessel(
        &self,
        vessel_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<PayrollRecord>, PayrollError> {
        let request = self
            .build_request(
                Method::GET,
                &format!("/payroll/vessel/{}", vessel_id),
                Access::Authenticated,
            )?
            .query(&date_range_params(start, end));
        self.send_for_data(request, "list payrolls by vessel").await
    }

    pub async fn create_payroll(&self, input: &PayrollInput) -> Result<PayrollRecord, PayrollError> {
        let request = self
            .build_request(Method::POST, "/payroll", Access::Authenticated)?
            .json(input);
        self.send_for_data(request, "create payroll").await
    }

    pub async fn update_payroll(&self, id: &str, input: &PayrollInput) -> Result<PayrollRecord, PayrollError> {
        let request = self
            .build_request(Method::PUT, &format!("/payroll/{}", id), Access::Authenticated)?
            .json(input);
        self.send_for_data(request, "update payroll").await
    }

    pub async fn delete_payroll(&self, id: &str) -> Result<ApiAck, PayrollError> {
        let request =
            self.build_request(Method::DELETE, &format!("/payroll/{}", id), Access::Authenticated)?;
        self.send_and_deserialize(request, "delete payroll").await
    }

    /// Submits the whole batch in one call; the backend accepts or rejects it as a unit.
    pub async fn create_bulk_payrolls(
        &self,
        payrolls: &[PayrollInput],
    ) -> Result<BulkCreateResponse, PayrollError> {
        let request = self
            .build_request(Method::POST, "/payroll/bulk", Access::Authenticated)?
            .json(&BulkPayrollRequest { payrolls });
        let response: BulkCreateResponse = self.send_and_deserialize(request, "bulk create payrolls").await?;
        info!(
            "Backend created {} of {} submitted payroll records",
            response.count,
            payrolls.len()
        );
        Ok(response)
    }

    pub async fn generate_voucher(&self, voucher: &VoucherRequest) -> Result<VoucherResponse, PayrollError> {
        let request = self
            .build_request(Method::POST, "/payroll/voucher", Access::Authenticated)?
            .json(voucher);
        self.send_and_deserialize(request, "generate voucher").await
    }

    pub async fn export_payrolls(
        &self,
        vessel: Option<&str>,
        format: ExportFormat,
    ) -> Result<Download, PayrollError> {
        let mut params = vec![("format", format.to_string())];
        if let Some(vessel) = vessel.filter(|v| !v.is_empty()) {
            params.push(("vessel", vessel.to_string()));
        }
        let request = self
            .build_request(Method::GET, "/payroll/export", Access::Authenticated)?
            .query(&params);
        let file_name = format!("payroll_export.{}", format.extension());
        self.download(request, file_name, "export payrolls").await
    }

    // --- Departments ---

    pub async fn list_departments(&self) -> Result<Vec<Department>, PayrollError> {
        let request = self.build_request(Method::GET, "/departments", Access::Public)?;
        self.send_for_data(request, "list departments").await
    }

    pub async fn get_department(&self, id: &str) -> Result<Department, PayrollError> {
        let request = self.build_request(Method::GET, &format!("/departments/{}", id), Access::Public)?;
        self.send_for_data(request, "get department").await
    }

    pub async fn create_department(&self, department: &Department) -> Result<Department, PayrollError> {
        let request = self
            .build_request(Method::POST, "/departments", Access::Public)?
            .json(department);
        self.send_for_data(request, "create department").await
    }

    pub async fn update_department(
        &self,
        id: &str,
        department: &Department,
    ) -> Result<Department, PayrollError> {
        let request = self
            .build_request(Method::PUT, &format!("/departments/{}", id), Access::Public)?
            .json(department);
        self.send_for_data(request, "update department").await
    }

    pub async fn delete_department(&self, id: &str) -> Result<ApiAck, PayrollError> {
        let request = self.build_request(Method::DELETE, &format!("/departments/{}", id), Access::Public)?;
        self.send_and_deserialize(request, "delete department").await
    }

    // --- Reports & dashboard ---

    pub async fn report_summary(&self, start: NaiveDate, end: NaiveDate) -> Result<ReportSummary, PayrollError> {
        let request = self
            .build_request(Method::GET, "/reports/summary", Access::Public)?
            .query(&date_range_params(Some(start), Some(end)));
        self.send_for_data(request, "report summary").await
    }

    pub async fn download_report(
        &self,
        kind: ReportKind,
        start: NaiveDate,
        end: NaiveDate,
        format: ExportFormat,
    ) -> Result<Download, PayrollError> {
        self.report_download(
            &format!("/reports/{}", kind.path_segment()),
            kind.file_prefix(),
            start,
            end,
            format,
        )
        .await
    }

    pub async fn export_reports(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        format: ExportFormat,
    ) -> Result<Download, PayrollError> {
        self.report_download("/reports/export", "reports_export", start, end, format)
            .await
    }

    async fn report_download(
        &self,
        endpoint: &str,
        file_prefix: &str,
        start: NaiveDate,
        end: NaiveDate,
        format: ExportFormat,
    ) -> Result<Download, PayrollError> {
        let mut params = date_range_params(Some(start), Some(end));
        params.push(("format", format.to_string()));
        let request = self
            .build_request(Method::GET, endpoint, Access::Public)?
            .query(&params);
        let file_name = ranged_file_name(file_prefix, Some(start), Some(end), format);
        self.download(request, file_name, endpoint).await
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, PayrollError> {
        let request = self.build_request(Method::GET, "/dashboard/stats", Access::Public)?;
        self.send_for_data(request, "dashboard stats").await
    }
}

/// The payroll calls the import/export/voucher workflows depend on.
#[async_trait]
pub trait PayrollBackend: Send + Sync {
    async fn list_payrolls(&self, filter: &PayrollFilter) -> Result<Vec<PayrollRecord>, PayrollError>;

    async fn create_bulk_payrolls(
        &self,
        payrolls: &[PayrollInput],
    ) -> Result<BulkCreateResponse, PayrollError>;

    async fn generate_voucher(&self, voucher: &VoucherRequest) -> Result<VoucherResponse, PayrollError>;
}

#[async_trait]
impl PayrollBackend for ApiClient {
    async fn list_payrolls(&self, filter: &PayrollFilter) -> Result<Vec<PayrollRecord>, PayrollError> {
        ApiClient::list_payrolls(self, filter).await
    }

    async fn create_bulk_payrolls(
        &self,
        payrolls: &[PayrollInput],
    ) -> Result<BulkCreateResponse, PayrollError> {
        ApiClient::create_bulk_payrolls(self, payrolls).await
    }

    async fn generate_voucher(&self, voucher: &VoucherRequest) -> Result<VoucherResponse, PayrollError> {
        ApiClient::generate_voucher(self, voucher).await
    }
}
