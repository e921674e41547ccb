// src/payroll_service.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::api_client::PayrollBackend;
use crate::error::{io_context, PayrollError};
use crate::export::{export_rows, write_csv, write_xlsx, ExportFormat, LOCAL_EXPORT_FILE_NAME};
use crate::fetch::{ActionGuard, FetchOutcome, RequestGeneration};
use crate::import::{parse_file, parse_workbook};
use crate::models::{PayrollFilter, PayrollInput, PayrollRecord, VoucherResponse};
use crate::pay::PayrollSummary;
use crate::voucher::{VoucherFilter, VoucherRequest};

/// Import, export and voucher workflows on top of a payroll backend.
///
/// Each workflow runs at most once at a time; a second call while one is
/// in flight fails with [`PayrollError::ActionInProgress`]. In-flight calls
/// are not cancellable.
pub struct PayrollService<B: PayrollBackend> {
    backend: Arc<B>,
    import_guard: ActionGuard,
    export_guard: ActionGuard,
    voucher_guard: ActionGuard,
}

impl<B: PayrollBackend> PayrollService<B> {
    pub fn new(backend: B) -> Self {
        Self::from_shared(Arc::new(backend))
    }

    pub fn from_shared(backend: Arc<B>) -> Self {
        Self {
            backend,
            import_guard: ActionGuard::new("Import"),
            export_guard: ActionGuard::new("Export"),
            voucher_guard: ActionGuard::new("Voucher generation"),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Parses a workbook and submits every row in one bulk call. Returns the backend's count.
    pub async fn import_workbook(&self, bytes: &[u8]) -> Result<usize, PayrollError> {
        let _ticket = self.import_guard.try_begin()?;
        let inputs = parse_workbook(bytes)?;
        self.submit(inputs).await
    }

    pub async fn import_file(&self, path: &Path) -> Result<usize, PayrollError> {
        let _ticket = self.import_guard.try_begin()?;
        let inputs = parse_file(path)?;
        self.submit(inputs).await
    }

    async fn submit(&self, inputs: Vec<PayrollInput>) -> Result<usize, PayrollError> {
        if inputs.is_empty() {
            return Err(PayrollError::Parse(
                "import file contains no payroll rows".to_string(),
            ));
        }
        let response = self.backend.create_bulk_payrolls(&inputs).await?;
        if response.count != inputs.len() {
            warn!(
                "Submitted {} payroll rows but backend reports {} created",
                inputs.len(),
                response.count
            );
        }
        info!("Imported {} payroll records", response.count);
        Ok(response.count)
    }

    /// Fetches the filtered records and serializes them as an xlsx workbook.
    pub async fn export_workbook(&self, filter: &PayrollFilter) -> Result<Vec<u8>, PayrollError> {
        let _ticket = self.export_guard.try_begin()?;
        let records = self.backend.list_payrolls(filter).await?;
        write_xlsx(&export_rows(&records))
    }

    /// Writes the filtered records to `dir` and returns the written path.
    pub async fn export_to_dir(
        &self,
        filter: &PayrollFilter,
        format: ExportFormat,
        dir: &Path,
    ) -> Result<PathBuf, PayrollError> {
        let _ticket = self.export_guard.try_begin()?;
        let records = self.backend.list_payrolls(filter).await?;
        let rows = export_rows(&records);

        let (file_name, bytes) = match format {
            ExportFormat::Xlsx => (LOCAL_EXPORT_FILE_NAME.to_string(), write_xlsx(&rows)?),
            ExportFormat::Csv => {
                let mut buffer = Vec::new();
                write_csv(&rows, &mut buffer)?;
                (format!("payroll_export.{}", format.extension()), buffer)
            }
            ExportFormat::Pdf => {
                return Err(PayrollError::Validation(
                    "PDF exports are produced by the backend, use the server-side export".to_string(),
                ))
            }
        };

        std::fs::create_dir_all(dir)
            .map_err(|e| io_context(e, format!("Failed to create export directory: {:?}", dir)))?;
        let path = dir.join(file_name);
        std::fs::write(&path, bytes)
            .map_err(|e| io_context(e, format!("Failed to write export file: {:?}", path)))?;
        info!("Exported {} payroll records to {:?}", rows.len(), path);
        Ok(path)
    }

    /// Requests a voucher for the given ids. An empty selection fails before any network call.
    pub async fn generate_voucher(
        &self,
        payroll_ids: Vec<String>,
        filter: VoucherFilter,
    ) -> Result<VoucherResponse, PayrollError> {
        let _ticket = self.voucher_guard.try_begin()?;
        let request = VoucherRequest::new(payroll_ids, filter)?;
        self.send_voucher(request).await
    }

    /// Vouchers every saved record matching `filter`, narrowed to one employee when
    /// the voucher filter names one.
    pub async fn generate_voucher_for(
        &self,
        filter: &PayrollFilter,
        voucher_filter: VoucherFilter,
    ) -> Result<VoucherResponse, PayrollError> {
        let _ticket = self.voucher_guard.try_begin()?;
        let mut records = self.backend.list_payrolls(filter).await?;
        if let Some(employee) = voucher_filter.employee.as_deref() {
            records.retain(|r| r.employee_key().as_deref() == Some(employee));
        }
        let request = VoucherRequest::from_records(&records, voucher_filter)?;
        self.send_voucher(request).await
    }

    /// Callers hold the voucher ticket for the whole action, record lookup included.
    async fn send_voucher(&self, request: VoucherRequest) -> Result<VoucherResponse, PayrollError> {
        let response = self.backend.generate_voucher(&request).await?;
        info!(
            "Voucher generated for {} payroll records: {:?}",
            request.payroll_ids().len(),
            response.data.as_ref().and_then(|v| v.voucher_number())
        );
        Ok(response)
    }

    pub async fn summarize(&self, filter: &PayrollFilter) -> Result<PayrollSummary, PayrollError> {
        let records = self.backend.list_payrolls(filter).await?;
        Ok(PayrollSummary::from_records(&records))
    }
}

/// The currently displayed payroll records.
///
/// Every [`PayrollView::load`] takes a new generation; a response that
/// arrives after a newer load started is dropped instead of replacing the
/// displayed records.
pub struct PayrollView<B: PayrollBackend> {
    backend: Arc<B>,
    generation: RequestGeneration,
    records: Mutex<Vec<PayrollRecord>>,
}

impl<B: PayrollBackend> PayrollView<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            generation: RequestGeneration::new(),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Returns the number of records now displayed, or `Stale` if this load was overtaken.
    pub async fn load(&self, filter: &PayrollFilter) -> Result<FetchOutcome<usize>, PayrollError> {
        let ticket = self.generation.begin();
        let result = self.backend.list_payrolls(filter).await;

        let mut records = self.records.lock().await;
        match self.generation.settle(ticket, result) {
            FetchOutcome::Stale => Ok(FetchOutcome::Stale),
            FetchOutcome::Fresh(result) => {
                let fetched = result?;
                let count = fetched.len();
                *records = fetched;
                Ok(FetchOutcome::Fresh(count))
            }
        }
    }

    pub async fn records(&self) -> Vec<PayrollRecord> {
        self.records.lock().await.clone()
    }
}
