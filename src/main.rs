// src/main.rs

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crewpay::models::{PayPeriod, PayrollFilter, ReportKind};
use crewpay::pay::{aggregate_attendance, compute_pay, HoursWorked, ShiftHours};
use crewpay::{
    ApiClient, ClientConfig, ExportFormat, PayrollService, PayrollSummary, SessionStore, VoucherFilter,
};

/// Crew payroll console
#[derive(Parser, Debug)]
#[command(name = "crewpay", author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the session locally
    Login {
        #[arg(long, env = "CREWPAY_EMAIL")]
        email: String,
        #[arg(long, env = "CREWPAY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    Employees {
        #[command(subcommand)]
        action: ListAction,
    },
    Vessels {
        #[command(subcommand)]
        action: ListAction,
    },
    Departments {
        #[command(subcommand)]
        action: ListAction,
    },
    Attendance {
        #[command(subcommand)]
        action: AttendanceAction,
    },
    Payroll {
        #[command(subcommand)]
        action: PayrollAction,
    },
    Reports {
        #[command(subcommand)]
        action: ReportAction,
    },
}

#[derive(Subcommand, Debug)]
enum ListAction {
    List,
}

#[derive(Subcommand, Debug)]
enum AttendanceAction {
    /// Hours per employee for a pay period, from attendance flags
    Hours {
        #[arg(long, value_parser = parse_date)]
        start: NaiveDate,
        #[arg(long, value_parser = parse_date)]
        end: NaiveDate,
        #[arg(long)]
        vessel: Option<String>,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct FilterArgs {
    #[arg(long)]
    vessel: Option<String>,
    #[arg(long, value_parser = parse_date)]
    start: Option<NaiveDate>,
    #[arg(long, value_parser = parse_date)]
    end: Option<NaiveDate>,
}

impl From<&FilterArgs> for PayrollFilter {
    fn from(args: &FilterArgs) -> Self {
        PayrollFilter {
            vessel_id: args.vessel.clone(),
            start_date: args.start,
            end_date: args.end,
        }
    }
}

#[derive(Subcommand, Debug)]
enum PayrollAction {
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Totals per employee, per vessel and overall
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Bulk-create payroll records from an xlsx/xls/ods/csv file
    Import { file: PathBuf },
    /// Write the filtered records to a local spreadsheet
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, value_enum, default_value_t = LocalFormat::Xlsx)]
        format: LocalFormat,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Generate a disbursement voucher for the filtered records
    Voucher {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        employee: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Compute pay locally from a rate and hours
    Compute {
        #[arg(long)]
        rate: Decimal,
        #[arg(long, default_value = "0")]
        regular: Decimal,
        #[arg(long, default_value = "0")]
        overtime: Decimal,
        #[arg(long, default_value = "0")]
        night: Decimal,
        #[arg(long, default_value = "0")]
        sunday: Decimal,
        #[arg(long, default_value = "0")]
        sunday_overtime: Decimal,
        #[arg(long)]
        deductions: Option<Decimal>,
    },
}

#[derive(Subcommand, Debug)]
enum ReportAction {
    /// Download a server-generated report
    Download {
        #[arg(long, value_enum)]
        kind: ReportArg,
        #[arg(long, value_parser = parse_date)]
        start: NaiveDate,
        #[arg(long, value_parser = parse_date)]
        end: NaiveDate,
        #[arg(long, value_enum, default_value_t = FormatArg::Pdf)]
        format: FormatArg,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum LocalFormat {
    Xlsx,
    Csv,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum FormatArg {
    Xlsx,
    Csv,
    Pdf,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Xlsx => ExportFormat::Xlsx,
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Pdf => ExportFormat::Pdf,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ReportArg {
    Employees,
    Payroll,
    Attendance,
    Vessels,
    /// All reports in one export
    All,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

fn print_summary(summary: &PayrollSummary) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ClientConfig::from_env().context("Loading client configuration failed")?;
    let store = SessionStore::new(config.session_file.clone());
    let mut client = ApiClient::new(config).context("Creating API client failed")?;
    if let Some(session) = store.load()? {
        client = client.with_session(session);
    }

    match args.command {
        Command::Login { email, password } => {
            let session = client.login(&email, &password).await.context("Login failed")?;
            store.save(&session)?;
            let name = session.user().and_then(|u| u.name.clone()).unwrap_or(email);
            println!("Logged in as {}", name);
        }
        Command::Logout => {
            store.clear()?;
            println!("Logged out");
        }
        Command::Whoami => {
            let user = client.current_user().await.context("Fetching current user failed")?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Command::Employees { action: ListAction::List } => {
            for employee in client.list_employees().await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    employee.display_id(),
                    employee.full_name(),
                    employee.position,
                    employee.status
                );
            }
        }
        Command::Vessels { action: ListAction::List } => {
            for vessel in client.list_vessels().await? {
                println!(
                    "{}\t{}\t{}\t{} crew",
                    vessel.id.as_deref().unwrap_or_default(),
                    vessel.vessel_name,
                    vessel.imo.as_deref().unwrap_or_default(),
                    vessel.assigned_employees.len()
                );
            }
        }
        Command::Departments { action: ListAction::List } => {
            for department in client.list_departments().await? {
                println!("{}\t{}", department.id.as_deref().unwrap_or_default(), department.name);
            }
        }
        Command::Attendance {
            action: AttendanceAction::Hours { start, end, vessel },
        } => {
            let records = client.list_attendance(start, end, vessel.as_deref()).await?;
            let totals = aggregate_attendance(&records, &PayPeriod::new(start, end), &ShiftHours::default())?;
            println!("{}", serde_json::to_string_pretty(&totals)?);
        }
        Command::Payroll { action } => run_payroll(client, action).await?,
        Command::Reports {
            action: ReportAction::Download { kind, start, end, format, out },
        } => {
            let format = ExportFormat::from(format);
            let download = match kind {
                ReportArg::Employees => client.download_report(ReportKind::Employees, start, end, format).await?,
                ReportArg::Payroll => client.download_report(ReportKind::Payroll, start, end, format).await?,
                ReportArg::Attendance => client.download_report(ReportKind::Attendance, start, end, format).await?,
                ReportArg::Vessels => client.download_report(ReportKind::Vessels, start, end, format).await?,
                ReportArg::All => client.export_reports(start, end, format).await?,
            };
            let path = download.save_to(&out)?;
            println!("Saved {}", path.display());
        }
    }

    Ok(())
}

async fn run_payroll(client: ApiClient, action: PayrollAction) -> Result<()> {
    let service = PayrollService::from_shared(Arc::new(client));

    match action {
        PayrollAction::List { filter } => {
            for record in service.backend().list_payrolls(&PayrollFilter::from(&filter)).await? {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    record.id.as_deref().unwrap_or_default(),
                    record.employee_key().unwrap_or_default(),
                    record.vessel_key().unwrap_or_default(),
                    record.gross_pay.map(|g| g.to_string()).unwrap_or_default(),
                    record.net_pay.map(|n| n.to_string()).unwrap_or_default()
                );
            }
        }
        PayrollAction::Summary { filter } => {
            let summary = service.summarize(&PayrollFilter::from(&filter)).await?;
            print_summary(&summary)?;
        }
        PayrollAction::Import { file } => {
            let count = service
                .import_file(&file)
                .await
                .with_context(|| format!("Importing {:?} failed", file))?;
            println!("Imported {} payroll records", count);
        }
        PayrollAction::Export { filter, format, out } => {
            let format = match format {
                LocalFormat::Xlsx => ExportFormat::Xlsx,
                LocalFormat::Csv => ExportFormat::Csv,
            };
            let path = service
                .export_to_dir(&PayrollFilter::from(&filter), format, &out)
                .await?;
            println!("Exported to {}", path.display());
        }
        PayrollAction::Voucher {
            filter,
            employee,
            description,
        } => {
            let voucher_filter = VoucherFilter {
                start_date: filter.start,
                end_date: filter.end,
                vessel: filter.vessel.clone(),
                employee,
                description,
            };
            let response = service
                .generate_voucher_for(&PayrollFilter::from(&filter), voucher_filter)
                .await
                .context("Voucher generation failed")?;
            match response.data {
                Some(voucher) => println!(
                    "Voucher {} covering {} records, total {}",
                    voucher.voucher_number().or(voucher.id()).unwrap_or("(unnumbered)"),
                    voucher.payroll_ids().len(),
                    voucher.total_amount().map(|t| t.to_string()).unwrap_or_default()
                ),
                None => println!(
                    "{}",
                    response.message.as_deref().unwrap_or("Voucher generated")
                ),
            }
        }
        PayrollAction::Compute {
            rate,
            regular,
            overtime,
            night,
            sunday,
            sunday_overtime,
            deductions,
        } => {
            let hours = HoursWorked {
                regular,
                overtime,
                night_differential: night,
                sunday,
                sunday_overtime,
            };
            let mut breakdown = compute_pay(rate, &hours)?;
            if let Some(deductions) = deductions {
                breakdown = breakdown.with_deductions(deductions)?;
            }
            info!("Computed pay for {} hours", hours.total());
            println!("{}", serde_json::to_string_pretty(&breakdown)?);
        }
    }

    Ok(())
}
