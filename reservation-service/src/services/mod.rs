//! Services for reservation-service.

pub mod database;
pub mod export;
pub mod metrics;
pub mod password;
pub mod reports;

pub use database::Database;
pub use export::{ExportFile, ExportFormat};
pub use metrics::{get_metrics, init_metrics};
pub use reports::{Period, ReportService};
