//! Dashboard export rendering.
//!
//! One snapshot value feeds every encoding; the formatters only read it.

use chrono::{DateTime, Utc};
use service_core::error::AppError;

use crate::models::{DashboardSnapshot, FinancialSummary, Kpis};

/// Requested export encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Structured,
    Tabular,
    MultiSectionTabular,
}

impl ExportFormat {
    pub fn parse(token: &str) -> Result<Self, AppError> {
        match token {
            "structured" => Ok(Self::Structured),
            "tabular" => Ok(Self::Tabular),
            "multi-section-tabular" => Ok(Self::MultiSectionTabular),
            other => Err(AppError::ValidationError(format!(
                "Unknown format '{}'. Use: structured, tabular, multi-section-tabular",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Tabular => "tabular",
            Self::MultiSectionTabular => "multi-section-tabular",
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            Self::Structured => "application/json",
            Self::Tabular => "text/csv",
            // Delimited text standing in for a workbook, not a binary sheet.
            Self::MultiSectionTabular => "application/vnd.ms-excel",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Structured => "json",
            Self::Tabular | Self::MultiSectionTabular => "csv",
        }
    }
}

/// Rendered payload plus attachment metadata.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub media_type: &'static str,
    pub payload: Vec<u8>,
}

/// Render a snapshot into the requested encoding.
pub fn render(snapshot: &DashboardSnapshot, format: ExportFormat) -> Result<ExportFile, AppError> {
    let payload = match format {
        ExportFormat::Structured => write_structured(snapshot),
        ExportFormat::Tabular => write_tabular(snapshot),
        ExportFormat::MultiSectionTabular => write_multi_section(snapshot),
    }
    .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to render export: {}", e)))?;

    Ok(ExportFile {
        filename: export_filename(snapshot.generated_at, format.extension()),
        media_type: format.media_type(),
        payload,
    })
}

fn export_filename(generated_at: DateTime<Utc>, extension: &str) -> String {
    format!(
        "dashboard_export_{}.{}",
        generated_at.format("%Y%m%d_%H%M%S"),
        extension
    )
}

fn write_structured(snapshot: &DashboardSnapshot) -> anyhow::Result<Vec<u8>> {
    // serde_json emits UTF-8 and leaves non-ASCII text verbatim.
    let json = serde_json::to_string_pretty(snapshot)?;
    Ok(json.into_bytes())
}

/// "total_income" -> "Total Income".
fn field_label(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Summary fields in their fixed export order.
fn summary_fields(summary: &FinancialSummary) -> Vec<(&'static str, String)> {
    vec![
        ("total_income", summary.total_income.to_string()),
        ("total_expense", summary.total_expense.to_string()),
        ("net_balance", summary.net_balance.to_string()),
        ("income_count", summary.income_count.to_string()),
        ("expense_count", summary.expense_count.to_string()),
        ("average_income", summary.average_income.to_string()),
        ("average_expense", summary.average_expense.to_string()),
    ]
}

/// KPI fields in their fixed export order.
fn kpi_fields(kpis: &Kpis) -> Vec<(&'static str, String)> {
    vec![
        ("financial_status", kpis.financial_status.to_string()),
        ("balance_ratio", kpis.balance_ratio.to_string()),
        ("efficiency", kpis.efficiency.to_string()),
    ]
}

fn kv<W: std::io::Write>(w: &mut csv::Writer<W>, label: &str, value: &str) -> csv::Result<()> {
    w.write_record([label, value])
}

fn finish(w: csv::Writer<Vec<u8>>) -> anyhow::Result<Vec<u8>> {
    w.into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush export payload: {}", e))
}

fn write_tabular(snapshot: &DashboardSnapshot) -> anyhow::Result<Vec<u8>> {
    let mut w = csv::WriterBuilder::new().flexible(true).from_writer(vec![]);

    w.write_record(["=== DASHBOARD EXPORT ==="])?;
    kv(&mut w, "Period", &snapshot.period.label)?;
    kv(&mut w, "Start Date", &date_or_dash(snapshot.period.start_date))?;
    kv(&mut w, "End Date", &date_or_dash(snapshot.period.end_date))?;
    kv(&mut w, "Generated At", &snapshot.generated_at.to_rfc3339())?;

    w.write_record(["=== FINANCIAL SUMMARY ==="])?;
    kv(&mut w, "Concept", "Value")?;
    for (name, value) in summary_fields(&snapshot.summary) {
        kv(&mut w, &field_label(name), &value)?;
    }

    w.write_record(["=== KEY INDICATORS ==="])?;
    kv(&mut w, "Indicator", "Value")?;
    for (name, value) in kpi_fields(&snapshot.kpis) {
        kv(&mut w, &field_label(name), &value)?;
    }

    if !snapshot.recent_movements.is_empty() {
        w.write_record(["=== RECENT MOVEMENTS ==="])?;
        w.write_record(["ID", "Type", "Description", "Amount", "Date"])?;
        for entry in &snapshot.recent_movements {
            w.write_record([
                entry.id.to_string(),
                entry.kind.label().to_string(),
                entry.description.clone().unwrap_or_default(),
                entry.amount.to_string(),
                entry.date.to_string(),
            ])?;
        }
    }

    finish(w)
}

/// Same content as the tabular encoding, reshaped into named "sheets" with a
/// semicolon delimiter.
fn write_multi_section(snapshot: &DashboardSnapshot) -> anyhow::Result<Vec<u8>> {
    let mut w = csv::WriterBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_writer(vec![]);

    w.write_record(["SHEET: SUMMARY"])?;
    kv(&mut w, "Concept", "Value")?;
    kv(&mut w, "Period", &snapshot.period.label)?;
    kv(&mut w, "Total Income", &snapshot.summary.total_income.to_string())?;
    kv(&mut w, "Total Expense", &snapshot.summary.total_expense.to_string())?;
    kv(&mut w, "Net Balance", &snapshot.summary.net_balance.to_string())?;
    kv(
        &mut w,
        "Financial Status",
        snapshot.kpis.financial_status.as_str(),
    )?;

    w.write_record(["SHEET: FINANCIAL_DETAIL"])?;
    w.write_record(["Metric", "Income", "Expense"])?;
    w.write_record([
        "Total".to_string(),
        snapshot.summary.total_income.to_string(),
        snapshot.summary.total_expense.to_string(),
    ])?;
    w.write_record([
        "Count".to_string(),
        snapshot.summary.income_count.to_string(),
        snapshot.summary.expense_count.to_string(),
    ])?;
    w.write_record([
        "Average".to_string(),
        snapshot.summary.average_income.to_string(),
        snapshot.summary.average_expense.to_string(),
    ])?;

    if !snapshot.recent_movements.is_empty() {
        w.write_record(["SHEET: MOVEMENTS"])?;
        w.write_record(["ID", "Type", "Description", "Amount", "Date"])?;
        for entry in &snapshot.recent_movements {
            w.write_record([
                entry.id.to_string(),
                entry.kind.label().to_string(),
                entry.description.clone().unwrap_or_default(),
                entry.amount.to_string(),
                entry.date.to_string(),
            ])?;
        }
    }

    finish(w)
}

fn date_or_dash(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityEntry, LedgerTotals, MovementKind, PeriodDescriptor};
    use crate::services::reports::{compute_kpis, summarize};
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal::Decimal;

    fn snapshot(with_movements: bool) -> DashboardSnapshot {
        let summary = summarize(&LedgerTotals {
            total_income: Decimal::new(100000, 2),
            income_count: 4,
            total_expense: Decimal::new(40000, 2),
            expense_count: 2,
        });
        let kpis = compute_kpis(&summary);
        let recent_movements = if with_movements {
            vec![
                ActivityEntry {
                    id: 1,
                    kind: MovementKind::Income,
                    description: Some("Año nuevo, suite".to_string()),
                    amount: Decimal::new(25000, 2),
                    date: NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
                },
                ActivityEntry {
                    id: 2,
                    kind: MovementKind::Expense,
                    description: Some("Laundry".to_string()),
                    amount: Decimal::new(-7000, 2),
                    date: NaiveDate::from_ymd_opt(2024, 2, 27).unwrap(),
                },
            ]
        } else {
            Vec::new()
        };

        DashboardSnapshot {
            period: PeriodDescriptor {
                label: "Entire history".to_string(),
                start_date: None,
                end_date: None,
            },
            summary,
            kpis,
            recent_movements,
            generated_at: chrono::Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap(),
        }
    }

    #[test]
    fn parse_rejects_unknown_format() {
        let err = ExportFormat::parse("unknown").unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn media_types_match_formats() {
        assert_eq!(ExportFormat::parse("structured").unwrap().media_type(), "application/json");
        assert_eq!(ExportFormat::parse("tabular").unwrap().media_type(), "text/csv");
        assert_eq!(
            ExportFormat::parse("multi-section-tabular").unwrap().media_type(),
            "application/vnd.ms-excel"
        );
    }

    #[test]
    fn filename_embeds_generation_timestamp() {
        let file = render(&snapshot(true), ExportFormat::Structured).unwrap();
        assert_eq!(file.filename, "dashboard_export_20240301_103000.json");

        let file = render(&snapshot(true), ExportFormat::Tabular).unwrap();
        assert_eq!(file.filename, "dashboard_export_20240301_103000.csv");
    }

    #[test]
    fn structured_keeps_non_ascii_verbatim() {
        let file = render(&snapshot(true), ExportFormat::Structured).unwrap();
        let body = String::from_utf8(file.payload).unwrap();
        assert!(body.contains("Año nuevo, suite"));
        assert!(!body.contains("\\u00f1"));
        assert!(body.contains("\"total_income\""));
        assert!(body.contains("\"financial_status\": \"Positive\""));
    }

    #[test]
    fn structured_omits_empty_movements() {
        let file = render(&snapshot(false), ExportFormat::Structured).unwrap();
        let body = String::from_utf8(file.payload).unwrap();
        assert!(!body.contains("recent_movements"));
    }

    #[test]
    fn tabular_sections_and_labels() {
        let file = render(&snapshot(true), ExportFormat::Tabular).unwrap();
        let body = String::from_utf8(file.payload).unwrap();

        assert!(body.contains("=== FINANCIAL SUMMARY ==="));
        assert!(body.contains("Total Income,1000.00"));
        assert!(body.contains("Average Expense,200.00"));
        assert!(body.contains("Financial Status,Positive"));
        assert!(body.contains("Balance Ratio,60.00"));
        assert!(body.contains("ID,Type,Description,Amount,Date"));
        // Fields containing the delimiter are quoted.
        assert!(body.contains("\"Año nuevo, suite\""));
        assert!(body.contains("-70.00"));

        let metadata_pos = body.find("=== DASHBOARD EXPORT ===").unwrap();
        let summary_pos = body.find("=== FINANCIAL SUMMARY ===").unwrap();
        let kpi_pos = body.find("=== KEY INDICATORS ===").unwrap();
        let movements_pos = body.find("=== RECENT MOVEMENTS ===").unwrap();
        assert!(metadata_pos < summary_pos && summary_pos < kpi_pos && kpi_pos < movements_pos);
    }

    #[test]
    fn tabular_omits_movement_table_when_empty() {
        let file = render(&snapshot(false), ExportFormat::Tabular).unwrap();
        let body = String::from_utf8(file.payload).unwrap();
        assert!(!body.contains("=== RECENT MOVEMENTS ==="));
        assert!(!body.contains("ID,Type,Description,Amount,Date"));
    }

    #[test]
    fn multi_section_uses_semicolons_and_sheet_banners() {
        let file = render(&snapshot(true), ExportFormat::MultiSectionTabular).unwrap();
        let body = String::from_utf8(file.payload).unwrap();

        assert!(body.contains("SHEET: SUMMARY"));
        assert!(body.contains("SHEET: FINANCIAL_DETAIL"));
        assert!(body.contains("SHEET: MOVEMENTS"));
        assert!(body.contains("Total Income;1000.00"));
        assert!(body.contains("Metric;Income;Expense"));
        assert!(body.contains("Average;250.00;200.00"));
        assert!(body.contains("ID;Type;Description;Amount;Date"));
    }

    #[test]
    fn field_label_title_cases_underscores() {
        assert_eq!(field_label("total_income"), "Total Income");
        assert_eq!(field_label("net_balance"), "Net Balance");
        assert_eq!(field_label("efficiency"), "Efficiency");
    }
}
