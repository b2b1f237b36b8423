//! Dashboard aggregation and report orchestration.
//!
//! Everything that turns fetched ledger rows into a snapshot is a pure
//! function here; `ReportService` only wires the injected store handle to
//! them. Two identical inputs always produce identical summaries.

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use tracing::instrument;

use crate::models::{
    ActivityEntry, DashboardSnapshot, FinancialStatus, FinancialSummary, Kpis, LedgerTotals,
    Movement, MovementKind, PeriodDescriptor,
};
use crate::services::Database;

/// Per-kind fetch size and feed cap for the live dashboard.
const DASHBOARD_FETCH: i64 = 5;
const DASHBOARD_CAP: usize = 10;
/// Exports fetch deeper and show a longer feed.
const EXPORT_FETCH: i64 = 10;
const EXPORT_CAP: usize = 20;

/// Inclusive date window. Both bounds optional; absent means match-all.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Build a window, rejecting an inverted pair before any query runs.
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, AppError> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(AppError::ValidationError(
                    "start date cannot be later than end date".to_string(),
                ));
            }
        }
        Ok(Self { start, end })
    }
}

/// Filters for the guest registry report. Conjunctive when combined.
#[derive(Debug, Clone, Default)]
pub struct GuestFilter {
    pub range: DateRange,
    pub document_id: Option<String>,
    pub client_name: Option<String>,
}

/// Filters for the room occupancy report. Conjunctive when combined.
#[derive(Debug, Clone, Default)]
pub struct OccupancyFilter {
    pub range: DateRange,
    pub room_number: Option<String>,
    pub room_type: Option<String>,
}

/// Named reporting period resolved to a concrete window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    All,
    Last30Days,
    CurrentMonth,
    CurrentYear,
}

impl Period {
    pub fn parse(token: &str) -> Result<Self, AppError> {
        match token {
            "all" => Ok(Self::All),
            "last_30_days" => Ok(Self::Last30Days),
            "current_month" => Ok(Self::CurrentMonth),
            "current_year" => Ok(Self::CurrentYear),
            other => Err(AppError::ValidationError(format!(
                "Unknown period '{}'. Use: all, last_30_days, current_month, current_year",
                other
            ))),
        }
    }

    /// Resolve to a concrete window relative to `today`.
    pub fn resolve(self, today: NaiveDate) -> DateRange {
        match self {
            Self::All => DateRange::default(),
            Self::Last30Days => DateRange {
                start: Some(today - chrono::Duration::days(30)),
                end: Some(today),
            },
            Self::CurrentMonth => DateRange {
                start: today.with_day(1),
                end: Some(today),
            },
            Self::CurrentYear => DateRange {
                start: today.with_ordinal(1),
                end: Some(today),
            },
        }
    }

    pub fn describe(self, today: NaiveDate) -> PeriodDescriptor {
        let range = self.resolve(today);
        let label = match (range.start, range.end) {
            (Some(start), Some(end)) => format!("From {} to {}", start, end),
            _ => "Entire history".to_string(),
        };
        PeriodDescriptor {
            label,
            start_date: range.start,
            end_date: range.end,
        }
    }
}

/// Fold raw ledger aggregates into a financial summary.
pub fn summarize(totals: &LedgerTotals) -> FinancialSummary {
    FinancialSummary {
        total_income: totals.total_income,
        total_expense: totals.total_expense,
        net_balance: totals.total_income - totals.total_expense,
        income_count: totals.income_count,
        expense_count: totals.expense_count,
        average_income: average(totals.total_income, totals.income_count),
        average_expense: average(totals.total_expense, totals.expense_count),
    }
}

/// Average rounded to 2 decimal places; zero when there are no rows.
fn average(total: Decimal, count: i64) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        round_money(total / Decimal::from(count))
    }
}

/// Round to 2 decimal places and pin the scale there, so derived values
/// print as money ("60.00", not "60.0").
fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp(2);
    rounded.rescale(2);
    rounded
}

/// Derive the KPI set from a summary.
pub fn compute_kpis(summary: &FinancialSummary) -> Kpis {
    // net == 0 classifies as Negative; the rule is strictly net > 0.
    let financial_status = if summary.net_balance > Decimal::ZERO {
        FinancialStatus::Positive
    } else {
        FinancialStatus::Negative
    };
    Kpis {
        financial_status,
        // Both ratios currently share one formula; kept as two fields
        // pending product clarification (see DESIGN.md).
        balance_ratio: net_share_of_income(summary),
        efficiency: net_share_of_income(summary),
    }
}

/// net / total_income * 100, rounded to 2 dp; zero when there is no income.
fn net_share_of_income(summary: &FinancialSummary) -> Decimal {
    if summary.total_income.is_zero() {
        Decimal::ZERO
    } else {
        round_money(summary.net_balance / summary.total_income * Decimal::from(100))
    }
}

/// Merge per-kind recent rows into one display feed: expenses negated,
/// newest first, truncated to `cap`. The sort is stable, so same-date
/// entries keep their fetch order.
pub fn merge_recent(
    incomes: Vec<Movement>,
    expenses: Vec<Movement>,
    cap: usize,
) -> Vec<ActivityEntry> {
    let mut feed: Vec<ActivityEntry> = incomes
        .into_iter()
        .chain(expenses)
        .map(ActivityEntry::from)
        .collect();
    feed.sort_by(|a, b| b.date.cmp(&a.date));
    feed.truncate(cap);
    feed
}

/// Builds dashboard snapshots from ledger reads. Holds the store handle it
/// was constructed with; shared via `AppState`.
#[derive(Clone)]
pub struct ReportService {
    db: Database,
}

impl ReportService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Live dashboard: entire history, feed capped at 10.
    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<DashboardSnapshot, AppError> {
        self.snapshot(Period::All, true, DASHBOARD_FETCH, DASHBOARD_CAP)
            .await
    }

    /// Export snapshot for a named period; the feed is optional and deeper.
    #[instrument(skip(self))]
    pub async fn export_snapshot(
        &self,
        period: Period,
        include_movements: bool,
    ) -> Result<DashboardSnapshot, AppError> {
        self.snapshot(period, include_movements, EXPORT_FETCH, EXPORT_CAP)
            .await
    }

    async fn snapshot(
        &self,
        period: Period,
        include_movements: bool,
        fetch: i64,
        cap: usize,
    ) -> Result<DashboardSnapshot, AppError> {
        let today = Utc::now().date_naive();
        let range = period.resolve(today);

        let totals = self.db.ledger_totals(&range).await?;
        let summary = summarize(&totals);
        let kpis = compute_kpis(&summary);

        let recent_movements = if include_movements {
            let incomes = self
                .db
                .recent_movements(MovementKind::Income, &range, fetch)
                .await?;
            let expenses = self
                .db
                .recent_movements(MovementKind::Expense, &range, fetch)
                .await?;
            merge_recent(incomes, expenses, cap)
        } else {
            Vec::new()
        };

        Ok(DashboardSnapshot {
            period: period.describe(today),
            summary,
            kpis,
            recent_movements,
            generated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn movement(id: i32, kind: MovementKind, amount: Decimal, day: NaiveDate) -> Movement {
        Movement {
            id,
            date: day,
            kind,
            description: Some(format!("movement {}", id)),
            amount,
        }
    }

    fn totals(
        total_income: Decimal,
        income_count: i64,
        total_expense: Decimal,
        expense_count: i64,
    ) -> LedgerTotals {
        LedgerTotals {
            total_income,
            income_count,
            total_expense,
            expense_count,
        }
    }

    #[test]
    fn date_range_rejects_inverted_bounds() {
        let err = DateRange::new(Some(date(2024, 2, 1)), Some(date(2024, 1, 1))).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn date_range_accepts_equal_bounds_and_open_ends() {
        assert!(DateRange::new(Some(date(2024, 1, 1)), Some(date(2024, 1, 1))).is_ok());
        assert!(DateRange::new(None, Some(date(2024, 1, 1))).is_ok());
        assert!(DateRange::new(Some(date(2024, 1, 1)), None).is_ok());
        assert!(DateRange::new(None, None).is_ok());
    }

    #[test]
    fn period_parse_rejects_unknown_token() {
        assert!(Period::parse("last_week").is_err());
        assert_eq!(Period::parse("all").unwrap(), Period::All);
        assert_eq!(Period::parse("last_30_days").unwrap(), Period::Last30Days);
        assert_eq!(Period::parse("current_month").unwrap(), Period::CurrentMonth);
        assert_eq!(Period::parse("current_year").unwrap(), Period::CurrentYear);
    }

    #[test]
    fn period_resolution_against_fixed_today() {
        let today = date(2024, 6, 15);

        let all = Period::All.resolve(today);
        assert!(all.start.is_none() && all.end.is_none());

        let last_30 = Period::Last30Days.resolve(today);
        assert_eq!(last_30.start, Some(date(2024, 5, 16)));
        assert_eq!(last_30.end, Some(today));

        let month = Period::CurrentMonth.resolve(today);
        assert_eq!(month.start, Some(date(2024, 6, 1)));
        assert_eq!(month.end, Some(today));

        let year = Period::CurrentYear.resolve(today);
        assert_eq!(year.start, Some(date(2024, 1, 1)));
        assert_eq!(year.end, Some(today));
    }

    #[test]
    fn period_labels() {
        let today = date(2024, 6, 15);
        assert_eq!(Period::All.describe(today).label, "Entire history");
        assert_eq!(
            Period::CurrentYear.describe(today).label,
            "From 2024-01-01 to 2024-06-15"
        );
    }

    #[test]
    fn summary_of_known_ledger() {
        // 4 income rows totaling 1000.00, 2 expense rows totaling 400.00.
        let summary = summarize(&totals(
            Decimal::new(100000, 2),
            4,
            Decimal::new(40000, 2),
            2,
        ));
        assert_eq!(summary.total_income, Decimal::new(100000, 2));
        assert_eq!(summary.total_expense, Decimal::new(40000, 2));
        assert_eq!(summary.net_balance, Decimal::new(60000, 2));
        assert_eq!(summary.average_income, Decimal::new(25000, 2));
        assert_eq!(summary.average_expense, Decimal::new(20000, 2));

        let kpis = compute_kpis(&summary);
        assert_eq!(kpis.financial_status, FinancialStatus::Positive);
        assert_eq!(kpis.balance_ratio, Decimal::new(6000, 2));
        assert_eq!(kpis.efficiency, kpis.balance_ratio);
    }

    #[test]
    fn empty_ledger_summary_has_no_division_error() {
        let summary = summarize(&totals(Decimal::ZERO, 0, Decimal::ZERO, 0));
        assert_eq!(summary.net_balance, Decimal::ZERO);
        assert_eq!(summary.average_income, Decimal::ZERO);
        assert_eq!(summary.average_expense, Decimal::ZERO);

        let kpis = compute_kpis(&summary);
        assert_eq!(kpis.financial_status, FinancialStatus::Negative);
        assert_eq!(kpis.balance_ratio, Decimal::ZERO);
    }

    #[test]
    fn zero_net_classifies_negative() {
        // Income equals expense; the rule is strictly net > 0.
        let summary = summarize(&totals(Decimal::new(50000, 2), 1, Decimal::new(50000, 2), 1));
        assert_eq!(summary.net_balance, Decimal::ZERO);
        assert_eq!(
            compute_kpis(&summary).financial_status,
            FinancialStatus::Negative
        );
    }

    #[test]
    fn aggregation_is_pure() {
        let input = totals(Decimal::new(123456, 2), 7, Decimal::new(65432, 2), 3);
        let first = summarize(&input);
        let second = summarize(&input);
        assert_eq!(first, second);
        assert_eq!(compute_kpis(&first), compute_kpis(&second));
    }

    #[test]
    fn merge_sorts_descending_and_keeps_all_ten() {
        // 5 income rows dated 01..05, 5 expense rows dated 03..07.
        let incomes: Vec<_> = (1..=5)
            .map(|d| {
                movement(
                    d,
                    MovementKind::Income,
                    Decimal::new(1000, 2),
                    date(2024, 1, d as u32),
                )
            })
            .collect();
        let expenses: Vec<_> = (3..=7)
            .map(|d| {
                movement(
                    100 + d,
                    MovementKind::Expense,
                    Decimal::new(500, 2),
                    date(2024, 1, d as u32),
                )
            })
            .collect();

        let feed = merge_recent(incomes, expenses, 10);
        assert_eq!(feed.len(), 10);
        assert_eq!(feed[0].date, date(2024, 1, 7));
        for pair in feed.windows(2) {
            assert!(pair[0].date >= pair[1].date);
        }
    }

    #[test]
    fn merge_negates_expenses_only() {
        let feed = merge_recent(
            vec![movement(
                1,
                MovementKind::Income,
                Decimal::new(1500, 2),
                date(2024, 2, 1),
            )],
            vec![movement(
                2,
                MovementKind::Expense,
                Decimal::new(700, 2),
                date(2024, 2, 2),
            )],
            10,
        );
        let income = feed.iter().find(|e| e.kind == MovementKind::Income).unwrap();
        let expense = feed.iter().find(|e| e.kind == MovementKind::Expense).unwrap();
        assert_eq!(income.amount, Decimal::new(1500, 2));
        assert_eq!(expense.amount, Decimal::new(-700, 2));
    }

    #[test]
    fn merge_truncates_to_cap() {
        let incomes: Vec<_> = (1..=8)
            .map(|i| {
                movement(
                    i,
                    MovementKind::Income,
                    Decimal::ONE,
                    date(2024, 3, i as u32),
                )
            })
            .collect();
        let expenses: Vec<_> = (1..=8)
            .map(|i| {
                movement(
                    100 + i,
                    MovementKind::Expense,
                    Decimal::ONE,
                    date(2024, 3, i as u32),
                )
            })
            .collect();
        assert_eq!(merge_recent(incomes, expenses, 10).len(), 10);
    }

    #[test]
    fn merge_keeps_fetch_order_on_date_ties() {
        let day = date(2024, 4, 10);
        let feed = merge_recent(
            vec![movement(1, MovementKind::Income, Decimal::ONE, day)],
            vec![movement(2, MovementKind::Expense, Decimal::ONE, day)],
            10,
        );
        // Stable sort: the income fetched first stays first.
        assert_eq!(feed[0].id, 1);
        assert_eq!(feed[1].id, 2);
    }
}
