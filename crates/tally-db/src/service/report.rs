//! # Reporting Service
//!
//! Loads the records of a local-date window and folds them with
//! [`tally_core::report::summarize`]. Read-only apart from recording
//! operating expenses.
//!
//! ```text
//! summarize(start, end)
//!   ├── ReportRange (config utc offset)      start > end → Validation
//!   ├── PAID transactions  [start, end_exclusive)
//!   ├── restock events     [start, end_exclusive)
//!   ├── expenses           [start, end_exclusive)
//!   ├── recipes + current item costs (COGS)
//!   └── summarize → Report
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use tally_core::costing::index_items;
use tally_core::report::{local_today, summarize, ReportInputs};
use tally_core::validation::{validate_name, validate_non_negative_amount};
use tally_core::{Expense, LedgerConfig, Money, Report, ReportPeriod, ReportRange};

use crate::error::ServiceResult;
use crate::pool::Database;

#[derive(Debug, Clone)]
pub struct ReportService {
    db: Database,
    config: LedgerConfig,
}

impl ReportService {
    pub fn new(db: Database, config: LedgerConfig) -> Self {
        ReportService { db, config }
    }

    /// Report over local days `start_date..=end_date`.
    ///
    /// ## Errors
    /// `Validation` when `start_date > end_date`.
    pub async fn summarize(&self, start_date: NaiveDate, end_date: NaiveDate) -> ServiceResult<Report> {
        let range = ReportRange::new(start_date, end_date, self.config.utc_offset())?;
        self.summarize_range(&range).await
    }

    /// Report over a preset period, resolved against the local day of `now`.
    pub async fn summarize_period(
        &self,
        period: ReportPeriod,
        now: DateTime<Utc>,
    ) -> ServiceResult<Report> {
        let offset = self.config.utc_offset();
        let range = period.range(local_today(now, offset), offset)?;
        self.summarize_range(&range).await
    }

    async fn summarize_range(&self, range: &ReportRange) -> ServiceResult<Report> {
        let (from, until) = (range.start(), range.end_exclusive());

        let transactions = self.db.transactions().list_paid_between(from, until).await?;
        let restocks = self.db.restocks().list_between(from, until).await?;
        let expenses = self.db.expenses().list_between(from, until).await?;
        let recipes = self.db.recipes().index().await?;
        let items = index_items(self.db.inventory().list().await?);

        debug!(
            start = %range.start_date,
            end = %range.end_date,
            transactions = transactions.len(),
            restocks = restocks.len(),
            expenses = expenses.len(),
            "Report inputs loaded"
        );

        Ok(summarize(
            range,
            ReportInputs {
                transactions: &transactions,
                restocks: &restocks,
                expenses: &expenses,
                recipes: &recipes,
                items: &items,
            },
        )?)
    }

    /// Records an operating expense (rent, utilities, ...).
    ///
    /// `incurred_at` defaults to now.
    pub async fn record_expense(
        &self,
        description: &str,
        total_cost: Money,
        incurred_at: Option<DateTime<Utc>>,
    ) -> ServiceResult<Expense> {
        validate_name("description", description)?;
        validate_non_negative_amount("total cost", total_cost)?;

        let expense = Expense {
            id: Uuid::new_v4().to_string(),
            description: description.trim().to_string(),
            total_cost,
            incurred_at: incurred_at.unwrap_or_else(Utc::now),
        };
        self.db.expenses().insert(&expense).await?;

        info!(id = %expense.id, total_cost = %total_cost, "Expense recorded");
        Ok(expense)
    }

    /// Expenses incurred on local days `start_date..=end_date`.
    pub async fn list_expenses(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> ServiceResult<Vec<Expense>> {
        let range = ReportRange::new(start_date, end_date, self.config.utc_offset())?;
        Ok(self
            .db
            .expenses()
            .list_between(range.start(), range.end_exclusive())
            .await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::coffee_shop;
    use crate::service::Tally;
    use chrono::Duration;
    use tally_core::{CartLine, ErrorKind, PaymentMethod, Session};

    async fn busy_day(tally: &Tally) {
        let shift = tally.shifts().open("u2", Money::from_minor(100_000)).await.unwrap();
        let session = Session::for_shift(&shift);
        let sales = tally.sales();

        sales
            .commit_sale(&session, &[CartLine::new("p1", 2)], PaymentMethod::Cash, Money::from_minor(50_000))
            .await
            .unwrap();
        sales
            .commit_sale(&session, &[CartLine::new("p3", 1)], PaymentMethod::Qris, Money::zero())
            .await
            .unwrap();
        tally
            .ledger()
            .apply_restock("i1", 500, Money::from_minor(150_000))
            .await
            .unwrap();
        tally
            .reports()
            .record_expense("Electricity", Money::from_minor(50_000), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_report_totals() {
        let tally = coffee_shop(LedgerConfig::default()).await;
        busy_day(&tally).await;

        let today = Utc::now().date_naive();
        let report = tally.reports().summarize(today, today).await.unwrap();

        // 2 × 18 000 + 25 000
        assert_eq!(report.gross_sales, Money::from_minor(61_000));
        // Kopi Susu: 15×300 + 100×20 + 20×50 + 1×800 = 8 300 per cup; croissant has no recipe
        assert_eq!(report.cogs, Money::from_minor(16_600));
        assert_eq!(report.expenses, Money::from_minor(200_000));
        assert_eq!(
            report.net_profit,
            report.gross_sales - report.cogs - report.expenses
        );
        assert_eq!(report.transaction_count, 2);
        assert_eq!(report.daily_breakdown.len(), 1);
        assert_eq!(report.daily_breakdown[0].gross_profit, Money::from_minor(44_400));

        let top: Vec<_> = report.top_products.iter().map(|p| (p.product_id.as_str(), p.units)).collect();
        assert_eq!(top, vec![("p1", 2), ("p3", 1)]);
    }

    #[tokio::test]
    async fn test_report_is_idempotent() {
        let tally = coffee_shop(LedgerConfig::default()).await;
        busy_day(&tally).await;

        let reports = tally.reports();
        let now = Utc::now();
        let first = reports.summarize_period(ReportPeriod::ThisMonth, now).await.unwrap();
        let second = reports.summarize_period(ReportPeriod::ThisMonth, now).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_empty_range() {
        let tally = coffee_shop(LedgerConfig::default()).await;
        busy_day(&tally).await;

        let past = Utc::now().date_naive() - Duration::days(30);
        let report = tally.reports().summarize(past, past).await.unwrap();

        assert_eq!(report.gross_sales, Money::zero());
        assert_eq!(report.expenses, Money::zero());
        assert_eq!(report.net_profit, Money::zero());
        assert!(report.daily_breakdown.is_empty());
        assert!(report.top_products.is_empty());
    }

    #[tokio::test]
    async fn test_inverted_range_rejected() {
        let tally = coffee_shop(LedgerConfig::default()).await;
        let today = Utc::now().date_naive();

        let err = tally
            .reports()
            .summarize(today, today - Duration::days(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_window_follows_utc_offset() {
        // UTC+7: 23:30 UTC on the 1st is 06:30 local on the 2nd
        let tally = coffee_shop(LedgerConfig::default().with_utc_offset_minutes(7 * 60)).await;
        let reports = tally.reports();
        let at = "2026-03-01T23:30:00Z".parse::<DateTime<Utc>>().unwrap();
        reports
            .record_expense("Rent", Money::from_minor(1_000_000), Some(at))
            .await
            .unwrap();

        let first = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let second = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert!(reports.list_expenses(first, first).await.unwrap().is_empty());
        assert_eq!(reports.list_expenses(second, second).await.unwrap().len(), 1);

        let report = reports.summarize(second, second).await.unwrap();
        assert_eq!(report.expenses, Money::from_minor(1_000_000));
        assert_eq!(report.net_profit, Money::from_minor(-1_000_000));
    }

    #[tokio::test]
    async fn test_expense_validation() {
        let tally = coffee_shop(LedgerConfig::default()).await;
        let err = tally
            .reports()
            .record_expense("  ", Money::from_minor(10), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = tally
            .reports()
            .record_expense("Gas", Money::from_minor(-10), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
