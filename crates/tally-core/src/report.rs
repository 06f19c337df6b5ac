//! # Reporting Aggregator
//!
//! Sales, COGS, expense and profit summaries over a range of local calendar
//! days. Pure: the caller loads records, this module only folds them.
//!
//! ## Window
//! ```text
//!  start_date 00:00:00 (local)                 end_date 23:59:59.999… (local)
//!        │◄──────────────────── included ─────────────────────►│
//!        ▼                                                      ▼
//!  ──────┼──────────────────────────────────────────────────────┼──────► UTC
//!     start (UTC)                                      end_exclusive (UTC)
//!
//!  local = UTC + utc_offset_minutes (fixed offset, no DST rules)
//! ```
//!
//! ## Identity
//! `net_profit = gross_sales − cogs − expenses`, exactly, for every range
//! including the empty one.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::costing::{line_cogs, ItemIndex};
use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Expense, Recipe, RestockEvent, Transaction, TransactionStatus};
use crate::validation::validate_date_range;

/// Maximum entries in [`Report::top_products`].
pub const TOP_PRODUCTS_LIMIT: usize = 5;

// =============================================================================
// Range
// =============================================================================

/// Inclusive range of local calendar days, resolved to UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub offset: FixedOffset,
    start: DateTime<Utc>,
    end_exclusive: DateTime<Utc>,
}

impl ReportRange {
    /// ## Errors
    /// `Validation(InvertedRange)` when `start_date > end_date`.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, offset: FixedOffset) -> CoreResult<Self> {
        validate_date_range(start_date, end_date)?;

        let day_after = end_date
            .succ_opt()
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "end date".to_string(),
                reason: "no day after the end date".to_string(),
            })?;

        Ok(ReportRange {
            start_date,
            end_date,
            offset,
            start: local_midnight_utc(start_date, offset),
            end_exclusive: local_midnight_utc(day_after, offset),
        })
    }

    /// First included instant.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// First instant after the range.
    pub fn end_exclusive(&self) -> DateTime<Utc> {
        self.end_exclusive
    }

    #[inline]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end_exclusive
    }

    /// Local calendar day of an instant.
    pub fn local_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.offset).date_naive()
    }
}

fn local_midnight_utc(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::MIN);
    let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
    Utc.from_utc_datetime(&utc)
}

/// Local calendar day of `now` at `offset`.
pub fn local_today(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

// =============================================================================
// Period Presets
// =============================================================================

/// Common report ranges as picked in the report filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ReportPeriod {
    Today,
    Yesterday,
    /// Monday of the current week through today.
    ThisWeek,
    /// First of the current month through today.
    ThisMonth,
    Custom {
        #[ts(as = "String")]
        start: NaiveDate,
        #[ts(as = "String")]
        end: NaiveDate,
    },
}

impl ReportPeriod {
    /// Resolves the preset to `(start_date, end_date)` relative to `today`.
    pub fn resolve(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match *self {
            ReportPeriod::Today => (today, today),
            ReportPeriod::Yesterday => {
                let yesterday = today.pred_opt().unwrap_or(today);
                (yesterday, yesterday)
            }
            ReportPeriod::ThisWeek => {
                let back = i64::from(today.weekday().num_days_from_monday());
                (today - Duration::days(back), today)
            }
            ReportPeriod::ThisMonth => (today.with_day(1).unwrap_or(today), today),
            ReportPeriod::Custom { start, end } => (start, end),
        }
    }

    /// Resolves and validates against `today`.
    pub fn range(&self, today: NaiveDate, offset: FixedOffset) -> CoreResult<ReportRange> {
        let (start, end) = self.resolve(today);
        ReportRange::new(start, end, offset)
    }
}

// =============================================================================
// Report
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailyBreakdown {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub sales: Money,
    pub cogs: Money,
    pub gross_profit: Money,
    pub transaction_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TopProduct {
    pub product_id: String,
    /// Name from the most recent sale snapshot in the range.
    pub name: String,
    pub units: i64,
    pub revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Report {
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    pub gross_sales: Money,
    pub cogs: Money,
    /// Restock purchases plus operating expenses.
    pub expenses: Money,
    pub net_profit: Money,
    pub transaction_count: i64,
    pub daily_breakdown: Vec<DailyBreakdown>,
    pub top_products: Vec<TopProduct>,
}

impl Report {
    pub fn gross_profit(&self) -> Money {
        self.gross_sales - self.cogs
    }
}

/// Everything a report is computed from.
#[derive(Debug, Clone, Copy)]
pub struct ReportInputs<'a> {
    pub transactions: &'a [Transaction],
    pub restocks: &'a [RestockEvent],
    pub expenses: &'a [Expense],
    pub recipes: &'a HashMap<String, Recipe>,
    pub items: &'a ItemIndex,
}

#[derive(Default)]
struct DayTotals {
    sales: Money,
    cogs: Money,
    count: i64,
}

struct ProductTotals {
    name: String,
    units: i64,
    revenue: Money,
}

/// Folds the records inside `range` into a [`Report`].
///
/// Records outside the window (and non-PAID transactions) are ignored, so
/// callers may pass a superset.
///
/// ## Errors
/// `Validation(OutOfRange)` if a line total or its COGS overflows.
pub fn summarize(range: &ReportRange, inputs: ReportInputs<'_>) -> CoreResult<Report> {
    let mut sales: Vec<&Transaction> = inputs
        .transactions
        .iter()
        .filter(|tx| tx.status == TransactionStatus::Paid && range.contains(tx.created_at))
        .collect();
    // stable: equal timestamps keep insertion order
    sales.sort_by_key(|tx| tx.created_at);

    let mut gross_sales = Money::zero();
    let mut cogs = Money::zero();
    let mut days: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();
    let mut products: HashMap<&str, ProductTotals> = HashMap::new();

    for tx in &sales {
        let day = days.entry(range.local_date(tx.created_at)).or_default();
        day.count += 1;

        for line in &tx.lines {
            let revenue = line.line_total()?;
            let line_cost =
                line_cogs(inputs.recipes.get(&line.product_id), line.qty, inputs.items)?;

            gross_sales += revenue;
            cogs += line_cost;
            day.sales += revenue;
            day.cogs += line_cost;

            let entry = products
                .entry(line.product_id.as_str())
                .or_insert_with(|| ProductTotals {
                    name: String::new(),
                    units: 0,
                    revenue: Money::zero(),
                });
            entry.name = line.product.name.clone();
            entry.units += line.qty;
            entry.revenue += revenue;
        }
    }

    let restock_cost: Money = inputs
        .restocks
        .iter()
        .filter(|r| range.contains(r.timestamp))
        .map(|r| r.total_cost)
        .sum();
    let operating_cost: Money = inputs
        .expenses
        .iter()
        .filter(|e| range.contains(e.incurred_at))
        .map(|e| e.total_cost)
        .sum();
    let expenses = restock_cost + operating_cost;

    let daily_breakdown = days
        .into_iter()
        .map(|(date, t)| DailyBreakdown {
            date,
            sales: t.sales,
            cogs: t.cogs,
            gross_profit: t.sales - t.cogs,
            transaction_count: t.count,
        })
        .collect();

    let mut top_products: Vec<TopProduct> = products
        .into_iter()
        .map(|(id, t)| TopProduct {
            product_id: id.to_string(),
            name: t.name,
            units: t.units,
            revenue: t.revenue,
        })
        .collect();
    top_products.sort_by(|a, b| {
        b.units
            .cmp(&a.units)
            .then_with(|| b.revenue.cmp(&a.revenue))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    top_products.truncate(TOP_PRODUCTS_LIMIT);

    Ok(Report {
        start_date: range.start_date,
        end_date: range.end_date,
        gross_sales,
        cogs,
        expenses,
        net_profit: gross_sales - cogs - expenses,
        transaction_count: sales.len() as i64,
        daily_breakdown,
        top_products,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
