//! Period income/expense reports.
//!
//! A report resolves the requested window and the comparable window before
//! it, pulls transactions for both from a [`TransactionSource`], aggregates
//! them per category and compares the totals. [`render`] turns the result
//! into text or markdown.

mod aggregate;
mod render;
mod window;

use anyhow::Result;
use chrono::NaiveDateTime;
#[cfg(test)]
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::ReportError;
use crate::models::Transaction;

pub use aggregate::{
    aggregate, percent_change, Aggregation, CategoryAggregate, CategoryFilter, Totals,
};
pub use render::{render, Field, FieldSelection, Format};
pub use window::{
    baseline_window, month_bounds, parse_month, resolve_window, resolve_window_on, Dimension,
    ReportWindow,
};

/// Read access to stored transactions.
pub trait TransactionSource {
    /// Transactions with `start <= occurred_at <= end`, optionally limited to
    /// the filter's categories, ordered by `(occurred_at, id)`.
    fn query_transactions(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        categories: Option<&CategoryFilter>,
    ) -> Result<Vec<Transaction>>;
}

/// What to report on.
#[derive(Debug, Clone, Default)]
pub struct ReportRequest {
    pub dimension: Dimension,
    pub start: Option<String>,
    pub end: Option<String>,
    pub categories: Option<CategoryFilter>,
}

impl ReportRequest {
    pub fn new(dimension: Dimension) -> Self {
        Self {
            dimension,
            ..Self::default()
        }
    }

    pub fn start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn end(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }

    pub fn categories(mut self, categories: Option<CategoryFilter>) -> Self {
        self.categories = categories;
        self
    }
}

/// The baseline window's totals and the percent change of each metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub window: ReportWindow,
    pub baseline: Totals,
    /// `None` when the baseline income is zero.
    pub income_change: Option<Decimal>,
    pub expense_change: Option<Decimal>,
    pub balance_change: Option<Decimal>,
}

impl Comparison {
    fn new(window: ReportWindow, current: &Totals, baseline: Totals) -> Self {
        Self {
            window,
            income_change: percent_change(current.income, baseline.income),
            expense_change: percent_change(current.expense, baseline.expense),
            balance_change: percent_change(current.balance, baseline.balance),
            baseline,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportResult {
    pub dimension: Dimension,
    pub window: ReportWindow,
    pub totals: Totals,
    /// In order of first appearance within the window.
    pub categories: Vec<CategoryAggregate>,
    pub comparison: Option<Comparison>,
}

impl ReportResult {
    pub fn has_data(&self) -> bool {
        self.totals.count > 0
    }

    pub fn label(&self) -> &str {
        &self.window.label
    }

    /// Categories by `income + expense`, largest first. Ties keep their
    /// first-seen order.
    pub fn categories_by_total(&self) -> Vec<&CategoryAggregate> {
        let mut sorted: Vec<&CategoryAggregate> = self.categories.iter().collect();
        sorted.sort_by(|a, b| b.total().cmp(&a.total()));
        sorted
    }
}

pub fn generate_report<S>(source: &S, request: &ReportRequest) -> Result<ReportResult, ReportError>
where
    S: TransactionSource + ?Sized,
{
    let window = resolve_window(
        request.dimension,
        request.start.as_deref(),
        request.end.as_deref(),
    )?;
    build_report(source, request, window)
}

/// Like [`generate_report`], with windows resolved relative to `today`.
#[cfg(test)]
pub fn generate_report_on<S>(
    source: &S,
    request: &ReportRequest,
    today: NaiveDate,
) -> Result<ReportResult, ReportError>
where
    S: TransactionSource + ?Sized,
{
    let window = resolve_window_on(
        today,
        request.dimension,
        request.start.as_deref(),
        request.end.as_deref(),
    )?;
    build_report(source, request, window)
}

fn build_report<S>(
    source: &S,
    request: &ReportRequest,
    window: ReportWindow,
) -> Result<ReportResult, ReportError>
where
    S: TransactionSource + ?Sized,
{
    let dimension = request.dimension;
    let baseline = baseline_window(dimension, &window);
    let filter = request.categories.as_ref();

    let current = fetch(source, &window, filter)?;
    let previous = fetch(source, &baseline, filter)?;

    let Aggregation { totals, categories } = aggregate(&current, filter)?;
    let baseline_totals = aggregate(&previous, filter)?.totals;
    let comparison = Comparison::new(baseline, &totals, baseline_totals);

    Ok(ReportResult {
        dimension,
        window,
        totals,
        categories,
        comparison: Some(comparison),
    })
}

/// Monthly report for `month` (`YYYY-MM`), or the current month.
pub fn generate_monthly_report<S>(
    source: &S,
    month: Option<&str>,
) -> Result<ReportResult, ReportError>
where
    S: TransactionSource + ?Sized,
{
    generate_report(source, &monthly_request(month)?)
}

#[cfg(test)]
pub fn generate_monthly_report_on<S>(
    source: &S,
    month: Option<&str>,
    today: NaiveDate,
) -> Result<ReportResult, ReportError>
where
    S: TransactionSource + ?Sized,
{
    generate_report_on(source, &monthly_request(month)?, today)
}

fn monthly_request(month: Option<&str>) -> Result<ReportRequest, ReportError> {
    let mut request = ReportRequest::new(Dimension::Monthly);
    if let Some(month) = month {
        let first = parse_month(month)?;
        request = request.start(first.format("%Y-%m-%d").to_string());
    }
    Ok(request)
}

/// Query one window. Records the source returns outside the window are dropped.
fn fetch<S>(
    source: &S,
    window: &ReportWindow,
    filter: Option<&CategoryFilter>,
) -> Result<Vec<Transaction>, ReportError>
where
    S: TransactionSource + ?Sized,
{
    let mut records = source.query_transactions(window.start, window.end, filter)?;
    let returned = records.len();
    records.retain(|t| window.contains(t.occurred_at));
    if records.len() != returned {
        warn!(
            label = %window.label,
            dropped = returned - records.len(),
            "source returned transactions outside the window"
        );
    }
    debug!(label = %window.label, count = records.len(), "fetched transactions");
    Ok(records)
}
