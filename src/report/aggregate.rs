use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::error::ReportError;
use crate::models::Transaction;

/// Allow-list of exact category names. Records outside it are dropped, not bucketed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFilter {
    names: Vec<String>,
}

impl CategoryFilter {
    /// Trims names and drops empty or repeated ones. Returns `None` when
    /// nothing is left, which means "no filter".
    pub fn new<I, S>(names: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut kept: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if !name.is_empty() && !kept.iter().any(|k| k == name) {
                kept.push(name.to_string());
            }
        }
        if kept.is_empty() {
            None
        } else {
            Some(Self { names: kept })
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, category: &str) -> bool {
        self.names.iter().any(|n| n == category)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Totals {
    pub income: Decimal,
    /// Stored positive.
    pub expense: Decimal,
    pub balance: Decimal,
    pub count: usize,
}

impl Totals {
    fn record(&mut self, amount: Decimal) -> Result<(), ReportError> {
        if amount > Decimal::ZERO {
            self.income = checked_sum(self.income, amount)?;
        } else if amount < Decimal::ZERO {
            self.expense = checked_sum(self.expense, amount.abs())?;
        }
        self.balance = self
            .income
            .checked_sub(self.expense)
            .ok_or(ReportError::AmountOverflow)?;
        self.count += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryAggregate {
    pub category: String,
    pub income: Decimal,
    pub expense: Decimal,
    pub count: usize,
    /// Percent of the window's total income, unrounded.
    pub income_share: Decimal,
    /// Percent of the window's total expense, unrounded.
    pub expense_share: Decimal,
}

impl CategoryAggregate {
    fn new(category: String) -> Self {
        Self {
            category,
            income: Decimal::ZERO,
            expense: Decimal::ZERO,
            count: 0,
            income_share: Decimal::ZERO,
            expense_share: Decimal::ZERO,
        }
    }

    fn record(&mut self, amount: Decimal) -> Result<(), ReportError> {
        if amount > Decimal::ZERO {
            self.income = checked_sum(self.income, amount)?;
        } else if amount < Decimal::ZERO {
            self.expense = checked_sum(self.expense, amount.abs())?;
        }
        self.count += 1;
        Ok(())
    }

    /// Income plus expense; the key categories are ranked by. Bounded by the
    /// window's income plus expense, which [`aggregate`] has checked.
    pub fn total(&self) -> Decimal {
        self.income.saturating_add(self.expense)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub totals: Totals,
    /// In order of first appearance.
    pub categories: Vec<CategoryAggregate>,
}

/// Fails with [`ReportError::AmountOverflow`] when a sum leaves the range
/// `Decimal` can represent.
pub fn aggregate(
    records: &[Transaction],
    filter: Option<&CategoryFilter>,
) -> Result<Aggregation, ReportError> {
    let mut totals = Totals::default();
    let mut categories: Vec<CategoryAggregate> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    let kept = records
        .iter()
        .filter(|t| filter.map_or(true, |f| f.contains(&t.category)));

    for txn in kept {
        totals.record(txn.amount)?;

        let idx = *index.entry(txn.category.as_str()).or_insert_with(|| {
            categories.push(CategoryAggregate::new(txn.category.clone()));
            categories.len() - 1
        });
        categories[idx].record(txn.amount)?;
    }
    // Every category total is at most this.
    checked_sum(totals.income, totals.expense)?;

    for agg in &mut categories {
        agg.income_share = share(agg.income, totals.income)?;
        agg.expense_share = share(agg.expense, totals.expense)?;
    }

    Ok(Aggregation { totals, categories })
}

fn checked_sum(a: Decimal, b: Decimal) -> Result<Decimal, ReportError> {
    a.checked_add(b).ok_or(ReportError::AmountOverflow)
}

/// `part` as a percentage of `total`; zero when `total` is zero.
fn share(part: Decimal, total: Decimal) -> Result<Decimal, ReportError> {
    if total.is_zero() {
        return Ok(Decimal::ZERO);
    }
    part.checked_div(total)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or(ReportError::AmountOverflow)
}

/// Percent change from `baseline` to `current`, rounded to 2 places.
/// `None` when the baseline is zero or the change is not representable.
pub fn percent_change(current: Decimal, baseline: Decimal) -> Option<Decimal> {
    if baseline.is_zero() {
        return None;
    }
    current
        .checked_sub(baseline)?
        .checked_div(baseline)?
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|pct| pct.round_dp(2))
}

#[cfg(test)]
#[path = "aggregate_tests.rs"]
mod aggregate_tests;
