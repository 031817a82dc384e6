use chrono::NaiveDateTime;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: Option<i64>,
    /// Positive for income, negative for expense.
    pub amount: Decimal,
    pub category: String,
    /// Comma-separated, free-form.
    pub tags: String,
    pub notes: String,
    pub occurred_at: NaiveDateTime,
    pub todo_id: Option<i64>,
    pub updated_at: String,
}

impl Transaction {
    pub fn new(amount: Decimal, category: String, occurred_at: NaiveDateTime) -> Self {
        Self {
            id: None,
            amount,
            category,
            tags: String::new(),
            notes: String::new(),
            occurred_at,
            todo_id: None,
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_income(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_expense(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    pub fn abs_amount(&self) -> Decimal {
        self.amount.abs()
    }

    pub fn kind(&self) -> &'static str {
        if self.is_income() {
            "收入"
        } else {
            "支出"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }
}

/// Predicates for listing transactions. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Format: "YYYY-MM"
    pub month: Option<String>,
    pub category: Option<String>,
    /// Matches when any of the comma-separated tags is contained in the row's tags.
    pub tags: Option<String>,
    pub kind: Option<TransactionKind>,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct TransactionUpdate {
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub tags: Option<String>,
    pub notes: Option<String>,
}
