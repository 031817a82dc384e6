//! Turns a [`ReportResult`] into the text or markdown shown to the user.

use rust_decimal::Decimal;

use super::{Comparison, ReportResult};
use crate::error::ReportError;

const RULE_WIDTH: usize = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Text,
    Markdown,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Markdown => "markdown",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ReportError> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "markdown" | "md" => Ok(Self::Markdown),
            _ => Err(ReportError::InvalidFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A column a caller may ask for. Only `Amount` and `Count` change what a
/// category summary shows; the rest are accepted for compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Amount,
    Category,
    TodoId,
    Date,
    Description,
    Count,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Amount => "金额",
            Self::Category => "分类",
            Self::TodoId => "待办 ID",
            Self::Date => "日期",
            Self::Description => "交易描述",
            Self::Count => "笔数",
        }
    }

    fn alias(&self) -> &'static str {
        match self {
            Self::Amount => "amount",
            Self::Category => "category",
            Self::TodoId => "todo_id",
            Self::Date => "date",
            Self::Description => "description",
            Self::Count => "count",
        }
    }

    const ALL: [Field; 6] = [
        Self::Amount,
        Self::Category,
        Self::TodoId,
        Self::Date,
        Self::Description,
        Self::Count,
    ];

    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.label() == token || f.alias().eq_ignore_ascii_case(token))
    }
}

/// A validated set of requested fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelection {
    fields: Vec<Field>,
}

impl Default for FieldSelection {
    fn default() -> Self {
        Self {
            fields: vec![Field::Amount, Field::Category, Field::Date],
        }
    }
}

impl FieldSelection {
    /// Validates every token. Blank tokens are skipped; an empty selection
    /// falls back to the default fields.
    pub fn parse<I, S>(tokens: I) -> Result<Self, ReportError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut fields = Vec::new();
        for token in tokens {
            let token = token.as_ref();
            if token.trim().is_empty() {
                continue;
            }
            let field =
                Field::parse(token).ok_or_else(|| ReportError::InvalidField(token.to_string()))?;
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        if fields.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }

    pub fn shows_amount(&self) -> bool {
        self.contains(Field::Amount)
    }

    pub fn shows_count(&self) -> bool {
        self.contains(Field::Count)
    }
}

pub fn render(report: &ReportResult, format: Format, fields: &FieldSelection) -> String {
    if !report.has_data() {
        let heading = heading(report);
        return match format {
            Format::Text => format!("{heading}\n\n暂无数据"),
            Format::Markdown => format!("# {heading}\n\n暂无数据"),
        };
    }
    match format {
        Format::Text => render_text(report, fields),
        Format::Markdown => render_markdown(report, fields),
    }
}

fn heading(report: &ReportResult) -> String {
    format!("{} 收支报表", report.label())
}

fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

fn share(value: Decimal) -> String {
    format!("{:.1}%", value.round_dp(1))
}

fn change(value: Decimal) -> String {
    let sign = if value >= Decimal::ZERO { "+" } else { "" };
    format!("{sign}{}%", money(value))
}

type MetricRow = (&'static str, Decimal, Option<(Decimal, Option<Decimal>)>);

/// (label, current, (baseline, change)) for the three money metrics.
fn metric_rows(report: &ReportResult) -> [MetricRow; 3] {
    let cmp: Option<&Comparison> = report.comparison.as_ref();
    [
        (
            "总收入",
            report.totals.income,
            cmp.map(|c| (c.baseline.income, c.income_change)),
        ),
        (
            "总支出",
            report.totals.expense,
            cmp.map(|c| (c.baseline.expense, c.expense_change)),
        ),
        (
            "结余",
            report.totals.balance,
            cmp.map(|c| (c.baseline.balance, c.balance_change)),
        ),
    ]
}

fn baseline_label(report: &ReportResult) -> &str {
    report
        .comparison
        .as_ref()
        .map_or("无", |c| c.window.label.as_str())
}

fn render_text(report: &ReportResult, fields: &FieldSelection) -> String {
    let mut lines = vec![heading(report), "=".repeat(RULE_WIDTH)];

    for (label, current, baseline) in metric_rows(report) {
        lines.push(format!("{label}: {}", money(current)));
        if let Some((base, Some(pct))) = baseline {
            lines.push(format!("  环比: {} (上期: {})", change(pct), money(base)));
        }
    }
    lines.push(format!("交易笔数: {}", report.totals.count));
    lines.push(format!("对比周期: {}", baseline_label(report)));

    lines.push(String::new());
    lines.push("分类统计:".into());
    lines.push("-".repeat(RULE_WIDTH));
    for cat in report.categories_by_total() {
        lines.push(format!("{}:", cat.category));
        if fields.shows_amount() {
            lines.push(format!(
                "  收入: {} ({})",
                money(cat.income),
                share(cat.income_share)
            ));
            lines.push(format!(
                "  支出: {} ({})",
                money(cat.expense),
                share(cat.expense_share)
            ));
            lines.push(format!("  总金额: {}", money(cat.total())));
        }
        if fields.shows_count() {
            lines.push(format!("  笔数: {}", cat.count));
        }
        lines.push("-".repeat(RULE_WIDTH));
    }

    lines.join("\n")
}

fn table_row<S: AsRef<str>>(cells: &[S]) -> String {
    let cells: Vec<&str> = cells.iter().map(AsRef::as_ref).collect();
    format!("| {} |", cells.join(" | "))
}

fn render_markdown(report: &ReportResult, fields: &FieldSelection) -> String {
    let mut lines = vec![format!("# {}", heading(report)), String::new()];

    lines.push("## 汇总信息".into());
    lines.push("| 项目 | 当前周期 | 上期同期 | 环比变化 |".into());
    lines.push("|-----|--------|--------|--------|".into());
    for (label, current, baseline) in metric_rows(report) {
        let (base, pct) = match baseline {
            Some((base, pct)) => (money(base), pct.map_or_else(|| "-".into(), change)),
            None => ("-".into(), "-".into()),
        };
        lines.push(table_row(&[label.to_string(), money(current), base, pct]));
    }
    lines.push(table_row(&[
        "交易笔数".to_string(),
        report.totals.count.to_string(),
        "-".into(),
        "-".into(),
    ]));
    lines.push(table_row(&["对比周期", baseline_label(report), "-", "-"]));
    lines.push(String::new());

    lines.push("## 分类统计".into());
    let mut headers = vec!["分类"];
    if fields.shows_amount() {
        headers.extend(["收入", "收入占比", "支出", "支出占比", "总金额"]);
    }
    if fields.shows_count() {
        headers.push("笔数");
    }
    lines.push(table_row(&headers));
    lines.push(table_row(&vec!["-----"; headers.len()]));

    for cat in report.categories_by_total() {
        let mut row = vec![cat.category.clone()];
        if fields.shows_amount() {
            row.extend([
                money(cat.income),
                share(cat.income_share),
                money(cat.expense),
                share(cat.expense_share),
                money(cat.total()),
            ]);
        }
        if fields.shows_count() {
            row.push(cat.count.to_string());
        }
        lines.push(table_row(&row));
    }

    lines.join("\n")
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod render_tests;
