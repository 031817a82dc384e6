use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::config::Settings;
use crate::db::Database;
use crate::error::LedgerError;
use crate::models::*;
use crate::report::{self, CategoryFilter, Dimension, FieldSelection, Format, ReportRequest};
use crate::util::{
    check_amount, format_amount, parse_timestamp, split_list, truncate, DISPLAY_FORMAT,
};

pub(crate) struct NewTransaction {
    pub amount: String,
    pub category: String,
    pub tags: String,
    pub notes: String,
    pub datetime: Option<String>,
    pub todo_id: Option<i64>,
}

pub(crate) struct TodoQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub tags: Option<String>,
    pub before: Option<String>,
    pub after: Option<String>,
}

pub(crate) struct ReportArgs {
    pub dimension: Dimension,
    pub start: Option<String>,
    pub end: Option<String>,
    pub category: Option<String>,
    pub fields: Option<String>,
    pub format: Option<String>,
}

fn parse_amount(s: &str) -> Result<Decimal, LedgerError> {
    let amount =
        Decimal::from_str(s.trim()).map_err(|_| LedgerError::InvalidAmount(s.to_string()))?;
    check_amount(amount)
}

fn parse_status(s: &str) -> Result<TodoStatus, LedgerError> {
    TodoStatus::parse(s).ok_or_else(|| LedgerError::InvalidStatus(s.to_string()))
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn display_ts(ts: &NaiveDateTime) -> String {
    ts.format(DISPLAY_FORMAT).to_string()
}

// ── Transactions ─────────────────────────────────────────────

pub(crate) fn tx_add(db: &mut Database, new: NewTransaction) -> Result<()> {
    let amount = parse_amount(&new.amount)?;
    let occurred_at = match new.datetime.as_deref() {
        Some(s) => parse_timestamp(s)?,
        None => now(),
    };

    let mut txn = Transaction::new(amount, new.category, occurred_at);
    txn.tags = new.tags;
    txn.notes = new.notes;
    txn.todo_id = new.todo_id;

    let id = db.insert_transaction(&txn)?;
    println!("交易已添加，ID: {id}");
    if let Some(todo_id) = txn.todo_id {
        println!("已关联待办事项ID: {todo_id}");
    }
    Ok(())
}

pub(crate) fn tx_list(
    db: &Database,
    month: Option<String>,
    category: Option<String>,
    tags: Option<String>,
    kind: Option<String>,
    with_todos: bool,
) -> Result<()> {
    let kind = match kind.as_deref() {
        Some(k) => Some(TransactionKind::parse(k).ok_or_else(|| {
            LedgerError::Validation(format!("类型无效，可选值：income, expense: {k}"))
        })?),
        None => None,
    };
    let filter = TransactionFilter {
        month,
        category,
        tags,
        kind,
    };
    let txns = db.list_transactions(&filter)?;
    if txns.is_empty() {
        println!("暂无交易记录");
        return Ok(());
    }

    println!(
        "{:<6} {:<19} {:<4} {:>14} {:<12} {:<16} {:<20} {}",
        "ID", "时间", "类型", "金额", "分类", "标签", "备注", "待办"
    );
    println!("{}", "-".repeat(110));
    for txn in &txns {
        let todo = match (txn.todo_id, with_todos) {
            (Some(id), true) => match db.get_todo(id)? {
                Some(todo) => format!("#{id} {}", truncate(&todo.content, 20)),
                None => format!("#{id}"),
            },
            (Some(id), false) => format!("#{id}"),
            (None, _) => "-".into(),
        };
        println!(
            "{:<6} {:<19} {:<4} {:>14} {:<12} {:<16} {:<20} {}",
            txn.id.unwrap_or_default(),
            display_ts(&txn.occurred_at),
            txn.kind(),
            format_amount(txn.amount),
            truncate(&txn.category, 12),
            truncate(&txn.tags, 16),
            truncate(&txn.notes, 20),
            todo
        );
    }

    let income: Decimal = txns.iter().filter(|t| t.is_income()).map(|t| t.amount).sum();
    let expense: Decimal = txns.iter().filter(|t| t.is_expense()).map(|t| t.abs_amount()).sum();
    println!("{}", "-".repeat(110));
    println!(
        "共 {} 笔  收入: {}  支出: {}",
        txns.len(),
        format_amount(income),
        format_amount(expense)
    );
    Ok(())
}

pub(crate) fn tx_update(
    db: &mut Database,
    id: i64,
    amount: Option<String>,
    category: Option<String>,
    tags: Option<String>,
    notes: Option<String>,
    todo_id: Option<i64>,
) -> Result<()> {
    let update = TransactionUpdate {
        amount: amount.as_deref().map(parse_amount).transpose()?,
        category,
        tags,
        notes,
    };
    let has_fields = update.amount.is_some()
        || update.category.is_some()
        || update.tags.is_some()
        || update.notes.is_some();
    if !has_fields && todo_id.is_none() {
        anyhow::bail!(LedgerError::Validation("未提供任何更新字段".into()));
    }

    if has_fields {
        db.update_transaction(id, &update)?;
    }
    match todo_id {
        Some(0) => {
            db.unlink_transaction(id)?;
        }
        Some(todo_id) => db.link_transaction_to_todo(id, todo_id)?,
        None => {}
    }

    let txn = db
        .get_transaction(id)?
        .ok_or_else(|| LedgerError::transaction_not_found(id))?;
    println!(
        "交易 {id} 已更新: {} {} {}",
        display_ts(&txn.occurred_at),
        format_amount(txn.amount),
        txn.category
    );
    Ok(())
}

pub(crate) fn tx_delete(db: &mut Database, id: i64) -> Result<()> {
    db.delete_transaction(id)?;
    println!("交易 {id} 已删除");
    Ok(())
}

pub(crate) fn tx_unlink(db: &mut Database, id: i64) -> Result<()> {
    db.unlink_transaction(id)?;
    println!("交易 {id} 已取消关联");
    Ok(())
}

// ── Todos ────────────────────────────────────────────────────

pub(crate) fn todo_add(
    db: &mut Database,
    content: String,
    category: String,
    tags: String,
    deadline: Option<String>,
    transaction_id: Option<i64>,
) -> Result<()> {
    let mut todo = Todo::new(content, category);
    todo.tags = tags;
    todo.deadline = deadline.as_deref().map(parse_timestamp).transpose()?;
    todo.transaction_id = transaction_id;

    let id = db.insert_todo(&todo)?;
    println!("待办事项已添加，ID: {id}");
    if let Some(txn_id) = transaction_id {
        println!("已关联交易ID: {txn_id}");
    }
    Ok(())
}

pub(crate) fn todo_list(db: &Database, query: TodoQuery, with_transactions: bool) -> Result<()> {
    let filter = TodoFilter {
        status: query.status.as_deref().map(parse_status).transpose()?,
        category: query.category,
        tags: query.tags,
        deadline_before: query.before.as_deref().map(parse_timestamp).transpose()?,
        deadline_after: query.after.as_deref().map(parse_timestamp).transpose()?,
    };
    let todos = db.list_todos(&filter)?;
    if todos.is_empty() {
        println!("暂无待办事项");
        return Ok(());
    }

    let current = now();
    println!(
        "{:<6} {:<6} {:<30} {:<12} {:<16} {:<19} {}",
        "ID", "状态", "内容", "分类", "标签", "截止时间", "交易"
    );
    println!("{}", "-".repeat(110));
    for todo in &todos {
        let deadline = match &todo.deadline {
            Some(d) if todo.is_overdue(current) => format!("{} !", display_ts(d)),
            Some(d) => display_ts(d),
            None => "-".into(),
        };
        let txn = match (todo.transaction_id, with_transactions) {
            (Some(id), true) => match db.get_transaction(id)? {
                Some(t) => format!("#{id} {} {}", format_amount(t.amount), t.category),
                None => format!("#{id}"),
            },
            (Some(id), false) => format!("#{id}"),
            (None, _) => "-".into(),
        };
        println!(
            "{:<6} {:<6} {:<30} {:<12} {:<16} {:<19} {}",
            todo.id.unwrap_or_default(),
            todo.status,
            truncate(&todo.content, 30),
            truncate(&todo.category, 12),
            truncate(&todo.tags, 16),
            deadline,
            txn
        );
    }

    println!("{}", "-".repeat(110));
    let counts: Vec<String> = TodoStatus::all()
        .iter()
        .map(|s| {
            let n = todos.iter().filter(|t| t.status == *s).count();
            format!("{}: {n}", s.label())
        })
        .collect();
    println!("共 {} 项  {}", todos.len(), counts.join("  "));
    Ok(())
}

pub(crate) fn todo_update(
    db: &mut Database,
    id: i64,
    content: Option<String>,
    category: Option<String>,
    tags: Option<String>,
    deadline: Option<String>,
    transaction_id: Option<i64>,
) -> Result<()> {
    let deadline = match deadline.as_deref().map(str::trim) {
        None => None,
        Some("" | "none") => Some(None),
        Some(s) => Some(Some(parse_timestamp(s)?)),
    };
    let update = TodoUpdate {
        content,
        category,
        tags,
        deadline,
    };
    let has_fields = update.content.is_some()
        || update.category.is_some()
        || update.tags.is_some()
        || update.deadline.is_some();
    if !has_fields && transaction_id.is_none() {
        anyhow::bail!(LedgerError::Validation("未提供任何更新字段".into()));
    }

    if has_fields {
        db.update_todo(id, &update)?;
    }
    match transaction_id {
        Some(0) => {
            db.unlink_todo(id)?;
        }
        Some(txn_id) => db.link_todo_to_transaction(id, txn_id)?,
        None => {}
    }

    let todo = db.get_todo(id)?.ok_or_else(|| LedgerError::todo_not_found(id))?;
    println!("待办事项 {id} 已更新: {} [{}]", todo.content, todo.status);
    Ok(())
}

pub(crate) fn todo_status(db: &mut Database, id: i64, status: &str) -> Result<()> {
    let todo = db.update_todo_status(id, parse_status(status)?)?;
    println!("待办事项 {id} 状态已更新为: {}", todo.status);
    Ok(())
}

pub(crate) fn todo_unlink(db: &mut Database, id: i64) -> Result<()> {
    db.unlink_todo(id)?;
    println!("待办事项 {id} 已取消关联");
    Ok(())
}

pub(crate) fn todo_delete(db: &mut Database, id: i64) -> Result<()> {
    db.delete_todo(id)?;
    println!("待办事项 {id} 已删除");
    Ok(())
}

// ── Reports ──────────────────────────────────────────────────

fn report_format(settings: &Settings, explicit: Option<&str>) -> Result<Format> {
    match explicit {
        Some(f) => Ok(Format::parse(f)?),
        None => settings
            .report_format()
            .context("Invalid default_format in settings"),
    }
}

pub(crate) fn report_generate(db: &Database, settings: &Settings, args: ReportArgs) -> Result<()> {
    // Fields and format are checked before anything touches the database.
    let fields = match args.fields.as_deref() {
        Some(f) => FieldSelection::parse(split_list(f))?,
        None => settings
            .report_fields()
            .context("Invalid default_fields in settings")?,
    };
    let format = report_format(settings, args.format.as_deref())?;

    let filter = args
        .category
        .as_deref()
        .and_then(|c| CategoryFilter::new(split_list(c)));
    let mut request = ReportRequest::new(args.dimension).categories(filter);
    if let Some(start) = args.start {
        request = request.start(start);
    }
    if let Some(end) = args.end {
        request = request.end(end);
    }
    let result = report::generate_report(db, &request)?;
    println!("{}", report::render(&result, format, &fields));
    Ok(())
}

pub(crate) fn report_monthly(
    db: &Database,
    settings: &Settings,
    month: Option<String>,
    format: Option<String>,
) -> Result<()> {
    let fields = settings
        .report_fields()
        .context("Invalid default_fields in settings")?;
    let format = report_format(settings, format.as_deref())?;

    let result = report::generate_monthly_report(db, month.as_deref())?;
    println!("{}", report::render(&result, format, &fields));
    Ok(())
}
