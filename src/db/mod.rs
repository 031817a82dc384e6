mod schema;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::LedgerError;
use crate::models::*;
use crate::report::{self, CategoryFilter, TransactionSource};
use crate::util::{check_amount, format_timestamp, TIMESTAMP_FORMAT};

const TXN_COLUMNS: &str = "id, amount, category, tags, notes, occurred_at, todo_id, updated_at";
const TODO_COLUMNS: &str =
    "id, content, category, tags, deadline, status, transaction_id, created_at, updated_at";

/// Which side of a link is being (re)assigned. The other side must be free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkSubject {
    Transaction,
    Todo,
}

pub(crate) struct Database {
    conn: Connection,
}

impl Database {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("Failed to set database pragmas")?;
        let mut db = Self { conn };
        db.migrate().context("Database migration failed")?;
        debug!(path = %path.display(), "database opened");
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&mut self) -> Result<()> {
        let has_version_table: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !has_version_table {
            self.conn.execute_batch(schema::SCHEMA_V1)?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::CURRENT_VERSION],
            )?;
            info!(version = schema::CURRENT_VERSION, "initialized database schema");
            return Ok(());
        }

        let current: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?
            .unwrap_or(0);

        for &(from_version, sql) in schema::MIGRATIONS {
            if current <= from_version {
                self.conn.execute_batch(sql)?;
            }
        }

        if current < schema::CURRENT_VERSION {
            self.conn.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::CURRENT_VERSION],
            )?;
            info!(
                from = current,
                to = schema::CURRENT_VERSION,
                "migrated database schema"
            );
        }

        Ok(())
    }

    // ── Transactions ──────────────────────────────────────────

    /// Insert a transaction, linking it to `txn.todo_id` when set. The todo
    /// must exist and must not be linked to another transaction.
    pub(crate) fn insert_transaction(&mut self, txn: &Transaction) -> Result<i64> {
        check_amount(txn.amount)?;
        let category = txn.category.trim();
        if category.is_empty() {
            return Err(LedgerError::Validation("分类为必填项".into()).into());
        }

        let tx = self.conn.transaction()?;
        if let Some(todo_id) = txn.todo_id {
            match todo_link(&tx, todo_id)? {
                None => return Err(LedgerError::todo_not_found(todo_id).into()),
                Some(Some(other)) => {
                    return Err(LedgerError::AlreadyLinked {
                        entity: "待办事项",
                        id: todo_id,
                        other: "交易",
                        other_id: other,
                    }
                    .into())
                }
                Some(None) => {}
            }
        }

        tx.execute(
            "INSERT INTO transactions (amount, category, tags, notes, occurred_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                txn.amount.to_string(),
                category,
                txn.tags.trim(),
                txn.notes.trim(),
                format_timestamp(&txn.occurred_at),
                txn.updated_at,
            ],
        )?;
        let id = tx.last_insert_rowid();
        if let Some(todo_id) = txn.todo_id {
            write_link(&tx, id, todo_id)?;
        }
        tx.commit()?;

        info!(id, amount = %txn.amount, category, "inserted transaction");
        Ok(id)
    }

    pub(crate) fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let sql = format!("SELECT {TXN_COLUMNS} FROM transactions WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], row_to_transaction)
            .optional()?)
    }

    pub(crate) fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let mut sql = format!("SELECT {TXN_COLUMNS} FROM transactions WHERE 1=1");
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(m) = &filter.month {
            let (start, end) = report::month_bounds(m)?;
            sql.push_str(&format!(
                " AND occurred_at >= ?{} AND occurred_at <= ?{}",
                param_values.len() + 1,
                param_values.len() + 2
            ));
            param_values.push(Box::new(format_timestamp(&start)));
            param_values.push(Box::new(format_timestamp(&end)));
        }
        if let Some(c) = &filter.category {
            sql.push_str(&format!(" AND category = ?{}", param_values.len() + 1));
            param_values.push(Box::new(c.trim().to_string()));
        }
        if let Some(tags) = &filter.tags {
            push_tag_filter(&mut sql, &mut param_values, tags);
        }
        match filter.kind {
            Some(TransactionKind::Income) => sql.push_str(" AND CAST(amount AS REAL) > 0"),
            Some(TransactionKind::Expense) => sql.push_str(" AND CAST(amount AS REAL) < 0"),
            None => {}
        }

        sql.push_str(" ORDER BY occurred_at DESC, id DESC");

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_ref.as_slice(), row_to_transaction)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn update_transaction(
        &self,
        id: i64,
        update: &TransactionUpdate,
    ) -> Result<Transaction> {
        if self.get_transaction(id)?.is_none() {
            return Err(LedgerError::transaction_not_found(id).into());
        }

        let mut sets: Vec<String> = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(amount) = update.amount {
            check_amount(amount)?;
            param_values.push(Box::new(amount.to_string()));
            sets.push(format!("amount = ?{}", param_values.len()));
        }
        if let Some(category) = &update.category {
            let category = category.trim();
            if category.is_empty() {
                return Err(LedgerError::Validation("分类不能为空".into()).into());
            }
            param_values.push(Box::new(category.to_string()));
            sets.push(format!("category = ?{}", param_values.len()));
        }
        if let Some(tags) = &update.tags {
            param_values.push(Box::new(tags.trim().to_string()));
            sets.push(format!("tags = ?{}", param_values.len()));
        }
        if let Some(notes) = &update.notes {
            param_values.push(Box::new(notes.trim().to_string()));
            sets.push(format!("notes = ?{}", param_values.len()));
        }

        param_values.push(Box::new(chrono::Utc::now().to_rfc3339()));
        sets.push(format!("updated_at = ?{}", param_values.len()));
        param_values.push(Box::new(id));

        let sql = format!(
            "UPDATE transactions SET {} WHERE id = ?{}",
            sets.join(", "),
            param_values.len()
        );
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        self.conn.execute(&sql, params_ref.as_slice())?;
        info!(id, "updated transaction");

        self.get_transaction(id)?
            .ok_or_else(|| LedgerError::transaction_not_found(id).into())
    }

    pub(crate) fn delete_transaction(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        clear_transaction_link(&tx, id)?;
        let deleted = tx.execute("DELETE FROM transactions WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(LedgerError::transaction_not_found(id).into());
        }
        tx.commit()?;
        info!(id, "deleted transaction");
        Ok(())
    }

    // ── Todos ─────────────────────────────────────────────────

    /// Insert a todo, linking it to `todo.transaction_id` when set. The
    /// transaction must exist and must not be linked to another todo.
    pub(crate) fn insert_todo(&mut self, todo: &Todo) -> Result<i64> {
        let content = todo.content.trim();
        if content.is_empty() {
            return Err(LedgerError::Validation("待办内容为必填项".into()).into());
        }
        let category = todo.category.trim();
        if category.is_empty() {
            return Err(LedgerError::Validation("分类为必填项".into()).into());
        }

        let tx = self.conn.transaction()?;
        if let Some(txn_id) = todo.transaction_id {
            match transaction_link(&tx, txn_id)? {
                None => return Err(LedgerError::transaction_not_found(txn_id).into()),
                Some(Some(other)) => {
                    return Err(LedgerError::AlreadyLinked {
                        entity: "交易",
                        id: txn_id,
                        other: "待办事项",
                        other_id: other,
                    }
                    .into())
                }
                Some(None) => {}
            }
        }

        tx.execute(
            "INSERT INTO todos (content, category, tags, deadline, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                content,
                category,
                todo.tags.trim(),
                todo.deadline.as_ref().map(format_timestamp),
                todo.status.as_str(),
                todo.created_at,
                todo.updated_at,
            ],
        )?;
        let id = tx.last_insert_rowid();
        if let Some(txn_id) = todo.transaction_id {
            write_link(&tx, txn_id, id)?;
        }
        tx.commit()?;

        info!(id, category, "inserted todo");
        Ok(id)
    }

    pub(crate) fn get_todo(&self, id: i64) -> Result<Option<Todo>> {
        let sql = format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], row_to_todo)
            .optional()?)
    }

    pub(crate) fn list_todos(&self, filter: &TodoFilter) -> Result<Vec<Todo>> {
        let mut sql = format!("SELECT {TODO_COLUMNS} FROM todos WHERE 1=1");
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            sql.push_str(&format!(" AND status = ?{}", param_values.len() + 1));
            param_values.push(Box::new(status.as_str()));
        }
        if let Some(c) = &filter.category {
            sql.push_str(&format!(" AND category = ?{}", param_values.len() + 1));
            param_values.push(Box::new(c.trim().to_string()));
        }
        if let Some(before) = &filter.deadline_before {
            sql.push_str(&format!(" AND deadline <= ?{}", param_values.len() + 1));
            param_values.push(Box::new(format_timestamp(before)));
        }
        if let Some(after) = &filter.deadline_after {
            sql.push_str(&format!(" AND deadline >= ?{}", param_values.len() + 1));
            param_values.push(Box::new(format_timestamp(after)));
        }
        if let Some(tags) = &filter.tags {
            push_tag_filter(&mut sql, &mut param_values, tags);
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_ref.as_slice(), row_to_todo)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn update_todo(&self, id: i64, update: &TodoUpdate) -> Result<Todo> {
        if self.get_todo(id)?.is_none() {
            return Err(LedgerError::todo_not_found(id).into());
        }

        let mut sets: Vec<String> = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(content) = &update.content {
            let content = content.trim();
            if content.is_empty() {
                return Err(LedgerError::Validation("待办内容不能为空".into()).into());
            }
            param_values.push(Box::new(content.to_string()));
            sets.push(format!("content = ?{}", param_values.len()));
        }
        if let Some(category) = &update.category {
            let category = category.trim();
            if category.is_empty() {
                return Err(LedgerError::Validation("分类不能为空".into()).into());
            }
            param_values.push(Box::new(category.to_string()));
            sets.push(format!("category = ?{}", param_values.len()));
        }
        if let Some(tags) = &update.tags {
            param_values.push(Box::new(tags.trim().to_string()));
            sets.push(format!("tags = ?{}", param_values.len()));
        }
        if let Some(deadline) = &update.deadline {
            param_values.push(Box::new(deadline.as_ref().map(format_timestamp)));
            sets.push(format!("deadline = ?{}", param_values.len()));
        }

        param_values.push(Box::new(chrono::Utc::now().to_rfc3339()));
        sets.push(format!("updated_at = ?{}", param_values.len()));
        param_values.push(Box::new(id));

        let sql = format!(
            "UPDATE todos SET {} WHERE id = ?{}",
            sets.join(", "),
            param_values.len()
        );
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        self.conn.execute(&sql, params_ref.as_slice())?;
        info!(id, "updated todo");

        self.get_todo(id)?
            .ok_or_else(|| LedgerError::todo_not_found(id).into())
    }

    pub(crate) fn update_todo_status(&self, id: i64, status: TodoStatus) -> Result<Todo> {
        let changed = self.conn.execute(
            "UPDATE todos SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), chrono::Utc::now().to_rfc3339(), id],
        )?;
        if changed == 0 {
            return Err(LedgerError::todo_not_found(id).into());
        }
        info!(id, status = status.as_str(), "updated todo status");
        self.get_todo(id)?
            .ok_or_else(|| LedgerError::todo_not_found(id).into())
    }

    pub(crate) fn delete_todo(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        clear_todo_link(&tx, id)?;
        let deleted = tx.execute("DELETE FROM todos WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(LedgerError::todo_not_found(id).into());
        }
        tx.commit()?;
        info!(id, "deleted todo");
        Ok(())
    }

    // ── Links ─────────────────────────────────────────────────

    /// Link a transaction to a todo, replacing the transaction's previous
    /// link. Fails if the todo is linked to a different transaction.
    pub(crate) fn link_transaction_to_todo(
        &mut self,
        transaction_id: i64,
        todo_id: i64,
    ) -> Result<()> {
        self.relink(transaction_id, todo_id, LinkSubject::Transaction)
    }

    /// Link a todo to a transaction, replacing the todo's previous link.
    /// Fails if the transaction is linked to a different todo.
    pub(crate) fn link_todo_to_transaction(
        &mut self,
        todo_id: i64,
        transaction_id: i64,
    ) -> Result<()> {
        self.relink(transaction_id, todo_id, LinkSubject::Todo)
    }

    fn relink(&mut self, transaction_id: i64, todo_id: i64, subject: LinkSubject) -> Result<()> {
        let tx = self.conn.transaction()?;
        let txn_link = transaction_link(&tx, transaction_id)?
            .ok_or_else(|| LedgerError::transaction_not_found(transaction_id))?;
        let todo_side =
            todo_link(&tx, todo_id)?.ok_or_else(|| LedgerError::todo_not_found(todo_id))?;

        match subject {
            LinkSubject::Transaction => {
                if let Some(other) = todo_side.filter(|&t| t != transaction_id) {
                    return Err(LedgerError::AlreadyLinked {
                        entity: "待办事项",
                        id: todo_id,
                        other: "交易",
                        other_id: other,
                    }
                    .into());
                }
                clear_transaction_link(&tx, transaction_id)?;
            }
            LinkSubject::Todo => {
                if let Some(other) = txn_link.filter(|&t| t != todo_id) {
                    return Err(LedgerError::AlreadyLinked {
                        entity: "交易",
                        id: transaction_id,
                        other: "待办事项",
                        other_id: other,
                    }
                    .into());
                }
                clear_todo_link(&tx, todo_id)?;
            }
        }

        write_link(&tx, transaction_id, todo_id)?;
        tx.commit()?;
        info!(transaction_id, todo_id, "linked transaction and todo");
        Ok(())
    }

    pub(crate) fn unlink_transaction(&mut self, transaction_id: i64) -> Result<Transaction> {
        let tx = self.conn.transaction()?;
        if transaction_link(&tx, transaction_id)?.is_none() {
            return Err(LedgerError::transaction_not_found(transaction_id).into());
        }
        clear_transaction_link(&tx, transaction_id)?;
        tx.commit()?;
        self.get_transaction(transaction_id)?
            .ok_or_else(|| LedgerError::transaction_not_found(transaction_id).into())
    }

    pub(crate) fn unlink_todo(&mut self, todo_id: i64) -> Result<Todo> {
        let tx = self.conn.transaction()?;
        if todo_link(&tx, todo_id)?.is_none() {
            return Err(LedgerError::todo_not_found(todo_id).into());
        }
        clear_todo_link(&tx, todo_id)?;
        tx.commit()?;
        self.get_todo(todo_id)?
            .ok_or_else(|| LedgerError::todo_not_found(todo_id).into())
    }
}

impl TransactionSource for Database {
    fn query_transactions(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        categories: Option<&CategoryFilter>,
    ) -> Result<Vec<Transaction>> {
        let mut sql = format!(
            "SELECT {TXN_COLUMNS} FROM transactions \
             WHERE occurred_at >= ?1 AND occurred_at <= ?2"
        );
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![
            Box::new(format_timestamp(&start)),
            Box::new(format_timestamp(&end)),
        ];

        if let Some(filter) = categories {
            let placeholders: String = (0..filter.names().len())
                .map(|i| format!("?{}", i + 3))
                .collect::<Vec<_>>()
                .join(",");
            sql.push_str(&format!(" AND category IN ({placeholders})"));
            for name in filter.names() {
                param_values.push(Box::new(name.clone()));
            }
        }

        sql.push_str(" ORDER BY occurred_at, id");

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_ref.as_slice(), row_to_transaction)?;
        let txns = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(%start, %end, rows = txns.len(), "queried transactions");
        Ok(txns)
    }
}

// ── Row mapping ───────────────────────────────────────────────

fn row_to_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
    let amount_str: String = row.get(1)?;
    let occurred_str: String = row.get(5)?;
    Ok(Transaction {
        id: Some(row.get(0)?),
        amount: decimal_column(1, &amount_str)?,
        category: row.get(2)?,
        tags: row.get(3)?,
        notes: row.get(4)?,
        occurred_at: timestamp_column(5, &occurred_str)?,
        todo_id: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn row_to_todo(row: &rusqlite::Row<'_>) -> rusqlite::Result<Todo> {
    let deadline_str: Option<String> = row.get(4)?;
    let status_str: String = row.get(5)?;
    Ok(Todo {
        id: Some(row.get(0)?),
        content: row.get(1)?,
        category: row.get(2)?,
        tags: row.get(3)?,
        deadline: deadline_str
            .map(|s| timestamp_column(4, &s))
            .transpose()?,
        status: TodoStatus::parse(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                Type::Text,
                Box::new(LedgerError::InvalidStatus(status_str.clone())),
            )
        })?,
        transaction_id: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn decimal_column(idx: usize, s: &str) -> rusqlite::Result<Decimal> {
    Decimal::from_str(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp_column(idx: usize, s: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn push_tag_filter(
    sql: &mut String,
    param_values: &mut Vec<Box<dyn rusqlite::types::ToSql>>,
    tags: &str,
) {
    let tags = crate::util::split_list(tags);
    if tags.is_empty() {
        return;
    }
    let clauses: Vec<String> = tags
        .into_iter()
        .map(|tag| {
            param_values.push(Box::new(format!("%{tag}%")));
            format!("tags LIKE ?{}", param_values.len())
        })
        .collect();
    sql.push_str(&format!(" AND ({})", clauses.join(" OR ")));
}

// ── Link maintenance ──────────────────────────────────────────
//
// Both `transactions.todo_id` and `todos.transaction_id` are written together
// inside the caller's SQL transaction.

/// `None` if the transaction does not exist, otherwise its current todo link.
fn transaction_link(conn: &Connection, transaction_id: i64) -> Result<Option<Option<i64>>> {
    Ok(conn
        .query_row(
            "SELECT todo_id FROM transactions WHERE id = ?1",
            params![transaction_id],
            |row| row.get(0),
        )
        .optional()?)
}

/// `None` if the todo does not exist, otherwise its current transaction link.
fn todo_link(conn: &Connection, todo_id: i64) -> Result<Option<Option<i64>>> {
    Ok(conn
        .query_row(
            "SELECT transaction_id FROM todos WHERE id = ?1",
            params![todo_id],
            |row| row.get(0),
        )
        .optional()?)
}

fn write_link(conn: &Connection, transaction_id: i64, todo_id: i64) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE transactions SET todo_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![todo_id, now, transaction_id],
    )?;
    conn.execute(
        "UPDATE todos SET transaction_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![transaction_id, now, todo_id],
    )?;
    Ok(())
}

fn clear_transaction_link(conn: &Connection, transaction_id: i64) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE todos SET transaction_id = NULL, updated_at = ?1 WHERE transaction_id = ?2",
        params![now, transaction_id],
    )?;
    conn.execute(
        "UPDATE transactions SET todo_id = NULL, updated_at = ?1
         WHERE id = ?2 AND todo_id IS NOT NULL",
        params![now, transaction_id],
    )?;
    Ok(())
}

fn clear_todo_link(conn: &Connection, todo_id: i64) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE transactions SET todo_id = NULL, updated_at = ?1 WHERE todo_id = ?2",
        params![now, todo_id],
    )?;
    conn.execute(
        "UPDATE todos SET transaction_id = NULL, updated_at = ?1
         WHERE id = ?2 AND transaction_id IS NOT NULL",
        params![now, todo_id],
    )?;
    Ok(())
}
