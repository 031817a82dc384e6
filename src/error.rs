//! Error types for CashLog.
//!
//! Report requests fail with [`ReportError`]; ledger writes fail with
//! [`LedgerError`]. Storage plumbing uses `anyhow` and absorbs both through `?`.

use thiserror::Error;

/// Failures of a report request. None of them produce a partial report.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("日期格式应为YYYY-MM-DD: {0}")]
    InvalidDateFormat(String),

    #[error("月份格式应为YYYY-MM: {0}")]
    InvalidMonthFormat(String),

    #[error("结束日期必须晚于开始日期: {start} 至 {end}")]
    InvalidRange { start: String, end: String },

    #[error("自定义区间必须同时提供开始和结束日期")]
    MissingDateRange,

    #[error("无效字段: {0}，有效字段为: 金额, 分类, 待办 ID, 日期, 交易描述, 笔数")]
    InvalidField(String),

    #[error("无效时间维度: {0}，可选值: daily, weekly, monthly, quarterly, custom")]
    InvalidDimension(String),

    #[error("无效输出格式: {0}，可选值: text, markdown")]
    InvalidFormat(String),

    #[error("金额合计超出可计算范围")]
    AmountOverflow,

    /// Anything the storage collaborator raised, passed through untouched.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Failures of ledger writes (transactions, todos and their link).
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),

    #[error("{entity}ID {id} 不存在")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{entity}ID {id} 已关联{other}ID {other_id}")]
    AlreadyLinked {
        entity: &'static str,
        id: i64,
        other: &'static str,
        other_id: i64,
    },

    #[error("金额需为数字，最多两位小数，绝对值小于1万亿: {0}")]
    InvalidAmount(String),

    #[error("时间格式不正确，请使用YYYY-MM-DD HH:MM:SS格式: {0}")]
    InvalidTimestamp(String),

    #[error("状态无效，可选值：todo, doing, done: {0}")]
    InvalidStatus(String),
}

impl LedgerError {
    pub fn transaction_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "交易",
            id,
        }
    }

    pub fn todo_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "待办事项",
            id,
        }
    }
}
