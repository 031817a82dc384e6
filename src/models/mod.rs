mod todo;
mod transaction;

pub use todo::{Todo, TodoFilter, TodoStatus, TodoUpdate};
pub use transaction::{Transaction, TransactionFilter, TransactionKind, TransactionUpdate};
