use chrono::NaiveDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoStatus {
    Todo,
    Doing,
    Done,
}

impl TodoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Doing => "doing",
            Self::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "todo" => Some(Self::Todo),
            "doing" => Some(Self::Doing),
            "done" => Some(Self::Done),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Todo => "待办",
            Self::Doing => "进行中",
            Self::Done => "已完成",
        }
    }

    pub fn all() -> &'static [TodoStatus] {
        &[Self::Todo, Self::Doing, Self::Done]
    }
}

impl std::fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.label())
    }
}

#[derive(Debug, Clone)]
pub struct Todo {
    pub id: Option<i64>,
    pub content: String,
    pub category: String,
    pub tags: String,
    pub deadline: Option<NaiveDateTime>,
    pub status: TodoStatus,
    pub transaction_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl Todo {
    pub fn new(content: String, category: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: None,
            content,
            category,
            tags: String::new(),
            deadline: None,
            status: TodoStatus::Todo,
            transaction_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        self.status != TodoStatus::Done && self.deadline.is_some_and(|d| d < now)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TodoFilter {
    pub status: Option<TodoStatus>,
    pub category: Option<String>,
    pub tags: Option<String>,
    /// Inclusive upper bound on the deadline.
    pub deadline_before: Option<NaiveDateTime>,
    /// Inclusive lower bound on the deadline.
    pub deadline_after: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default)]
pub struct TodoUpdate {
    pub content: Option<String>,
    pub category: Option<String>,
    pub tags: Option<String>,
    /// `Some(None)` clears the deadline.
    pub deadline: Option<Option<NaiveDateTime>>,
}
