mod cli;

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Settings;
use crate::db::Database;
use crate::error::ReportError;
use crate::report::Dimension;

#[derive(Parser, Debug)]
#[command(
    name = "cashlog",
    version,
    about = "Local income/expense ledger with todos and period reports"
)]
pub(crate) struct Cli {
    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Database file (overrides the configured path)
    #[arg(long, global = true, env = "CASHLOG_DB", value_name = "PATH")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record and manage transactions
    #[command(subcommand, alias = "transaction")]
    Tx(TxCommand),

    /// Record and manage todos
    #[command(subcommand)]
    Todo(TodoCommand),

    /// Income/expense reports
    #[command(subcommand)]
    Report(ReportCommand),
}

#[derive(Subcommand, Debug)]
enum TxCommand {
    /// Add a transaction (positive amount = income, negative = expense)
    Add {
        #[arg(short, long, allow_hyphen_values = true)]
        amount: String,
        #[arg(short, long)]
        category: String,
        /// Comma-separated tags
        #[arg(short, long, default_value = "")]
        tags: String,
        #[arg(short, long, default_value = "")]
        notes: String,
        /// YYYY-MM-DD [HH:MM[:SS]], defaults to now
        #[arg(short, long)]
        datetime: Option<String>,
        /// Link to an existing todo
        #[arg(long)]
        todo_id: Option<i64>,
    },

    /// List transactions, newest first
    List {
        /// YYYY-MM
        #[arg(short, long)]
        month: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        /// Matches any of the comma-separated tags
        #[arg(short, long)]
        tags: Option<String>,
        /// income or expense
        #[arg(long = "type", value_name = "TYPE")]
        kind: Option<String>,
        /// Show the linked todo's content
        #[arg(long)]
        with_todos: bool,
    },

    /// Change fields of a transaction
    Update {
        id: i64,
        #[arg(short, long, allow_hyphen_values = true)]
        amount: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long)]
        tags: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
        /// Link to a todo; 0 removes the link
        #[arg(long)]
        todo_id: Option<i64>,
    },

    /// Delete a transaction
    Delete { id: i64 },

    /// Remove a transaction's todo link
    Unlink { id: i64 },
}

#[derive(Subcommand, Debug)]
enum TodoCommand {
    /// Add a todo
    Add {
        #[arg(short, long)]
        content: String,
        #[arg(short = 'C', long)]
        category: String,
        #[arg(short, long, default_value = "")]
        tags: String,
        /// YYYY-MM-DD [HH:MM[:SS]]
        #[arg(short, long)]
        deadline: Option<String>,
        /// Link to an existing transaction
        #[arg(long)]
        transaction_id: Option<i64>,
    },

    /// List todos, newest first
    List {
        /// todo, doing or done
        #[arg(short, long)]
        status: Option<String>,
        #[arg(short = 'C', long)]
        category: Option<String>,
        #[arg(short, long)]
        tags: Option<String>,
        /// Deadline on or before
        #[arg(long)]
        before: Option<String>,
        /// Deadline on or after
        #[arg(long)]
        after: Option<String>,
        /// Show the linked transaction's amount
        #[arg(long)]
        with_transactions: bool,
    },

    /// Change fields of a todo
    Update {
        id: i64,
        #[arg(short, long)]
        content: Option<String>,
        #[arg(short = 'C', long)]
        category: Option<String>,
        #[arg(short, long)]
        tags: Option<String>,
        /// New deadline; "none" clears it
        #[arg(short, long)]
        deadline: Option<String>,
        /// Link to a transaction; 0 removes the link
        #[arg(long)]
        transaction_id: Option<i64>,
    },

    /// Set a todo's status (todo, doing, done)
    Status { id: i64, status: String },

    /// Remove a todo's transaction link
    Unlink { id: i64 },

    /// Delete a todo
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    /// Report for a period, compared with the period before it
    Generate(GenerateArgs),

    /// Report for one calendar month
    Monthly {
        /// YYYY-MM, defaults to the current month
        #[arg(short, long)]
        month: Option<String>,
        /// text or markdown
        #[arg(long)]
        format: Option<String>,
    },
}

#[derive(Args, Debug)]
#[group(id = "period", multiple = false)]
struct PeriodFlags {
    #[arg(long)]
    daily: bool,
    #[arg(long)]
    weekly: bool,
    #[arg(long)]
    monthly: bool,
    #[arg(long)]
    quarterly: bool,
    /// daily, weekly, monthly, quarterly or custom
    #[arg(long, value_name = "NAME")]
    dimension: Option<String>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    period: PeriodFlags,
    /// YYYY-MM-DD
    #[arg(long)]
    start: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    end: Option<String>,
    /// Comma-separated category names
    #[arg(long)]
    category: Option<String>,
    /// Comma-separated fields: 金额, 分类, 待办 ID, 日期, 交易描述, 笔数
    #[arg(long)]
    fields: Option<String>,
    /// text or markdown
    #[arg(long)]
    format: Option<String>,
}

pub(crate) fn execute(cli: Cli, db: &mut Database, settings: &Settings) -> Result<()> {
    match cli.command {
        Command::Tx(cmd) => match cmd {
            TxCommand::Add {
                amount,
                category,
                tags,
                notes,
                datetime,
                todo_id,
            } => cli::tx_add(
                db,
                cli::NewTransaction {
                    amount,
                    category,
                    tags,
                    notes,
                    datetime,
                    todo_id,
                },
            ),
            TxCommand::List {
                month,
                category,
                tags,
                kind,
                with_todos,
            } => cli::tx_list(db, month, category, tags, kind, with_todos),
            TxCommand::Update {
                id,
                amount,
                category,
                tags,
                notes,
                todo_id,
            } => cli::tx_update(db, id, amount, category, tags, notes, todo_id),
            TxCommand::Delete { id } => cli::tx_delete(db, id),
            TxCommand::Unlink { id } => cli::tx_unlink(db, id),
        },
        Command::Todo(cmd) => match cmd {
            TodoCommand::Add {
                content,
                category,
                tags,
                deadline,
                transaction_id,
            } => cli::todo_add(db, content, category, tags, deadline, transaction_id),
            TodoCommand::List {
                status,
                category,
                tags,
                before,
                after,
                with_transactions,
            } => cli::todo_list(
                db,
                cli::TodoQuery {
                    status,
                    category,
                    tags,
                    before,
                    after,
                },
                with_transactions,
            ),
            TodoCommand::Update {
                id,
                content,
                category,
                tags,
                deadline,
                transaction_id,
            } => cli::todo_update(db, id, content, category, tags, deadline, transaction_id),
            TodoCommand::Status { id, status } => cli::todo_status(db, id, &status),
            TodoCommand::Unlink { id } => cli::todo_unlink(db, id),
            TodoCommand::Delete { id } => cli::todo_delete(db, id),
        },
        Command::Report(cmd) => match cmd {
            ReportCommand::Generate(args) => {
                let dimension = args.period.dimension(args.end.is_some())?;
                cli::report_generate(
                    db,
                    settings,
                    cli::ReportArgs {
                        dimension,
                        start: args.start,
                        end: args.end,
                        category: args.category,
                        fields: args.fields,
                        format: args.format,
                    },
                )
            }
            ReportCommand::Monthly { month, format } => {
                cli::report_monthly(db, settings, month, format)
            }
        },
    }
}

impl PeriodFlags {
    /// A named dimension wins. Otherwise an end date means a custom range and
    /// a lone start keeps the chosen period.
    fn dimension(&self, has_end: bool) -> Result<Dimension, ReportError> {
        if let Some(name) = &self.dimension {
            return Dimension::parse(name);
        }
        if has_end {
            return Ok(Dimension::Custom);
        }
        Ok(if self.daily {
            Dimension::Daily
        } else if self.weekly {
            Dimension::Weekly
        } else if self.quarterly {
            Dimension::Quarterly
        } else {
            Dimension::Monthly
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cashlog").chain(args.iter().copied())).unwrap()
    }

    fn generate_dimension(args: &[&str]) -> Dimension {
        let mut full = vec!["report", "generate"];
        full.extend_from_slice(args);
        match parse(&full).command {
            Command::Report(ReportCommand::Generate(g)) => {
                g.period.dimension(g.end.is_some()).unwrap()
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_report_dimension_selection() {
        assert_eq!(generate_dimension(&[]), Dimension::Monthly);
        assert_eq!(generate_dimension(&["--daily"]), Dimension::Daily);
        assert_eq!(generate_dimension(&["--weekly"]), Dimension::Weekly);
        assert_eq!(generate_dimension(&["--quarterly"]), Dimension::Quarterly);
        assert_eq!(
            generate_dimension(&["--weekly", "--start", "2023-12-01"]),
            Dimension::Weekly
        );
        assert_eq!(
            generate_dimension(&["--start", "2023-12-01", "--end", "2023-12-31"]),
            Dimension::Custom
        );
        assert_eq!(generate_dimension(&["--end", "2023-12-31"]), Dimension::Custom);
        assert_eq!(
            generate_dimension(&[
                "--dimension",
                "Weekly",
                "--start",
                "2023-12-01",
                "--end",
                "2023-12-07",
            ]),
            Dimension::Weekly
        );
    }

    #[test]
    fn test_unknown_dimension_name() {
        let cli = parse(&["report", "generate", "--dimension", "yearly"]);
        match cli.command {
            Command::Report(ReportCommand::Generate(g)) => assert!(matches!(
                g.period.dimension(false),
                Err(ReportError::InvalidDimension(name)) if name == "yearly"
            )),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_period_flags_are_exclusive() {
        let res = Cli::try_parse_from(["cashlog", "report", "generate", "--daily", "--weekly"]);
        assert!(res.is_err());
        let res = Cli::try_parse_from([
            "cashlog",
            "report",
            "generate",
            "--monthly",
            "--dimension",
            "daily",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn test_negative_amount_and_globals() {
        let cli = parse(&["-vv", "tx", "add", "-a", "-50", "-c", "餐饮", "--db", "x.db"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.db, Some(PathBuf::from("x.db")));
        match cli.command {
            Command::Tx(TxCommand::Add { amount, category, .. }) => {
                assert_eq!(amount, "-50");
                assert_eq!(category, "餐饮");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
