use assert_cmd::Command;
use predicates::prelude::*;
use std::error::Error;
use std::path::PathBuf;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn Error>>;

/// A throwaway database and config location.
struct Ledger {
    dir: TempDir,
}

impl Ledger {
    fn new() -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.json")
    }

    fn cmd(&self) -> Result<Command, Box<dyn Error>> {
        let mut cmd = Command::cargo_bin("cashlog")?;
        cmd.env("CASHLOG_DB", self.dir.path().join("cashlog.db"))
            .env("CASHLOG_CONFIG", self.config_path())
            .env_remove("RUST_LOG");
        Ok(cmd)
    }

    fn run(&self, args: &[&str]) -> Result<assert_cmd::assert::Assert, Box<dyn Error>> {
        Ok(self.cmd()?.args(args).assert())
    }

    fn add(&self, amount: &str, category: &str, at: &str) -> TestResult {
        self.run(&["tx", "add", "-a", amount, "-c", category, "-d", at])?
            .success();
        Ok(())
    }

    fn seed_december(&self) -> TestResult {
        self.add("5000", "工资", "2023-12-01 09:00")?;
        self.add("1000", "奖金", "2023-12-15")?;
        self.add("-1000", "餐饮", "2023-12-05 12:00:00")?;
        self.add("-500", "交通", "2023-12-10")?;
        self.add("-2000", "购物", "2023-12-20")?;
        self.add("4500", "工资", "2023-11-01")?;
        Ok(())
    }
}

#[test]
fn tx_add_and_list() -> TestResult {
    let ledger = Ledger::new()?;
    ledger
        .run(&["tx", "add", "-a", "-35.5", "-c", "餐饮", "-t", "午饭", "-d", "2023-12-05 12:30"])?
        .success()
        .stdout(predicate::str::contains("交易已添加，ID: 1"));

    ledger
        .run(&["tx", "list", "-m", "2023-12"])?
        .success()
        .stdout(
            predicate::str::contains("2023-12-05 12:30:00")
                .and(predicate::str::contains("-35.50"))
                .and(predicate::str::contains("餐饮")),
        );

    ledger
        .run(&["tx", "list", "--type", "income"])?
        .success()
        .stdout(predicate::str::contains("暂无交易记录"));
    Ok(())
}

#[test]
fn tx_add_rejects_bad_amount() -> TestResult {
    let ledger = Ledger::new()?;
    ledger
        .run(&["tx", "add", "-a", "twelve", "-c", "餐饮"])?
        .failure()
        .stderr(predicate::str::contains("金额需为数字"));
    ledger
        .run(&["tx", "add", "-a", "0.001", "-c", "餐饮"])?
        .failure()
        .stderr(predicate::str::contains("最多两位小数").and(predicate::str::contains("0.001")));
    ledger
        .run(&["tx", "list"])?
        .success()
        .stdout(predicate::str::contains("暂无交易记录"));
    Ok(())
}

#[test]
fn monthly_report_text() -> TestResult {
    let ledger = Ledger::new()?;
    ledger.seed_december()?;

    ledger
        .run(&["report", "monthly", "-m", "2023-12"])?
        .success()
        .stdout(
            predicate::str::contains("2023-12 收支报表")
                .and(predicate::str::contains("总收入: 6000.00"))
                .and(predicate::str::contains("  环比: +33.33% (上期: 4500.00)"))
                .and(predicate::str::contains("总支出: 3500.00"))
                .and(predicate::str::contains("结余: 2500.00"))
                .and(predicate::str::contains("交易笔数: 5"))
                .and(predicate::str::contains("对比周期: 2023-11")),
        );
    Ok(())
}

#[test]
fn generate_report_markdown_with_fields() -> TestResult {
    let ledger = Ledger::new()?;
    ledger.seed_december()?;

    ledger
        .run(&[
            "report",
            "generate",
            "--monthly",
            "--start",
            "2023-12-01",
            "--fields",
            "金额,笔数",
            "--format",
            "markdown",
        ])?
        .success()
        .stdout(
            predicate::str::contains("# 2023-12 收支报表")
                .and(predicate::str::contains("| 总收入 | 6000.00 | 4500.00 | +33.33% |"))
                .and(predicate::str::contains(
                    "| 分类 | 收入 | 收入占比 | 支出 | 支出占比 | 总金额 | 笔数 |",
                ))
                .and(predicate::str::contains(
                    "| 工资 | 5000.00 | 83.3% | 0.00 | 0.0% | 5000.00 | 1 |",
                )),
        );
    Ok(())
}

#[test]
fn generate_custom_range_with_category_filter() -> TestResult {
    let ledger = Ledger::new()?;
    ledger.seed_december()?;

    ledger
        .run(&[
            "report",
            "generate",
            "--start",
            "2023-12-01",
            "--end",
            "2023-12-31",
            "--category",
            "餐饮,交通",
        ])?
        .success()
        .stdout(
            predicate::str::contains("2023-12-01 至 2023-12-31 收支报表")
                .and(predicate::str::contains("总支出: 1500.00"))
                .and(predicate::str::contains("交易笔数: 2"))
                .and(predicate::str::contains("工资:").not()),
        );
    Ok(())
}

#[test]
fn empty_period_reports_no_data() -> TestResult {
    let ledger = Ledger::new()?;
    ledger
        .run(&["report", "monthly", "-m", "2020-01"])?
        .success()
        .stdout(predicate::str::contains("2020-01 收支报表\n\n暂无数据"));
    Ok(())
}

#[test]
fn reversed_range_fails() -> TestResult {
    let ledger = Ledger::new()?;
    ledger
        .run(&["report", "generate", "--start", "2023-12-31", "--end", "2023-12-01"])?
        .failure()
        .stderr(predicate::str::contains("结束日期必须晚于开始日期"));
    Ok(())
}

#[test]
fn end_without_start_fails() -> TestResult {
    let ledger = Ledger::new()?;
    ledger
        .run(&["report", "generate", "--end", "2023-12-31"])?
        .failure()
        .stderr(predicate::str::contains("自定义区间必须同时提供开始和结束日期"));
    Ok(())
}

#[test]
fn unknown_field_fails() -> TestResult {
    let ledger = Ledger::new()?;
    ledger
        .run(&["report", "generate", "--fields", "金额,bogus"])?
        .failure()
        .stderr(predicate::str::contains("无效字段: bogus"));
    Ok(())
}

#[test]
fn unknown_dimension_fails() -> TestResult {
    let ledger = Ledger::new()?;
    ledger
        .run(&["report", "generate", "--dimension", "yearly"])?
        .failure()
        .stderr(predicate::str::contains("无效时间维度: yearly"));
    Ok(())
}

#[test]
fn bad_month_fails() -> TestResult {
    let ledger = Ledger::new()?;
    ledger
        .run(&["report", "monthly", "-m", "2023/12"])?
        .failure()
        .stderr(predicate::str::contains("月份格式应为YYYY-MM"));
    Ok(())
}

#[test]
fn config_default_format_applies() -> TestResult {
    let ledger = Ledger::new()?;
    std::fs::write(
        ledger.config_path(),
        r#"{ "default_format": "markdown", "default_fields": ["分类", "笔数"] }"#,
    )?;
    ledger.seed_december()?;

    ledger
        .run(&["report", "monthly", "-m", "2023-12"])?
        .success()
        .stdout(
            predicate::str::contains("# 2023-12 收支报表")
                .and(predicate::str::contains("| 分类 | 笔数 |")),
        );

    // An explicit flag still wins.
    ledger
        .run(&["report", "monthly", "-m", "2023-12", "--format", "text"])?
        .success()
        .stdout(predicate::str::starts_with("2023-12 收支报表"));
    Ok(())
}

#[test]
fn todo_link_lifecycle() -> TestResult {
    let ledger = Ledger::new()?;
    ledger.add("-2000", "房租", "2023-12-02")?;
    ledger.add("-50", "水电", "2023-12-03")?;

    ledger
        .run(&["todo", "add", "-c", "交房租", "-C", "住房", "--transaction-id", "1"])?
        .success()
        .stdout(predicate::str::contains("待办事项已添加，ID: 1"));

    // Transaction 1 is taken.
    ledger
        .run(&["todo", "add", "-c", "再交一次", "-C", "住房", "--transaction-id", "1"])?
        .failure()
        .stderr(predicate::str::contains("交易ID 1 已关联待办事项ID 1"));

    ledger
        .run(&["todo", "list", "--with-transactions"])?
        .success()
        .stdout(predicate::str::contains("#1 -2,000.00 房租"));

    ledger
        .run(&["todo", "status", "1", "doing"])?
        .success()
        .stdout(predicate::str::contains("进行中"));
    ledger
        .run(&["todo", "status", "1", "later"])?
        .failure()
        .stderr(predicate::str::contains("状态无效"));

    ledger.run(&["tx", "delete", "1"])?.success();
    ledger
        .run(&["todo", "list"])?
        .success()
        .stdout(predicate::str::contains("#1").not());

    ledger
        .run(&["tx", "update", "2", "--todo-id", "1"])?
        .success();
    ledger
        .run(&["tx", "list", "--with-todos"])?
        .success()
        .stdout(predicate::str::contains("#1 交房租"));

    ledger.run(&["todo", "unlink", "1"])?.success();
    ledger
        .run(&["tx", "list"])?
        .success()
        .stdout(predicate::str::contains("#1").not());
    Ok(())
}
