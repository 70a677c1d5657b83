// ==========================================
// 周度 Flash 预测台账 - 命令行入口
// ==========================================
// 用法:
//   flash-forecast [--db PATH] submit <FINANCIALS> <REGION> <WEEK> <FLASH_EST> <ACTUALS>
//   flash-forecast [--db PATH] list [--json] [--eom-only] [--region R] [--type T] [--limit N]
//   flash-forecast [--db PATH] export [OUT_PATH | -]
//   flash-forecast [--db PATH] rebuild-eom
//   flash-forecast [--db PATH] verify-eom
//   flash-forecast [--db PATH] config [KEY [VALUE]]
//   flash-forecast [--db PATH] log [N]
// ==========================================

use std::path::Path;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context};
use flash_forecast::api::{ApiError, ForecastInputValidator, RawForecastForm};
use flash_forecast::app::{get_default_db_path, AppState};
use flash_forecast::domain::{ForecastFilter, ForecastRecord, NewForecast};

const USAGE: &str = "\
用法:
  flash-forecast [--db PATH] submit <FINANCIALS> <REGION> <WEEK> <FLASH_EST> <ACTUALS>
  flash-forecast [--db PATH] list [--json] [--eom-only] [--region R] [--type T] [--limit N]
  flash-forecast [--db PATH] export [OUT_PATH | -]
  flash-forecast [--db PATH] rebuild-eom
  flash-forecast [--db PATH] verify-eom
  flash-forecast [--db PATH] config [KEY [VALUE]]
  flash-forecast [--db PATH] log [N]";

/// 日志格式环境变量（"json" 时输出结构化日志）
const LOG_FORMAT_ENV: &str = "FLASH_FORECAST_LOG_FORMAT";

fn main() -> ExitCode {
    match std::env::var(LOG_FORMAT_ENV).as_deref() {
        Ok("json") => flash_forecast::logging::init_json(),
        _ => flash_forecast::logging::init(),
    }

    match run(std::env::args().skip(1).collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = exit_code_for(&err);
            match code {
                EXIT_VALIDATION => eprintln!("输入无效, 未提交: {}", err),
                EXIT_STORAGE => eprintln!("存储不可用, 操作未完成, 请稍后重试: {}", err),
                _ => eprintln!("错误: {:#}", err),
            }
            ExitCode::from(code)
        }
    }
}

const EXIT_OTHER: u8 = 1;
const EXIT_VALIDATION: u8 = 2;
const EXIT_STORAGE: u8 = 3;

/// 区分输入错误与存储错误, 后者可重试
fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ApiError>() {
        Some(api_err) if api_err.is_validation_error() => EXIT_VALIDATION,
        Some(api_err) if api_err.is_storage_error() => EXIT_STORAGE,
        _ => EXIT_OTHER,
    }
}

fn run(args: Vec<String>) -> anyhow::Result<()> {
    let mut args = args.into_iter().peekable();

    let mut db_path: Option<String> = None;
    if args.peek().map(String::as_str) == Some("--db") {
        args.next();
        db_path = Some(args.next().ok_or_else(|| anyhow!("--db 需要路径参数"))?);
    }

    let command = match args.next() {
        Some(c) => c,
        None => {
            println!("{} v{}", flash_forecast::APP_NAME, flash_forecast::VERSION);
            println!("{}", USAGE);
            return Ok(());
        }
    };
    let rest: Vec<String> = args.collect();

    if matches!(command.as_str(), "help" | "--help" | "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    // submit 先校验表单, 非法输入不打开存储
    let submission = match command.as_str() {
        "submit" => Some(parse_submit_args(&rest)?),
        _ => None,
    };

    let db_path = db_path.unwrap_or_else(get_default_db_path);
    let state = AppState::new(db_path)?;
    let actor = std::env::var("USER").unwrap_or_else(|_| "cli".to_string());

    match command.as_str() {
        "submit" => {
            let input = submission.ok_or_else(|| anyhow!("submit 参数缺失"))?;
            let record = state.forecast_api.submit(&input, &actor)?;
            println!("已提交 id={}", record.id);
            print_table(std::slice::from_ref(&record));
        }
        "list" => {
            let (filter, as_json) = parse_list_args(&rest)?;
            let records = state.forecast_api.list_records(Some(filter))?;
            if as_json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                print_table(&records);
            }
        }
        "export" => match rest.first().map(String::as_str) {
            Some("-") => print!("{}", state.forecast_api.export_csv_string()?),
            Some(path) => {
                let (target, rows) = state.forecast_api.export_csv(Some(Path::new(path)))?;
                println!("已导出 {} 行到 {}", rows, target.display());
            }
            None => {
                let (target, rows) = state.forecast_api.export_csv(None)?;
                println!("已导出 {} 行到 {}", rows, target.display());
            }
        },
        "rebuild-eom" => {
            let groups = state.forecast_api.rebuild_all_eom(&actor)?;
            println!("EOM 重建完成, 分组数: {}", groups);
        }
        "verify-eom" => {
            let violations = state.forecast_api.verify_eom()?;
            if violations.is_empty() {
                println!("EOM 一致");
            } else {
                for v in &violations {
                    println!(
                        "不一致: group={} expected_id={} marked_ids={:?}",
                        v.group, v.expected_id, v.marked_ids
                    );
                }
                bail!("{} 个分组 EOM 不一致, 可执行 rebuild-eom 修复", violations.len());
            }
        }
        "config" => match rest.as_slice() {
            [] => {
                for item in state.config_api.list_configs()? {
                    println!("{} = {}", item.key, item.value);
                }
            }
            [key] => {
                let item = state.config_api.get_config(key)?;
                println!("{} = {}", item.key, item.value);
            }
            [key, value] => {
                state.config_api.update_config(key, value, &actor)?;
                println!("{} = {}", key, value.trim());
            }
            _ => bail!("config 参数过多\n{}", USAGE),
        },
        "log" => {
            let limit = match rest.first() {
                Some(n) => n.parse::<i32>().context("log 条数必须是整数")?,
                None => 20,
            };
            for log in state.forecast_api.list_recent_actions(limit)? {
                println!(
                    "{} {} {} {}",
                    log.action_ts.format("%Y-%m-%d %H:%M:%S"),
                    log.action_type,
                    log.actor,
                    log.detail.unwrap_or_default()
                );
            }
        }
        other => bail!("未知命令: {}\n{}", other, USAGE),
    }

    Ok(())
}

fn parse_submit_args(rest: &[String]) -> anyhow::Result<NewForecast> {
    if rest.len() != 5 {
        bail!("submit 需要 5 个参数\n{}", USAGE);
    }
    let form = RawForecastForm {
        financial_type: rest[0].clone(),
        region: rest[1].clone(),
        week: rest[2].clone(),
        flash_estimate: rest[3].clone(),
        actual: rest[4].clone(),
    };
    Ok(ForecastInputValidator::parse_form(&form)?)
}

fn parse_list_args(rest: &[String]) -> anyhow::Result<(ForecastFilter, bool)> {
    let mut filter = ForecastFilter::default();
    let mut as_json = false;
    let mut iter = rest.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => as_json = true,
            "--eom-only" => filter.eom_only = true,
            "--region" => {
                let v = iter.next().ok_or_else(|| anyhow!("--region 需要参数"))?;
                filter.region = Some(v.parse().map_err(|e: String| anyhow!(e))?);
            }
            "--type" => {
                let v = iter.next().ok_or_else(|| anyhow!("--type 需要参数"))?;
                filter.financial_type = Some(v.parse().map_err(|e: String| anyhow!(e))?);
            }
            "--limit" => {
                let v = iter.next().ok_or_else(|| anyhow!("--limit 需要参数"))?;
                filter.limit = Some(v.parse().context("--limit 必须是非负整数")?);
            }
            other => bail!("未知参数: {}", other),
        }
    }

    Ok((filter, as_json))
}

fn print_table(records: &[ForecastRecord]) {
    println!(
        "{:>5} {:<10} {:<10} {:<10} {:>14} {:>14} {:>14} {:>11} {:>9} {:>5} {:<3}",
        "id", "Financials", "Region", "Week", "Flash Est", "Actuals", "Flash vs Act",
        "% Variance", "Accuracy", "Month", "EOM"
    );
    for r in records {
        let pct = r
            .percent_variance
            .map(|p| format!("{:.2}%", p * 100.0))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>5} {:<10} {:<10} {:<10} {:>14.2} {:>14.2} {:>14.2} {:>11} {:>8.2}% {:>5} {:<3}",
            r.id,
            r.financial_type.as_str(),
            r.region.as_str(),
            r.week.format("%Y-%m-%d").to_string(),
            r.flash_estimate,
            r.actual,
            r.variance,
            pct,
            r.accuracy * 100.0,
            r.month,
            if r.is_eom { "EOM" } else { "" }
        );
    }
}
