mod common;
mod http_client;
mod model;
mod report;
mod sink;

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;

use model::{Config, Credentials};
use report::{ReportClient, ReportKind, RunMode, RunSummary};

/// 广告报表拉取工具
#[derive(Parser, Debug)]
#[command(name = "adreport", version, about, long_about = None)]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = Config::default_config_path())]
    config: PathBuf,

    /// 报表种类
    #[arg(short, long, value_enum)]
    report: ReportKind,

    /// 开始日期 (YYYY-MM-DD)，覆盖配置中的 startDate
    #[arg(long)]
    start: Option<NaiveDate>,

    /// 结束日期 (YYYY-MM-DD)，覆盖配置中的 endDate
    #[arg(long)]
    end: Option<NaiveDate>,
}

#[tokio::main]
async fn main() {
    // .env 中的凭据优先加载，日志过滤同样可以写在其中
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(summary) if summary.all_failed() => std::process::exit(1),
        Ok(_) => {}
        Err(e) => {
            tracing::error!("运行失败: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(args: Args) -> Result<RunSummary> {
    let mut config = Config::load(&args.config)?;
    if let Some(start) = args.start {
        config.start_date = Some(start);
    }
    if let Some(end) = args.end {
        config.end_date = Some(end);
    }
    config.validate()?;
    if let Some(path) = config.config_path() {
        tracing::debug!("已加载配置: {}", path.display());
    }

    let credentials = Credentials::from_env(&config.access_token_env)?;
    let client = ReportClient::new(&config, credentials)?;
    let mut sink = sink::open_sink(&config)?;

    let variant = report::variant(args.report);
    tracing::info!("开始拉取 {:?}，接口 {}", variant.kind, config.report_url());

    let summary = match variant.mode {
        RunMode::Single => report::run_single(&client, sink.as_mut(), variant, &config).await?,
        RunMode::Batch => {
            let run_id = uuid::Uuid::new_v4().to_string();
            tracing::info!("批量运行 ID: {}", run_id);
            let today = chrono::Local::now().date_naive();
            report::run_batch(&client, sink.as_mut(), variant, &config, &run_id, today).await?
        }
    };

    tracing::info!(
        "完成: {} 个窗口，{} 个组合，成功 {}，失败 {}，{} 行，汇总{}",
        summary.windows,
        summary.combinations,
        summary.succeeded,
        summary.failed,
        summary.rows,
        if summary.totals_written { "已写出" } else { "未写出" }
    );
    Ok(summary)
}
