//! 报表运行
//!
//! - 单账户报表：任一错误立即中止，不写出任何结果
//! - 批量报表：按 窗口(外层) × 实体(内层) 顺序拉取，单个组合失败时写错误日志后继续

use anyhow::{Context, Result};
use chrono::NaiveDate;

use super::client::ReportSource;
use super::entity::{EntityPair, pair_entities};
use super::fetcher::fetch_all;
use super::flatten::{FlatRow, flatten_items};
use super::query::ReportQuery;
use super::totals::TotalsAccumulator;
use super::variants::ReportVariant;
use super::window::{MAX_WINDOW_DAYS, Window, plan_windows};
use crate::model::{Config, ConfigError};
use crate::sink::{ErrorLogEntry, Sink};

/// 批量报表未定义错误日志目标时使用的名称
const DEFAULT_ERROR_OUTPUT: &str = "errors";

/// 一次运行的统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub windows: usize,
    pub combinations: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub rows: usize,
    pub totals_written: bool,
}

impl RunSummary {
    /// 是否全部组合都失败
    pub fn all_failed(&self) -> bool {
        self.combinations > 0 && self.succeeded == 0
    }
}

/// 构造单个 (实体, 窗口) 的查询
pub fn build_query(
    variant: &ReportVariant,
    config: &Config,
    pair: &EntityPair,
    window: Window,
) -> ReportQuery {
    ReportQuery {
        entity_id: pair.primary.clone(),
        secondary_entity_id: pair.secondary.clone(),
        start_date: window.start,
        end_date: window.end,
        granularity: variant.granularity,
        dimensions: variant.dimension_list(),
        metrics: variant.metric_list(),
        filters: variant.filters(config),
        page: 1,
        page_size: config.page_size,
        include_totals: config.enable_totals,
    }
}

/// 运行单账户报表
///
/// 结束日期未配置时取开始日期。拉取全部完成后才写出结果。
pub async fn run_single<S, K>(
    source: &S,
    sink: &mut K,
    variant: &ReportVariant,
    config: &Config,
) -> Result<RunSummary>
where
    S: ReportSource,
    K: Sink + ?Sized,
{
    let pairs = pair_entities(&config.advertiser_ids, &config.store_ids)?;
    let [pair] = pairs.as_slice() else {
        return Err(ConfigError::Invalid {
            field: "advertiserIds",
            reason: format!("单账户报表只能配置一个账户，当前 {} 个", pairs.len()),
        }
        .into());
    };
    let start = config.start_date.ok_or(ConfigError::Missing("startDate"))?;
    let window = Window::new(start, config.end_date.unwrap_or(start));

    let query = build_query(variant, config, pair, window);
    let outcome = fetch_all(source, &query).await.with_context(|| {
        format!(
            "拉取 {:?} 失败 (advertiser={}, {} ~ {})",
            variant.kind, pair.primary, window.start, window.end
        )
    })?;

    let rows = flatten_items(&outcome.items, variant.columns, pair);
    let mut totals = TotalsAccumulator::new();
    if let Some(t) = &outcome.totals {
        totals.merge(t);
    }
    let record = totals_record(variant, config, totals);
    let totals_written = write_outputs(sink, variant, &rows, record)?;

    Ok(RunSummary {
        windows: 1,
        combinations: 1,
        succeeded: 1,
        failed: 0,
        rows: rows.len(),
        totals_written,
    })
}

/// 运行批量报表
///
/// 从配置的开始日期到结束日期（未配置时为 `today`）按 30 天切分窗口。
/// 全部组合都失败时不覆盖已有输出。
pub async fn run_batch<S, K>(
    source: &S,
    sink: &mut K,
    variant: &ReportVariant,
    config: &Config,
    run_id: &str,
    today: NaiveDate,
) -> Result<RunSummary>
where
    S: ReportSource,
    K: Sink + ?Sized,
{
    let pairs = pair_entities(&config.advertiser_ids, &config.store_ids)?;
    let start = config.start_date.ok_or(ConfigError::Missing("startDate"))?;
    let end = config.end_date.unwrap_or(today);
    let windows = plan_windows(start, end, MAX_WINDOW_DAYS)?;
    let error_output = variant.error_output.unwrap_or(DEFAULT_ERROR_OUTPUT);

    let mut summary = RunSummary {
        windows: windows.len(),
        combinations: windows.len() * pairs.len(),
        ..Default::default()
    };
    tracing::info!(
        "批量拉取 {:?}: {} ~ {}，{} 个窗口 × {} 个账户",
        variant.kind,
        start,
        end,
        windows.len(),
        pairs.len()
    );

    let mut rows: Vec<FlatRow> = Vec::new();
    let mut totals = TotalsAccumulator::new();
    for window in &windows {
        for pair in &pairs {
            let query = build_query(variant, config, pair, *window);
            match fetch_all(source, &query).await {
                Ok(outcome) => {
                    rows.extend(flatten_items(&outcome.items, variant.columns, pair));
                    if let Some(t) = &outcome.totals {
                        totals.merge(t);
                    }
                    summary.succeeded += 1;
                }
                Err(e) if e.is_config() => {
                    return Err(e).with_context(|| {
                        format!(
                            "advertiser={} {} ~ {} 查询配置无效",
                            pair.primary, window.start, window.end
                        )
                    });
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(
                        "advertiser={} store={} {} ~ {} 拉取失败，跳过: {}",
                        pair.primary,
                        pair.secondary.as_deref().unwrap_or("-"),
                        window.start,
                        window.end,
                        e
                    );
                    let entry = ErrorLogEntry {
                        logged_at: chrono::Utc::now().to_rfc3339(),
                        run_id: run_id.to_string(),
                        primary_id: pair.primary.clone(),
                        secondary_id: pair.secondary.clone(),
                        window_start: window.start,
                        window_end: window.end,
                        message: e.to_string(),
                    };
                    if let Err(log_err) = sink.append_error(error_output, &entry) {
                        tracing::error!("写入错误日志失败: {:#}", log_err);
                    }
                }
            }
        }
    }

    if summary.all_failed() {
        tracing::error!(
            "{:?} 全部 {} 个组合拉取失败，保留原有输出",
            variant.kind,
            summary.combinations
        );
        return Ok(summary);
    }

    summary.rows = rows.len();
    let record = totals_record(variant, config, totals);
    summary.totals_written = write_outputs(sink, variant, &rows, record)?;

    tracing::info!(
        "批量拉取完成: 成功 {}，失败 {}，共 {} 行",
        summary.succeeded,
        summary.failed,
        summary.rows
    );
    Ok(summary)
}

/// 重算比率后得到汇总记录；未启用或没有任何汇总数据时返回 None
fn totals_record(
    variant: &ReportVariant,
    config: &Config,
    mut totals: TotalsAccumulator,
) -> Option<Vec<(String, String)>> {
    if !config.enable_totals {
        return None;
    }
    if totals.is_empty() {
        tracing::warn!("{:?} 未返回汇总数据，跳过汇总输出", variant.kind);
        return None;
    }
    totals.finalize();
    Some(totals.to_record())
}

/// 写出数据表与汇总；没有汇总时删除上一次运行遗留的汇总输出
fn write_outputs<K>(
    sink: &mut K,
    variant: &ReportVariant,
    rows: &[FlatRow],
    totals: Option<Vec<(String, String)>>,
) -> Result<bool>
where
    K: Sink + ?Sized,
{
    sink.write_table(variant.output, &variant.column_names(), rows)
        .with_context(|| format!("写出 {} 失败", variant.output))?;

    match totals {
        Some(record) => {
            sink.write_totals(variant.totals_output, &record)
                .with_context(|| format!("写出 {} 失败", variant.totals_output))?;
            Ok(true)
        }
        None => {
            sink.remove(variant.totals_output)
                .with_context(|| format!("删除 {} 失败", variant.totals_output))?;
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::error::ReportError;
    use crate::report::testing::{ScriptedSource, day, item, page};
    use crate::report::variants::{ReportKind, variant};
    use crate::sink::memory::MemorySink;
    use serde_json::json;

    fn config(advertisers: &[&str], stores: &[&str]) -> Config {
        let mut config = Config::default();
        config.api_base_url = "https://ads.example.com".to_string();
        config.advertiser_ids = advertisers.iter().map(|s| s.to_string()).collect();
        config.store_ids = stores.iter().map(|s| s.to_string()).collect();
        config.start_date = Some(day(2025, 6, 1));
        config.page_size = 2;
        config
    }

    fn creative_item(id: &str, cost: &str) -> crate::report::types::ReportItem {
        item(
            &[("item_id", json!(id)), ("stat_time_day", json!("2025-06-01"))],
            &[("cost", json!(cost)), ("10s_video_views", json!("5"))],
        )
    }

    fn column(table: &[Vec<String>], name: &str) -> Vec<String> {
        let idx = table[0].iter().position(|c| c == name).unwrap();
        table[1..].iter().map(|row| row[idx].clone()).collect()
    }

    #[tokio::test]
    async fn test_batch_isolates_failing_entity() {
        let source = ScriptedSource::new(|q| {
            if q.entity_id == "A" {
                return Err(ReportError::Transport {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(page(
                vec![creative_item("i1", "3"), creative_item("i2", "4")],
                1,
                1,
                Some(json!({"cost": "7", "gross_revenue": "21", "roi": "3", "currency": "USD"})),
            ))
        });
        let mut config = config(&["A", "B"], &["s1"]);
        config.end_date = Some(day(2025, 6, 10));
        let mut sink = MemorySink::default();
        let v = variant(ReportKind::CreativeSince);

        let summary = run_batch(&source, &mut sink, v, &config, "run-1", day(2025, 7, 1))
            .await
            .unwrap();

        assert_eq!(summary.combinations, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);

        let table = sink.table("creative_since").unwrap();
        assert_eq!(column(table, "advertiser_id"), vec!["B", "B"]);
        assert_eq!(column(table, "store_id"), vec!["s1", "s1"]);
        assert_eq!(column(table, "video_views_10s"), vec!["5", "5"]);

        let errors = sink.table("creative_since_errors").unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(column(errors, "primary_id"), vec!["A"]);
        assert_eq!(column(errors, "run_id"), vec!["run-1"]);
        assert_eq!(column(errors, "window_end"), vec!["2025-06-10"]);
        assert_eq!(column(errors, "message"), vec!["HTTP 500: boom"]);
    }

    #[tokio::test]
    async fn test_batch_iterates_window_outer_entity_inner() {
        let source = ScriptedSource::new(|q| Ok(page(vec![], q.page, 1, None)));
        let mut config = config(&["A", "B"], &["s1", "s2"]);
        config.end_date = Some(day(2025, 7, 5));
        let mut sink = MemorySink::default();

        let summary = run_batch(
            &source,
            &mut sink,
            variant(ReportKind::CreativeSince),
            &config,
            "run",
            day(2025, 8, 1),
        )
        .await
        .unwrap();

        assert_eq!(summary.windows, 2);
        let order: Vec<(String, Option<String>, NaiveDate)> = source
            .queries()
            .into_iter()
            .map(|q| (q.entity_id, q.secondary_entity_id, q.start_date))
            .collect();
        assert_eq!(
            order,
            vec![
                ("A".to_string(), Some("s1".to_string()), day(2025, 6, 1)),
                ("B".to_string(), Some("s2".to_string()), day(2025, 6, 1)),
                ("A".to_string(), Some("s1".to_string()), day(2025, 7, 1)),
                ("B".to_string(), Some("s2".to_string()), day(2025, 7, 1)),
            ]
        );
        // 没有汇总数据时不写汇总
        assert!(sink.table("creative_since_totals").is_none());
    }

    #[tokio::test]
    async fn test_batch_merges_totals_and_recomputes_roi() {
        let source = ScriptedSource::new(|q| {
            let totals = match q.entity_id.as_str() {
                "A" => json!({"cost": "60", "gross_revenue": "100", "roi": "1.67", "currency": "USD"}),
                _ => json!({"cost": "40", "gross_revenue": "150", "roi": "3.75", "currency": "EUR"}),
            };
            Ok(page(vec![], 1, 1, Some(totals)))
        });
        let mut config = config(&["A", "B"], &[]);
        config.end_date = Some(day(2025, 6, 1));
        let mut sink = MemorySink::default();

        let summary = run_batch(
            &source,
            &mut sink,
            variant(ReportKind::CreativeSince),
            &config,
            "run",
            day(2025, 8, 1),
        )
        .await
        .unwrap();

        assert!(summary.totals_written);
        let totals = sink.table("creative_since_totals").unwrap();
        assert_eq!(totals[0], vec!["cost", "gross_revenue", "roi", "currency"]);
        assert_eq!(totals[1], vec!["100", "250", "2.5", "USD"]);
    }

    #[tokio::test]
    async fn test_batch_continues_when_error_log_unwritable() {
        let source = ScriptedSource::new(|q| {
            if q.entity_id == "A" {
                Err(ReportError::Api {
                    code: 1,
                    message: "bad".to_string(),
                })
            } else {
                Ok(page(vec![creative_item("i1", "1")], 1, 1, None))
            }
        });
        let mut config = config(&["A", "B"], &[]);
        config.end_date = Some(day(2025, 6, 1));
        let mut sink = MemorySink {
            fail_error_log: true,
            ..Default::default()
        };

        let summary = run_batch(
            &source,
            &mut sink,
            variant(ReportKind::CreativeSince),
            &config,
            "run",
            day(2025, 8, 1),
        )
        .await
        .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(sink.table("creative_since").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_batch_all_failed_keeps_previous_output() {
        let source = ScriptedSource::new(|_| {
            Err(ReportError::Transport {
                status: 503,
                body: String::new(),
            })
        });
        let mut config = config(&["A"], &[]);
        config.end_date = Some(day(2025, 6, 1));
        let mut sink = MemorySink::default();
        sink.tables
            .insert("creative_since".to_string(), vec![vec!["old".to_string()]]);

        let summary = run_batch(
            &source,
            &mut sink,
            variant(ReportKind::CreativeSince),
            &config,
            "run",
            day(2025, 8, 1),
        )
        .await
        .unwrap();

        assert!(summary.all_failed());
        assert_eq!(sink.table("creative_since").unwrap()[0], vec!["old"]);
        assert_eq!(sink.table("creative_since_errors").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_batch_end_defaults_to_today_and_rejects_inverted_range() {
        let source = ScriptedSource::new(|q| Ok(page(vec![], q.page, 1, None)));
        let config = config(&["A"], &[]);
        let mut sink = MemorySink::default();
        let v = variant(ReportKind::CreativeSince);

        let summary = run_batch(&source, &mut sink, v, &config, "run", day(2025, 6, 3))
            .await
            .unwrap();
        assert_eq!(summary.windows, 1);
        assert_eq!(source.queries()[0].end_date, day(2025, 6, 3));

        let err = run_batch(&source, &mut sink, v, &config, "run", day(2025, 5, 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvertedRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_batch_invalid_query_is_fatal() {
        let source = ScriptedSource::new(|q| Ok(page(vec![], q.page, 1, None)));
        let mut config = config(&["A", "B"], &[]);
        config.end_date = Some(day(2025, 6, 1));
        config.page_size = 0;
        let mut sink = MemorySink::default();

        let err = run_batch(
            &source,
            &mut sink,
            variant(ReportKind::CreativeSince),
            &config,
            "run",
            day(2025, 8, 1),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ReportError>(),
            Some(ReportError::Config(ConfigError::Invalid { field: "page", .. }))
        ));
        assert_eq!(source.calls(), 0);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_single_without_totals_clears_previous_totals() {
        let source = ScriptedSource::new(|q| Ok(page(vec![item(&[], &[])], q.page, 1, None)));
        let config = config(&["101"], &[]);
        let mut sink = MemorySink::default();
        sink.tables.insert(
            "campaign_daily_totals".to_string(),
            vec![vec!["cost".to_string()], vec!["1".to_string()]],
        );

        let summary = run_single(&source, &mut sink, variant(ReportKind::CampaignDaily), &config)
            .await
            .unwrap();

        assert!(!summary.totals_written);
        assert_eq!(sink.table("campaign_daily").unwrap().len(), 2);
        assert!(sink.table("campaign_daily_totals").is_none());
    }

    #[tokio::test]
    async fn test_single_writes_rows_and_totals() {
        let source = ScriptedSource::new(|q| {
            let rows = vec![item(
                &[
                    ("campaign_id", json!(format!("c{}", q.page))),
                    ("stat_time_day", json!("2025-06-01")),
                ],
                &[("cost", json!("10"))],
            )];
            Ok(page(
                rows,
                q.page,
                2,
                Some(json!({"cost": "20", "net_cost": "18", "gross_revenue": "50", "roi": "2.5"})),
            ))
        });
        let mut config = config(&["101"], &["s1"]);
        config.end_date = Some(day(2025, 6, 7));
        let mut sink = MemorySink::default();

        let summary = run_single(&source, &mut sink, variant(ReportKind::CampaignDaily), &config)
            .await
            .unwrap();

        assert_eq!(summary.rows, 2);
        assert_eq!(source.calls(), 2);
        let table = sink.table("campaign_daily").unwrap();
        assert_eq!(column(table, "campaign_id"), vec!["c1", "c2"]);
        assert_eq!(column(table, "date"), vec!["2025-06-01", "2025-06-01"]);
        assert_eq!(column(table, "campaign_name"), vec!["", ""]);

        let totals = sink.table("campaign_daily_totals").unwrap();
        assert_eq!(totals[1], vec!["20", "18", "50", "2.5"]);
    }

    #[tokio::test]
    async fn test_single_failure_writes_nothing() {
        let source = ScriptedSource::new(|q| {
            if q.page == 2 {
                Err(ReportError::Api {
                    code: 40100,
                    message: "rate limited".to_string(),
                })
            } else {
                Ok(page(vec![item(&[], &[])], q.page, 2, None))
            }
        });
        let config = config(&["101"], &[]);
        let mut sink = MemorySink::default();

        let err = run_single(&source, &mut sink, variant(ReportKind::CampaignDaily), &config)
            .await
            .unwrap_err();

        assert!(sink.is_empty());
        assert!(matches!(
            err.downcast_ref::<ReportError>(),
            Some(ReportError::Api { code: 40100, .. })
        ));
    }

    #[tokio::test]
    async fn test_single_rejects_multiple_accounts() {
        let source = ScriptedSource::new(|q| Ok(page(vec![], q.page, 1, None)));
        let config = config(&["101", "102"], &[]);
        let mut sink = MemorySink::default();

        let err = run_single(&source, &mut sink, variant(ReportKind::CampaignDaily), &config)
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_single_hourly_defaults_to_single_day() {
        let source = ScriptedSource::new(|q| Ok(page(vec![], q.page, 1, None)));
        let mut config = config(&["101"], &[]);
        config.enable_totals = false;
        let mut sink = MemorySink::default();

        let summary = run_single(&source, &mut sink, variant(ReportKind::ProductHourly), &config)
            .await
            .unwrap();
        assert!(!summary.totals_written);
        let query = &source.queries()[0];
        assert_eq!(query.start_date, query.end_date);
        assert!(!query.include_totals);
        assert_eq!(sink.table("product_hourly").unwrap().len(), 1);

        config.end_date = Some(day(2025, 6, 2));
        let err = run_single(&source, &mut sink, variant(ReportKind::ProductHourly), &config)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReportError>(),
            Some(ReportError::Config(ConfigError::Granularity { .. }))
        ));
    }
}
