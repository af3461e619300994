//! USD-M 선물 아카이브 동기화 CLI.

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use ctrade_core::{init_logging, BarInterval, DatasetKind, LogConfig, LogFormat};
use ctrade_collector::config::DEFAULT_CONFIG_PATH;
use ctrade_collector::modules::{self, SyncContext};
use ctrade_collector::{CollectorConfig, SyncOverrides};
use ctrade_data::Database;

#[derive(Parser)]
#[command(name = "ctrade-collector")]
#[command(about = "Binance USD-M futures archive → TimescaleDB incremental sync", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 설정 파일 경로 (없으면 기본값 + 환경변수)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long, global = true, default_value = "compact")]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// 원격 아카이브 증분 동기화
    Sync(SyncArgs),

    /// 이미 다운로드된 로컬 아티팩트 적재 (네트워크 없음)
    Import(SyncArgs),

    /// 엔진 뷰 재생성
    Views,

    /// 심볼/데이터셋별 워터마크 및 압축 상태
    Status {
        /// 대상 심볼 (생략 시 설정값)
        symbols: Vec<String>,

        /// JSON 출력
        #[arg(long)]
        json: bool,
    },

    /// 데몬 모드: 주기적으로 동기화 실행
    Daemon(SyncArgs),
}

#[derive(Args, Default)]
struct SyncArgs {
    /// 대상 심볼 (생략 시 설정값)
    symbols: Vec<String>,

    /// 시작일 (YYYY-MM-DD, 포함)
    #[arg(long, value_parser = parse_date)]
    start: Option<NaiveDate>,

    /// 종료일 (YYYY-MM-DD, 포함, 기본: 오늘 UTC)
    #[arg(long, value_parser = parse_date)]
    end: Option<NaiveDate>,

    /// 데이터셋 (쉼표로 구분, 예: "klines,bookDepth")
    #[arg(long, value_delimiter = ',', value_parser = parse_dataset)]
    datasets: Option<Vec<DatasetKind>>,

    /// kline 계열 봉 간격 (예: 1m, 1h)
    #[arg(long, value_parser = parse_interval)]
    interval: Option<BarInterval>,

    /// 동시 다운로드 수
    #[arg(long)]
    fetch_concurrency: Option<usize>,

    /// 동시 적재 파일 수
    #[arg(long)]
    load_concurrency: Option<usize>,

    /// 로컬 아티팩트 루트
    #[arg(long)]
    data_root: Option<PathBuf>,
}

impl From<SyncArgs> for SyncOverrides {
    fn from(args: SyncArgs) -> Self {
        Self {
            symbols: args.symbols,
            datasets: args.datasets,
            interval: args.interval,
            start_date: args.start,
            end_date: args.end,
            fetch_concurrency: args.fetch_concurrency,
            load_concurrency: args.load_concurrency,
            data_root: args.data_root,
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    ctrade_core::parse_date(s).map_err(|e| e.to_string())
}

fn parse_dataset(s: &str) -> Result<DatasetKind, String> {
    s.parse().map_err(|e: ctrade_core::CoreError| e.to_string())
}

fn parse_interval(s: &str) -> Result<BarInterval, String> {
    s.parse().map_err(|e: ctrade_core::CoreError| e.to_string())
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log = LogConfig::new(cli.log_level.clone()).with_format(cli.log_format);
    if let Err(e) = init_logging(log) {
        eprintln!("로깅 초기화 실패: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = format!("{:#}", e), "실행 실패");
            ExitCode::FAILURE
        }
    }
}

/// 명령을 실행합니다. 부분 실패가 있으면 `Ok(false)`.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    tracing::info!("ctrade Collector 시작");

    // 설정 로드
    let mut config = CollectorConfig::load(&cli.config).context("설정 로드 실패")?;

    let ok = match cli.command {
        Commands::Sync(args) => {
            config.apply_overrides(args.into())?;
            let (db, ctx) = connect(&config).await?;

            let range = config.date_range(today())?;
            let summary = modules::sync_all(&ctx, &config.symbols(), &range).await;
            summary.log_summary("sync");

            db.close().await;
            !summary.has_failures()
        }
        Commands::Import(args) => {
            config.apply_overrides(args.into())?;
            let (db, ctx) = connect(&config).await?;

            let range = config.date_range(today())?;
            let summary = modules::import_all(&ctx, &config.symbols(), &range).await;
            summary.log_summary("import");

            db.close().await;
            !summary.has_failures()
        }
        Commands::Views => {
            let (db, ctx) = connect(&config).await?;

            let stats = modules::refresh_views(&ctx.schema, &ctx.registry).await;
            stats.log_summary();

            db.close().await;
            stats.failed == 0
        }
        Commands::Status { symbols, json } => {
            config.apply_overrides(SyncOverrides {
                symbols,
                ..Default::default()
            })?;
            let (db, ctx) = connect(&config).await?;

            let rows = modules::collect_status(&ctx, &config.symbols()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for row in &rows {
                    println!("{}", row.render());
                }
            }

            db.close().await;
            true
        }
        Commands::Daemon(args) => {
            config.apply_overrides(args.into())?;
            let (db, ctx) = connect(&config).await?;
            run_daemon(&config, &ctx).await;
            db.close().await;
            true
        }
    };

    tracing::info!("ctrade Collector 종료");
    Ok(ok)
}

/// 데이터베이스에 연결하고 동기화 구성 요소를 만듭니다.
async fn connect(config: &CollectorConfig) -> anyhow::Result<(Database, SyncContext)> {
    let db = Database::connect(&config.database)
        .await
        .context("데이터베이스 연결 실패")?;
    db.health_check().await.context("데이터베이스 상태 확인 실패")?;
    tracing::info!("데이터베이스 연결 성공");

    let ctx = SyncContext::new(db.pool(), config)?;
    Ok((db, ctx))
}

/// 종료 신호까지 주기적으로 동기화합니다.
///
/// 종료일을 지정하지 않았다면 매 실행마다 오늘(UTC)까지로 갱신됩니다.
async fn run_daemon(config: &CollectorConfig, ctx: &SyncContext) {
    tracing::info!(
        "=== 데몬 모드 시작 (주기: {}분) ===",
        config.daemon.interval_minutes
    );

    let symbols = config.symbols();
    let mut interval = tokio::time::interval(config.daemon.interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("종료 신호 수신, 데몬 종료 중...");
                break;
            }
            _ = interval.tick() => {
                tracing::info!("=== 동기화 실행 시작 ===");

                match config.date_range(today()) {
                    Ok(range) => {
                        let summary = modules::sync_all(ctx, &symbols, &range).await;
                        summary.log_summary("daemon");
                    }
                    Err(e) => {
                        tracing::error!("날짜 범위 계산 실패: {}", e);
                    }
                }

                tracing::info!(
                    "=== 동기화 완료, 다음 실행: {}분 후 ===",
                    config.daemon.interval_minutes
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_sync_flags() {
        let cli = Cli::try_parse_from([
            "ctrade-collector",
            "sync",
            "BTCUSDT",
            "ETHUSDT",
            "--start",
            "2024-01-01",
            "--datasets",
            "klines,bookDepth",
            "--interval",
            "1h",
            "--fetch-concurrency",
            "4",
        ])
        .unwrap();

        let Commands::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        let overrides = SyncOverrides::from(args);
        assert_eq!(overrides.symbols, vec!["BTCUSDT", "ETHUSDT"]);
        assert_eq!(overrides.start_date, ctrade_core::parse_date("2024-01-01").ok());
        assert_eq!(
            overrides.datasets,
            Some(vec![DatasetKind::Klines, DatasetKind::BookDepth])
        );
        assert_eq!(overrides.interval, Some(BarInterval::H1));
        assert_eq!(overrides.fetch_concurrency, Some(4));
    }

    #[test]
    fn test_cli_rejects_bad_values() {
        assert!(Cli::try_parse_from(["ctrade-collector", "sync", "--start", "01/02/2024"]).is_err());
        assert!(Cli::try_parse_from(["ctrade-collector", "sync", "--datasets", "trades"]).is_err());
        assert!(Cli::try_parse_from(["ctrade-collector", "status", "--log-format", "xml"]).is_err());
    }
}
