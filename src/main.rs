//! rsdispensary 命令行入口

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rsdispensary::{
    ConfigManager, DateKey, MapLoader, MsgPackSnapshotStore, Orchestrator, ReplayAdapter, VendorSchema,
};

#[derive(Parser)]
#[command(name = "rsdispensary", version)]
#[command(about = "药房商品目录标准化与聚合流水线")]
struct Cli {
    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行一次流水线：命中当日快照直接读取，否则回放数据源并写入快照
    Run {
        /// 日期键（YYYY-MM-DD），默认今天
        #[arg(long)]
        date: Option<DateKey>,
        /// 快照目录
        #[arg(long, default_value = "data/snapshots")]
        snapshot_dir: PathBuf,
        /// 回放根目录，每个数据源一个子目录
        #[arg(long, default_value = "data/raw")]
        replay_dir: PathBuf,
        /// 数据源，格式 NAME=SCHEMA（可重复）
        #[arg(long = "source", value_parser = parse_source)]
        sources: Vec<(String, VendorSchema)>,
        /// 映射表覆盖文件（JSON）
        #[arg(long)]
        maps: Option<PathBuf>,
        /// 当日快照缺失时复用最近一次快照
        #[arg(long)]
        latest: bool,
        /// 单个数据源截止时间（秒）
        #[arg(long, default_value_t = 600)]
        adapter_timeout: u64,
        /// 将结果表写为 JSON
        #[arg(long)]
        table_out: Option<PathBuf>,
    },
    /// 打印映射表统计
    Maps {
        /// 映射表覆盖文件（JSON）
        #[arg(long)]
        maps: Option<PathBuf>,
    },
}

fn parse_source(raw: &str) -> Result<(String, VendorSchema), String> {
    let (name, schema) = raw
        .split_once('=')
        .ok_or_else(|| format!("数据源格式应为 NAME=SCHEMA：{}", raw))?;
    let schema = schema.parse::<VendorSchema>().map_err(|e| e.to_string())?;
    Ok((name.trim().to_string(), schema))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run {
            date,
            snapshot_dir,
            replay_dir,
            sources,
            maps,
            latest,
            adapter_timeout,
            table_out,
        } => {
            let config = ConfigManager::custom()
                .snapshot_dir(snapshot_dir)
                .maps_path(maps)
                .use_latest_snapshot(latest)
                .adapter_timeout(adapter_timeout)
                .verbose(cli.verbose)
                .build();

            let mut builder = Orchestrator::builder()
                .sink(MsgPackSnapshotStore::from_config(&config))
                .config(config);
            for (name, schema) in sources {
                let adapter = ReplayAdapter::new(name.clone(), replay_dir.join(&name), schema);
                builder = builder.adapter(adapter, Vec::new());
            }
            let orchestrator = builder.build().await.context("初始化编排器失败")?;

            let date_key = date.unwrap_or_else(DateKey::today);
            let outcome = orchestrator.run(date_key).await?;
            print!("{}", outcome.report);
            println!("共 {} 条记录", outcome.dataset.len());

            if let Some(path) = table_out {
                let table = outcome.dataset.to_table();
                let json = serde_json::to_vec_pretty(&table)?;
                tokio::fs::write(&path, json)
                    .await
                    .with_context(|| format!("写入 {} 失败", path.display()))?;
                println!("结果表已写入 {}", path.display());
            }
        }
        Commands::Maps { maps } => {
            let config = ConfigManager::custom().maps_path(maps).build();
            let compiled = MapLoader::load(&config).await?;
            println!("{}", compiled.stats());
        }
    }
    Ok(())
}
