mod model;
mod pool;
mod session;
mod transport;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use model::arg::Args;
use model::config::Config;
use pool::{allocate, read_entries, AssignmentStore, ProxyList, ProxyRetirement};
use session::Supervisor;
use transport::WsConnector;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| Config::default_config_path().to_string());
    let mut config = Config::load(&config_path)
        .with_context(|| format!("加载配置失败: {}", config_path))?;
    config.override_from_env();

    // 输入文件缺失或为空直接退出
    let accounts = read_entries(&args.accounts).unwrap_or_else(|e| {
        tracing::error!("{}", e);
        std::process::exit(1);
    });
    let proxies = read_entries(&args.proxies).unwrap_or_else(|e| {
        tracing::error!("{}", e);
        std::process::exit(1);
    });
    tracing::info!("读取到 {} 个账号，{} 个代理", accounts.len(), proxies.len());

    let store = Arc::new(
        AssignmentStore::open(&args.assignments)
            .with_context(|| format!("读取分配文件失败: {}", args.assignments))?,
    );

    let mut rng = match args.seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };
    let assignment = allocate(&accounts, &proxies, &store, &mut rng).await?;
    tracing::info!(
        "分配完成: {} 个账号，{} 个代理，保存于 {:?}",
        assignment.len(),
        assignment.proxy_count(),
        store.path()
    );

    if assignment.is_empty() {
        tracing::warn!("没有可运行的账号与代理组合");
        return Ok(());
    }

    let retirement = Arc::new(ProxyRetirement::new(
        store.clone(),
        ProxyList::new(&args.proxies),
        &args.failure_log,
    ));

    let config = Arc::new(config);
    let connector = Arc::new(WsConnector::new(config.clone())?);
    let supervisor = Supervisor::new(config, connector, retirement);

    let cancel = supervisor.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("收到退出信号，正在停止所有连接");
            cancel.cancel();
        }
    });

    let report = supervisor.run(&assignment).await;
    tracing::info!(
        "全部连接已退出: 启动 {}，下线 {}，停止 {}，异常 {}",
        report.spawned,
        report.retired,
        report.cancelled,
        report.panicked
    );
    Ok(())
}
