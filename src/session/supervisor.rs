//! 按分配关系启动并托管全部连接 worker

use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::worker::{ConnectionWorker, WorkerExit};
use crate::model::config::Config;
use crate::pool::{Assignment, ProxyRetirement};
use crate::transport::Connector;

/// 托管结束时的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupervisorReport {
    pub spawned: usize,
    pub retired: usize,
    pub cancelled: usize,
    pub panicked: usize,
}

pub struct Supervisor {
    config: Arc<Config>,
    connector: Arc<dyn Connector>,
    retirement: Arc<ProxyRetirement>,
    cancel: CancellationToken,
}

impl Supervisor {
    pub fn new(
        config: Arc<Config>,
        connector: Arc<dyn Connector>,
        retirement: Arc<ProxyRetirement>,
    ) -> Self {
        Self {
            config,
            connector,
            retirement,
            cancel: CancellationToken::new(),
        }
    }

    /// 停止信号，取消后所有 worker 及其心跳任务都会退出
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 为每个 (账号, 代理) 启动一个 worker，等待全部退出
    ///
    /// 正常代理的 worker 不会主动退出，因此通常会一直运行到进程被停止。
    pub async fn run(&self, assignment: &Assignment) -> SupervisorReport {
        let mut report = SupervisorReport::default();
        let mut workers = JoinSet::new();

        for (account, proxy) in assignment.pairs() {
            let mut worker = ConnectionWorker::new(
                account,
                proxy,
                self.config.clone(),
                self.connector.clone(),
                self.retirement.clone(),
            );
            let cancel = self.cancel.child_token();
            let proxy = proxy.to_string();
            workers.spawn(async move { (proxy, worker.run(cancel).await) });
            report.spawned += 1;
        }
        info!(
            "已启动 {} 个连接，涉及 {} 个账号",
            report.spawned,
            assignment.len()
        );

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((proxy, WorkerExit::Retired)) => {
                    report.retired += 1;
                    info!(proxy = %proxy, "连接已终止，剩余 {} 个", workers.len());
                }
                Ok((_, WorkerExit::Cancelled)) => report.cancelled += 1,
                Err(e) => {
                    report.panicked += 1;
                    error!("连接任务异常退出: {}", e);
                }
            }
        }
        report
    }
}
