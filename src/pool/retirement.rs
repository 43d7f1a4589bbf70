//! 代理下线
//!
//! 远端永久拒绝某个代理的设备时，将其从候选列表和分配关系中移除，
//! 并在失效日志中追加一行记录。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::assignment::{AssignmentStore, StoreError};
use super::proxy_list::ProxyList;

/// 下线过程中失败的步骤
///
/// 每一步都会执行，失败的步骤不会影响后续步骤。
#[derive(Debug, Error)]
#[error("代理下线未完全完成: {}", join_errors(.0))]
pub struct RetirementError(pub Vec<StoreError>);

fn join_errors(errors: &[StoreError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// 一次下线的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Retired {
    /// 是否从候选列表中删除
    pub removed_from_list: bool,
    /// 原持有该代理的账号
    pub former_owner: Option<String>,
}

impl Retired {
    /// 代理原本就不存在
    pub fn is_noop(&self) -> bool {
        !self.removed_from_list && self.former_owner.is_none()
    }
}

pub struct ProxyRetirement {
    store: Arc<AssignmentStore>,
    proxy_list: ProxyList,
    failure_log: PathBuf,
    lock: Mutex<()>,
}

impl ProxyRetirement {
    pub fn new<P: AsRef<Path>>(
        store: Arc<AssignmentStore>,
        proxy_list: ProxyList,
        failure_log: P,
    ) -> Self {
        Self {
            store,
            proxy_list,
            failure_log: failure_log.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    /// 下线代理
    ///
    /// 幂等：代理已经不存在时不做任何修改，也不写日志。
    pub async fn retire(&self, proxy: &str) -> Result<Retired, RetirementError> {
        let _guard = self.lock.lock().await;
        let mut errors = Vec::new();
        let mut retired = Retired::default();

        match self.proxy_list.remove(proxy).await {
            Ok(removed) => retired.removed_from_list = removed,
            Err(e) => errors.push(e),
        }

        let mut former_owner = None;
        let update = self
            .store
            .try_update(|assignment| {
                former_owner = assignment.remove_proxy(proxy);
                Ok::<_, StoreError>(former_owner.is_some())
            })
            .await;
        match update {
            Ok(_) => retired.former_owner = former_owner,
            Err(e) => errors.push(e),
        }

        if !retired.is_noop() || !errors.is_empty() {
            if let Err(e) = self.append_failure_log(proxy).await {
                errors.push(e);
            }
        }

        if errors.is_empty() {
            tracing::info!(
                proxy = %proxy,
                owner = ?retired.former_owner,
                "代理已下线"
            );
            Ok(retired)
        } else {
            Err(RetirementError(errors))
        }
    }

    async fn append_failure_log(&self, proxy: &str) -> Result<(), StoreError> {
        let line = format!(
            "{} - Proxy broken: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            proxy
        );
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.failure_log)
            .await
            .map_err(|e| StoreError::io(&self.failure_log, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| StoreError::io(&self.failure_log, e))?;
        file.flush()
            .await
            .map_err(|e| StoreError::io(&self.failure_log, e))?;
        Ok(())
    }
}
