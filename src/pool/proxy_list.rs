//! 候选代理列表与账号列表文件

use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::assignment::StoreError;

/// 读取一行一条的输入文件
///
/// 文件不存在、为空或只有空行时返回错误。
pub fn read_entries<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<String>> {
    let path = path.as_ref();
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            anyhow::bail!("文件 {:?} 不存在或为空", path)
        }
        Err(e) => return Err(anyhow::Error::new(e).context(format!("读取 {:?} 失败", path))),
    };

    let entries: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if entries.is_empty() {
        anyhow::bail!("文件 {:?} 不存在或为空", path);
    }
    Ok(entries)
}

/// 持久化的候选代理列表
///
/// 下线的代理从文件中删除，之后的分配永远不会再用到它。
pub struct ProxyList {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ProxyList {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    /// 从文件中删除代理，返回是否确实删除了
    ///
    /// 代理不在列表中（或文件不存在）时不改写文件。
    pub async fn remove(&self, proxy: &str) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;

        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        let kept: Vec<&str> = content
            .lines()
            .filter(|line| line.trim() != proxy)
            .collect();
        if kept.len() == content.lines().count() {
            return Ok(false);
        }

        let mut rewritten = kept.join("\n");
        if !rewritten.is_empty() {
            rewritten.push('\n');
        }
        tokio::fs::write(&self.path, rewritten)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        Ok(true)
    }
}
