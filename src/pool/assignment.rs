//! 账号与代理的分配关系及其持久化
//!
//! 分配关系是唯一需要跨重启保存的状态：账号 -> 代理列表。
//! 所有修改都先作用于副本，写盘成功后才替换内存中的状态，
//! 因此写盘失败不会让内存与磁盘产生分歧。

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

/// 持久化错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("读写文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("分配文件格式错误: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// 账号 -> 代理集合
///
/// 不变量：
/// - 一个代理最多属于一个账号
/// - 不存在代理列表为空的账号
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignment(BTreeMap<String, Vec<String>>);

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains_account(&self, account: &str) -> bool {
        self.0.contains_key(account)
    }

    #[cfg(test)]
    pub fn proxies_of(&self, account: &str) -> Option<&[String]> {
        self.0.get(account).map(Vec::as_slice)
    }

    /// 已被分配的全部代理
    pub fn assigned_proxies(&self) -> HashSet<&str> {
        self.0
            .values()
            .flat_map(|proxies| proxies.iter().map(String::as_str))
            .collect()
    }

    /// 代理总数
    pub fn proxy_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// 查找持有该代理的账号
    pub fn owner_of(&self, proxy: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, proxies)| proxies.iter().any(|p| p == proxy))
            .map(|(account, _)| account.as_str())
    }

    /// 为账号设置代理列表，空列表等价于移除账号
    pub fn insert(&mut self, account: impl Into<String>, proxies: Vec<String>) {
        let account = account.into();
        if proxies.is_empty() {
            self.0.remove(&account);
        } else {
            self.0.insert(account, proxies);
        }
    }

    /// 移除代理，返回原持有账号
    ///
    /// 账号的代理列表变空时整条记录一起删除。
    pub fn remove_proxy(&mut self, proxy: &str) -> Option<String> {
        let owner = self.owner_of(proxy)?.to_string();
        let emptied = match self.0.get_mut(&owner) {
            Some(proxies) => {
                proxies.retain(|p| p != proxy);
                proxies.is_empty()
            }
            None => false,
        };
        if emptied {
            self.0.remove(&owner);
        }
        Some(owner)
    }

    /// 遍历所有 (账号, 代理) 对
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().flat_map(|(account, proxies)| {
            proxies
                .iter()
                .map(move |proxy| (account.as_str(), proxy.as_str()))
        })
    }
}

/// 分配关系存储
///
/// 内部锁保护"读取-修改-写回"的完整过程，多个 worker 并发下线代理时
/// 不会出现后写覆盖先写的情况。
pub struct AssignmentStore {
    path: PathBuf,
    current: Mutex<Assignment>,
}

impl AssignmentStore {
    /// 打开存储，文件不存在或为空时视为空分配
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let current = Self::load(&path)?;
        Ok(Self {
            path,
            current: Mutex::new(current),
        })
    }

    /// 从文件读取分配关系
    pub fn load(path: &Path) -> Result<Assignment, StoreError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Assignment::new()),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        if content.trim().is_empty() {
            return Ok(Assignment::new());
        }
        let mut assignment: Assignment = serde_json::from_str(&content)?;
        // 历史文件中可能残留空列表
        assignment.0.retain(|_, proxies| !proxies.is_empty());
        Ok(assignment)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 当前分配关系的快照
    #[cfg(test)]
    pub async fn snapshot(&self) -> Assignment {
        self.current.lock().await.clone()
    }

    /// 在锁内修改分配关系并写回磁盘
    ///
    /// `mutate` 返回 `Ok(true)` 表示有改动，需要写盘；`Ok(false)` 不写盘。
    /// 写盘失败时内存状态保持不变。返回修改后的快照。
    pub async fn try_update<F, E>(&self, mutate: F) -> Result<Assignment, E>
    where
        F: FnOnce(&mut Assignment) -> Result<bool, E>,
        E: From<StoreError>,
    {
        let mut current = self.current.lock().await;
        let mut next = current.clone();
        if mutate(&mut next)? {
            self.persist(&next).await?;
            *current = next;
        }
        Ok(current.clone())
    }

    /// 整体覆盖写入：先写临时文件再重命名
    async fn persist(&self, assignment: &Assignment) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(assignment)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        tracing::debug!("分配关系已写入 {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Assignment {
        let mut assignment = Assignment::new();
        assignment.insert("alice", vec!["p1".to_string(), "p2".to_string()]);
        assignment.insert("bob", vec!["p3".to_string()]);
        assignment
    }

    #[test]
    fn test_remove_proxy_shrinks_account() {
        let mut assignment = sample();
        assert_eq!(assignment.remove_proxy("p1"), Some("alice".to_string()));
        assert_eq!(assignment.proxies_of("alice"), Some(&["p2".to_string()][..]));
    }

    #[test]
    fn test_remove_last_proxy_drops_account() {
        let mut assignment = sample();
        assert_eq!(assignment.remove_proxy("p3"), Some("bob".to_string()));
        assert!(!assignment.contains_account("bob"));
        assert_eq!(assignment.remove_proxy("p3"), None);
    }

    #[test]
    fn test_insert_empty_is_removal() {
        let mut assignment = sample();
        assignment.insert("alice", Vec::new());
        assert!(!assignment.contains_account("alice"));
    }

    #[test]
    fn test_pairs() {
        let binding = sample();
        let pairs: Vec<_> = binding.pairs().collect();
        assert_eq!(pairs, vec![("alice", "p1"), ("alice", "p2"), ("bob", "p3")]);
    }

    #[test]
    fn test_open_missing_and_empty_file() {
        let dir = TempDir::new().unwrap();
        let missing = AssignmentStore::load(&dir.path().join("none.json")).unwrap();
        assert!(missing.is_empty());

        let empty = dir.path().join("empty.json");
        std::fs::write(&empty, "").unwrap();
        assert!(AssignmentStore::load(&empty).unwrap().is_empty());
    }

    #[test]
    fn test_load_drops_empty_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        std::fs::write(&path, r#"{"alice": ["p1"], "bob": []}"#).unwrap();
        let assignment = AssignmentStore::load(&path).unwrap();
        assert!(assignment.contains_account("alice"));
        assert!(!assignment.contains_account("bob"));
    }

    #[tokio::test]
    async fn test_try_update_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        let store = AssignmentStore::open(&path).unwrap();

        store
            .try_update(|a| {
                *a = sample();
                Ok::<_, StoreError>(true)
            })
            .await
            .unwrap();

        assert_eq!(AssignmentStore::load(&path).unwrap(), sample());
        assert_eq!(store.snapshot().await, sample());
    }

    #[tokio::test]
    async fn test_try_update_without_change_skips_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        let store = AssignmentStore::open(&path).unwrap();

        store
            .try_update(|_| Ok::<_, StoreError>(false))
            .await
            .unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_memory_state() {
        let dir = TempDir::new().unwrap();
        // 父目录不存在，写盘必然失败
        let path = dir.path().join("missing").join("a.json");
        let store = AssignmentStore::open(&path).unwrap();

        let result = store
            .try_update(|a| {
                *a = sample();
                Ok::<_, StoreError>(true)
            })
            .await;
        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert!(store.snapshot().await.is_empty());
    }
}
