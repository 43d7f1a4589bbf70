//! 代理分配算法
//!
//! 把尚未分配的代理尽量平均地分给尚未分配过的账号：
//! 每个新账号得到 `base` 个，前 `extra` 个账号各多得一个。
//! 已经分到过代理的账号不会再参与分配，也不会被重新平衡。

use std::collections::HashSet;
use thiserror::Error;

use super::assignment::{Assignment, AssignmentStore, StoreError};

/// 分配错误
#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("代理数量不足: {proxies} 个未分配代理无法覆盖 {accounts} 个新账号")]
    Capacity { proxies: usize, accounts: usize },
    #[error(transparent)]
    Persist(#[from] StoreError),
}

/// 执行一次分配并写回存储
///
/// `rng` 决定代理的打乱顺序，传入固定种子即可复现分配结果。
/// 代理不足时不做任何写入。
pub async fn allocate(
    accounts: &[String],
    candidates: &[String],
    store: &AssignmentStore,
    rng: &mut fastrand::Rng,
) -> Result<Assignment, AllocationError> {
    store
        .try_update(|assignment| {
            let added = extend_assignment(accounts, candidates, assignment, rng)?;
            if added > 0 {
                tracing::info!(
                    "已为 {} 个新账号分配代理，共 {} 个账号",
                    added,
                    assignment.len()
                );
            } else {
                tracing::info!("所有代理均已分配或没有未分配的账号");
            }
            Ok(added > 0)
        })
        .await
}

/// 在给定分配关系上追加新账号，返回新增账号数
pub fn extend_assignment(
    accounts: &[String],
    candidates: &[String],
    assignment: &mut Assignment,
    rng: &mut fastrand::Rng,
) -> Result<usize, AllocationError> {
    let assigned = assignment.assigned_proxies();
    let mut seen = HashSet::new();
    let unassigned_proxies: Vec<String> = candidates
        .iter()
        .filter(|proxy| !assigned.contains(proxy.as_str()))
        .filter(|proxy| seen.insert(proxy.as_str()))
        .cloned()
        .collect();

    let mut seen = HashSet::new();
    let unassigned_accounts: Vec<String> = accounts
        .iter()
        .filter(|account| !assignment.contains_account(account))
        .filter(|account| seen.insert(account.as_str()))
        .cloned()
        .collect();

    if unassigned_proxies.is_empty() || unassigned_accounts.is_empty() {
        return Ok(0);
    }

    let added = unassigned_accounts.len();
    for (account, proxies) in distribute(unassigned_accounts, unassigned_proxies, rng)? {
        assignment.insert(account, proxies);
    }
    Ok(added)
}

/// 打乱代理后用一个前进的游标顺序切分给各账号
fn distribute(
    accounts: Vec<String>,
    mut proxies: Vec<String>,
    rng: &mut fastrand::Rng,
) -> Result<Vec<(String, Vec<String>)>, AllocationError> {
    if proxies.len() < accounts.len() {
        return Err(AllocationError::Capacity {
            proxies: proxies.len(),
            accounts: accounts.len(),
        });
    }

    let base = proxies.len() / accounts.len();
    let extra = proxies.len() % accounts.len();

    rng.shuffle(&mut proxies);

    let mut cursor = proxies.into_iter();
    let result = accounts
        .into_iter()
        .enumerate()
        .map(|(index, account)| {
            let take = if index < extra { base + 1 } else { base };
            let share: Vec<String> = cursor.by_ref().take(take).collect();
            (account, share)
        })
        .collect();
    Ok(result)
}
