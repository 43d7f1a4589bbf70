//! 连接状态

/// 连接 worker 状态
///
/// `Idle -> Connecting -> Authenticating -> Active -> Backoff -> Connecting ...`，
/// `Retired` 为终态，只能从 `Connecting`、`Authenticating` 或 `Active` 进入。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    /// 尚未开始
    #[default]
    Idle,
    /// 正在建立连接
    Connecting,
    /// 已连接，等待认证挑战
    Authenticating,
    /// 已完成认证
    Active,
    /// 连接失败，等待重连
    Backoff,
    /// 代理已下线
    Retired,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Active => "active",
            Self::Backoff => "backoff",
            Self::Retired => "retired",
        }
    }

    /// 检查状态转移是否合法
    pub fn can_transition_to(&self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Idle, Connecting)
                | (Connecting, Authenticating)
                | (Connecting, Backoff)
                | (Connecting, Retired)
                | (Authenticating, Active)
                | (Authenticating, Backoff)
                | (Authenticating, Retired)
                | (Active, Backoff)
                | (Active, Retired)
                | (Backoff, Connecting)
        )
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retired_is_terminal() {
        for next in [
            WorkerState::Idle,
            WorkerState::Connecting,
            WorkerState::Active,
            WorkerState::Backoff,
        ] {
            assert!(!WorkerState::Retired.can_transition_to(next));
        }
    }

    #[test]
    fn test_retry_cycle() {
        assert!(WorkerState::Idle.can_transition_to(WorkerState::Connecting));
        assert!(WorkerState::Active.can_transition_to(WorkerState::Backoff));
        assert!(WorkerState::Backoff.can_transition_to(WorkerState::Connecting));
        assert!(!WorkerState::Backoff.can_transition_to(WorkerState::Retired));
        assert!(!WorkerState::Idle.can_transition_to(WorkerState::Active));
    }
}
