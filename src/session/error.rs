//! 会话错误与失败分类

use std::error::Error as _;
use thiserror::Error;

use crate::transport::TransportError;

/// 远端永久拒绝该代理设备时错误信息中出现的标记
///
/// 远端没有提供结构化的拒绝码，只能匹配文本，协议变化时需要同步修改。
pub const DEVICE_LIMIT_MARKER: &str = "Device creation limit exceeded";

/// 会话错误
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("无法解析的消息: {0}")]
    Malformed(String),
    #[error("连接已关闭")]
    Closed,
    #[error("心跳任务异常退出: {0}")]
    Heartbeat(String),
}

/// 失败类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 可恢复，重新连接
    Transient,
    /// 远端永久拒绝该代理，需下线
    ProxyRejected,
}

/// 对会话失败分类
///
/// 这是唯一检查错误文本的地方：传输层错误链中任意一层包含
/// [`DEVICE_LIMIT_MARKER`] 即视为代理被拒绝，其余一律可恢复。
/// 本地产生的错误（解析失败、流结束、心跳异常）不携带远端的拒绝信息。
pub fn classify(err: &SessionError) -> FailureKind {
    let SessionError::Transport(err) = err else {
        return FailureKind::Transient;
    };
    let mut current = Some(err as &(dyn std::error::Error + 'static));
    while let Some(e) = current {
        if e.to_string().contains(DEVICE_LIMIT_MARKER) {
            return FailureKind::ProxyRejected;
        }
        current = e.source();
    }
    FailureKind::Transient
}
