//! 远端协议消息
//!
//! 出站心跳：`{id, version, action: "PING", data: {}}`
//! 入站 AUTH：`{id, action: "AUTH"}`，应答 `{id, origin_action: "AUTH", result: {...}}`
//! 入站 PONG：`{id, action: "PONG"}`，应答 `{id, origin_action: "PONG"}`

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::model::config::Config;

/// 入站消息动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// 认证挑战
    Auth,
    /// 远端发起的心跳探测
    Pong,
    /// 未知动作，忽略
    Unknown,
}

impl Action {
    pub fn from_str(s: &str) -> Self {
        match s {
            "AUTH" => Self::Auth,
            "PONG" => Self::Pong,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "AUTH",
            Self::Pong => "PONG",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 入站消息
///
/// 只关心 `id` 与 `action`，其余字段忽略。
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub action: Option<Value>,
}

impl InboundMessage {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn action(&self) -> Action {
        match &self.action {
            Some(Value::String(action)) => Action::from_str(action),
            _ => Action::Unknown,
        }
    }
}

/// 出站心跳
#[derive(Debug, Clone, Serialize)]
pub struct PingMessage {
    pub id: String,
    pub version: String,
    pub action: &'static str,
    pub data: Value,
}

impl PingMessage {
    /// 每次心跳使用新的随机 id，与入站关联 id 无关
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            version: version.into(),
            action: "PING",
            data: Value::Object(Default::default()),
        }
    }
}

/// AUTH 应答中的设备与客户端信息
#[derive(Debug, Clone, Serialize)]
pub struct AuthResult {
    pub browser_id: String,
    pub user_id: String,
    pub user_agent: String,
    pub timestamp: i64,
    pub device_type: String,
    pub version: String,
    pub extension_id: String,
}

/// 对入站消息的应答
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub id: Value,
    pub origin_action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AuthResult>,
}

impl Reply {
    /// AUTH 挑战应答
    pub fn auth(id: Value, device_id: &str, account: &str, config: &Config) -> Self {
        Self {
            id,
            origin_action: Action::Auth.as_str(),
            result: Some(AuthResult {
                browser_id: device_id.to_string(),
                user_id: account.to_string(),
                user_agent: config.user_agent.clone(),
                timestamp: chrono::Utc::now().timestamp(),
                device_type: config.device_type.clone(),
                version: config.client_version.clone(),
                extension_id: config.extension_id.clone(),
            }),
        }
    }

    /// PONG 确认
    pub fn pong(id: Value) -> Self {
        Self {
            id,
            origin_action: Action::Pong.as_str(),
            result: None,
        }
    }
}
