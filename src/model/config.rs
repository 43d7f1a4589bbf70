use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 节点运行配置
///
/// 客户端签名（User-Agent、扩展 ID、版本号）必须与远端白名单一致，
/// 因此作为配置项而不是推导数据。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_remote_host")]
    pub remote_host: String,

    /// 远端可用端口，每次连接随机选择一个
    #[serde(default = "default_remote_ports")]
    pub remote_ports: Vec<u16>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// 浏览器扩展 ID（同时用于 Origin 头）
    #[serde(default = "default_extension_id")]
    pub extension_id: String,

    /// 客户端版本（AUTH 响应中的 version）
    #[serde(default = "default_client_version")]
    pub client_version: String,

    #[serde(default = "default_device_type")]
    pub device_type: String,

    /// 出站消息的协议版本
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,

    /// 心跳间隔（秒）
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    /// 连接前随机延迟下限（毫秒）
    #[serde(default = "default_jitter_min_ms")]
    pub jitter_min_ms: u64,

    /// 连接前随机延迟上限（毫秒）
    #[serde(default = "default_jitter_max_ms")]
    pub jitter_max_ms: u64,

    /// 是否跳过 TLS 证书与主机名校验
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
}

impl Config {
    /// 从环境变量覆盖配置
    pub fn override_from_env(&mut self) {
        if let Ok(host) = env::var("REMOTE_HOST") {
            self.remote_host = host;
        }
        if let Ok(ports) = env::var("REMOTE_PORTS") {
            let parsed: Vec<u16> = ports
                .split(',')
                .filter_map(|p| p.trim().parse().ok())
                .collect();
            if !parsed.is_empty() {
                self.remote_ports = parsed;
            }
        }
        if let Ok(user_agent) = env::var("USER_AGENT") {
            self.user_agent = user_agent;
        }
        if let Ok(extension_id) = env::var("EXTENSION_ID") {
            self.extension_id = extension_id;
        }
        if let Ok(version) = env::var("CLIENT_VERSION") {
            self.client_version = version;
        }
        if let Ok(interval) = env::var("PING_INTERVAL_SECS") {
            if let Ok(secs) = interval.parse() {
                self.ping_interval_secs = secs;
            }
        }
    }

    /// 心跳间隔
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs.max(1))
    }

    /// 生成一次连接前的随机延迟
    pub fn connect_jitter(&self, rng: &mut fastrand::Rng) -> Duration {
        let (low, high) = if self.jitter_min_ms <= self.jitter_max_ms {
            (self.jitter_min_ms, self.jitter_max_ms)
        } else {
            (self.jitter_max_ms, self.jitter_min_ms)
        };
        Duration::from_millis(rng.u64(low..=high))
    }

    /// 随机选择一个远端端口
    pub fn pick_port(&self, rng: &mut fastrand::Rng) -> u16 {
        if self.remote_ports.is_empty() {
            return default_remote_ports()[0];
        }
        self.remote_ports[rng.usize(..self.remote_ports.len())]
    }

    /// WebSocket 握手使用的 Origin
    pub fn origin(&self) -> String {
        format!("chrome-extension://{}", self.extension_id)
    }
}

fn default_remote_host() -> String {
    "proxy2.wynd.network".to_string()
}

fn default_remote_ports() -> Vec<u16> {
    vec![4444, 4650]
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36".to_string()
}

fn default_extension_id() -> String {
    "lkbnfiajjmbhnfledhphioinpickokdi".to_string()
}

fn default_client_version() -> String {
    "4.26.2".to_string()
}

fn default_device_type() -> String {
    "extension".to_string()
}

fn default_protocol_version() -> String {
    "1.0.0".to_string()
}

fn default_ping_interval_secs() -> u64 {
    60
}

fn default_jitter_min_ms() -> u64 {
    100
}

fn default_jitter_max_ms() -> u64 {
    1000
}

fn default_accept_invalid_certs() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote_host: default_remote_host(),
            remote_ports: default_remote_ports(),
            user_agent: default_user_agent(),
            extension_id: default_extension_id(),
            client_version: default_client_version(),
            device_type: default_device_type(),
            protocol_version: default_protocol_version(),
            ping_interval_secs: default_ping_interval_secs(),
            jitter_min_ms: default_jitter_min_ms(),
            jitter_max_ms: default_jitter_max_ms(),
            accept_invalid_certs: default_accept_invalid_certs(),
        }
    }
}

impl Config {
    /// 获取默认配置文件路径
    pub fn default_config_path() -> &'static str {
        "config.json"
    }

    /// 从文件加载配置
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            // 配置文件不存在，返回默认配置
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }
}
