//! 经代理的加密消息流
//!
//! 对上层只暴露"通过代理 P 打开到远端的双向文本消息流"这一能力：
//! - `proxy`: 代理地址解析
//! - `tunnel`: HTTP CONNECT / SOCKS5 隧道
//! - `ws`: TLS WebSocket 连接器

pub mod proxy;
pub mod tunnel;
pub mod ws;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::Sink;
use std::pin::Pin;
use thiserror::Error;

pub use ws::WsConnector;

/// 传输层错误
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("代理地址无效: {0}")]
    InvalidProxy(String),
    #[error("HTTP 代理握手失败: {0}")]
    HttpProxy(#[from] async_http_proxy::HttpError),
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("SOCKS5 错误: {0}")]
    Socks(#[from] tokio_socks::Error),
    #[error("TLS 错误: {0}")]
    Tls(#[from] native_tls::Error),
    #[error("请求头无效: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),
    #[error("WebSocket 错误: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("远端拒绝握手: {status} {body}")]
    Rejected { status: u16, body: String },
    #[error("远端关闭连接: code={code}, reason={reason}")]
    Closed { code: u16, reason: String },
}

/// 出站方向
pub type MessageSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;

/// 入站方向，流结束表示连接关闭
pub type MessageSource = BoxStream<'static, Result<String, TransportError>>;

/// 一条已建立的双向消息流
pub struct Session {
    pub sink: MessageSink,
    pub source: MessageSource,
}

/// 连接器
///
/// 每次调用打开一条新的消息流，失败不做重试，由调用方决定。
pub trait Connector: Send + Sync {
    fn connect<'a>(&'a self, proxy: &'a str) -> BoxFuture<'a, Result<Session, TransportError>>;
}
