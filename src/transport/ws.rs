//! TLS WebSocket 连接器

use futures::future::{self, BoxFuture};
use futures::{FutureExt, SinkExt, StreamExt};
use http::header::{ORIGIN, USER_AGENT};
use http::HeaderValue;
use std::sync::Arc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{client_async_tls_with_config, Connector as TlsConnector};

use super::proxy::ProxyConfig;
use super::tunnel::open_tunnel;
use super::{Connector, Session, TransportError};
use crate::model::config::Config;

/// 通过代理连接远端 WebSocket
///
/// TLS 在代理隧道之上建立，SNI 使用远端主机名。
pub struct WsConnector {
    config: Arc<Config>,
    tls: native_tls::TlsConnector,
}

impl WsConnector {
    pub fn new(config: Arc<Config>) -> Result<Self, TransportError> {
        let tls = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .danger_accept_invalid_hostnames(config.accept_invalid_certs)
            .build()?;
        Ok(Self { config, tls })
    }

    /// 远端地址
    pub fn endpoint(&self, port: u16) -> String {
        format!("wss://{}:{}/", self.config.remote_host, port)
    }

    async fn open(&self, descriptor: &str) -> Result<Session, TransportError> {
        let proxy = ProxyConfig::parse(descriptor)?;
        let port = self.config.pick_port(&mut fastrand::Rng::new());
        let url = self.endpoint(port);

        let mut request = url.as_str().into_client_request()?;
        let headers = request.headers_mut();
        headers.insert(USER_AGENT, HeaderValue::from_str(&self.config.user_agent)?);
        headers.insert(ORIGIN, HeaderValue::from_str(&self.config.origin())?);

        let tunnel = open_tunnel(&proxy, &self.config.remote_host, port).await?;
        let connector = TlsConnector::NativeTls(self.tls.clone());
        let (stream, response) =
            match client_async_tls_with_config(request, tunnel, None, Some(connector)).await {
                Ok(connected) => connected,
                Err(WsError::Http(response)) => return Err(rejected(&response)),
                Err(e) => return Err(e.into()),
            };
        tracing::debug!(proxy = %descriptor, url = %url, status = %response.status(), "WebSocket 已连接");

        let (write, read) = stream.split();
        let sink = write
            .sink_map_err(TransportError::from)
            .with(|text: String| future::ready(Ok::<_, TransportError>(Message::Text(text))));
        let source = read.filter_map(|msg| future::ready(inbound(msg))).boxed();

        Ok(Session {
            sink: Box::pin(sink),
            source,
        })
    }
}

impl Connector for WsConnector {
    fn connect<'a>(&'a self, proxy: &'a str) -> BoxFuture<'a, Result<Session, TransportError>> {
        self.open(proxy).boxed()
    }
}

/// 握手阶段远端返回非 101 响应
fn rejected(response: &http::Response<Option<Vec<u8>>>) -> TransportError {
    let body = response
        .body()
        .as_deref()
        .map(|body| String::from_utf8_lossy(body).into_owned())
        .unwrap_or_default();
    TransportError::Rejected {
        status: response.status().as_u16(),
        body,
    }
}

/// 将 WebSocket 帧映射为文本消息，控制帧忽略
///
/// 关闭帧转为错误，关闭原因会参与上层的失败分类。
fn inbound(msg: Result<Message, WsError>) -> Option<Result<String, TransportError>> {
    match msg {
        Ok(Message::Text(text)) => Some(Ok(text)),
        Ok(Message::Binary(data)) => Some(Ok(String::from_utf8_lossy(&data).into_owned())),
        Ok(Message::Close(frame)) => {
            let (code, reason) = frame
                .map(|f| (u16::from(f.code), f.reason.into_owned()))
                .unwrap_or((1005, String::new()));
            Some(Err(TransportError::Closed { code, reason }))
        }
        Ok(_) => None,
        Err(e) => Some(Err(e.into())),
    }
}
