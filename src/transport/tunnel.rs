//! 经代理建立到远端的 TCP 隧道

use async_http_proxy::{http_connect_tokio, http_connect_tokio_with_basic_auth};
use tokio::net::TcpStream;
use tokio_socks::tcp::Socks5Stream;

use super::proxy::{ProxyConfig, ProxyScheme};
use super::TransportError;

/// 通过代理打开到 `host:port` 的隧道
pub async fn open_tunnel(
    proxy: &ProxyConfig,
    host: &str,
    port: u16,
) -> Result<TcpStream, TransportError> {
    let mut socket = TcpStream::connect(proxy.address()).await?;
    socket.set_nodelay(true)?;

    let credentials = proxy.username.as_deref().zip(proxy.password.as_deref());
    match proxy.scheme {
        ProxyScheme::Http => {
            match credentials {
                Some((username, password)) => {
                    http_connect_tokio_with_basic_auth(&mut socket, host, port, username, password)
                        .await?
                }
                None => http_connect_tokio(&mut socket, host, port).await?,
            }
            Ok(socket)
        }
        ProxyScheme::Socks5 => {
            let stream = match credentials {
                Some((username, password)) => {
                    Socks5Stream::connect_with_password_and_socket(
                        socket,
                        (host, port),
                        username,
                        password,
                    )
                    .await?
                }
                None => Socks5Stream::connect_with_socket(socket, (host, port)).await?,
            };
            Ok(stream.into_inner())
        }
    }
}
