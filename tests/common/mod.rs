//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use subdomain_proxy::net::Listener;
use subdomain_proxy::{Proxy, ProxyConfig, ProxyError, RoutingTable, Shutdown};

pub const ROOT_DOMAIN: &str = "example.test";

/// Read one request head (up to the blank line) from `socket`.
async fn read_head(socket: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

async fn respond(socket: &mut TcpStream, status: u16, body: &str) {
    let status_text = match status {
        200 => "200 OK",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        _ => "200 OK",
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Start a backend that answers every request with its own request head,
/// lowercased, after waiting `delay`.
pub async fn start_echo_backend(delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                tokio::time::sleep(delay).await;
                respond(&mut socket, 200, &head.to_ascii_lowercase()).await;
            });
        }
    });

    addr
}

/// Start a backend that accepts `Upgrade: echo` with a 101 and then echoes
/// raw bytes back until the peer closes. Other requests get a plain 200.
pub async fn start_upgrade_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let head = read_head(&mut socket).await.to_ascii_lowercase();
                if !head.contains("\r\nupgrade: echo\r\n") {
                    respond(&mut socket, 200, "no upgrade").await;
                    return;
                }

                let switching = "HTTP/1.1 101 Switching Protocols\r\nConnection: Upgrade\r\nUpgrade: echo\r\n\r\n";
                if socket.write_all(switching.as_bytes()).await.is_err() {
                    return;
                }
                let (mut reader, mut writer) = socket.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });

    addr
}

/// Start a programmable backend; `f` receives the hit number (from 0).
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        let mut hits = 0;
        while let Ok((mut socket, _)) = listener.accept().await {
            let response = f(hits);
            hits += 1;
            tokio::spawn(async move {
                let _ = read_head(&mut socket).await;
                let (status, body) = response.await;
                respond(&mut socket, status, &body).await;
            });
        }
    });

    addr
}

/// JSON body in the domain source format.
pub fn domain_list(entries: &[(&str, String)]) -> String {
    let pairs: Vec<[&str; 2]> = entries.iter().map(|(sub, url)| [*sub, url.as_str()]).collect();
    serde_json::to_string(&pairs).unwrap()
}

/// A valid configuration pointing at `source`.
pub fn proxy_config(source: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.routing.root_domain = ROOT_DOMAIN.into();
    config.domain_source.url = format!("http://{source}/domains");
    config.domain_source.refresh_interval_secs = 1;
    config.domain_source.system_proxy = false;
    config
}

pub struct RunningProxy {
    pub addr: SocketAddr,
    pub table: Arc<RoutingTable>,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), ProxyError>>,
}

/// Run a proxy on an ephemeral port. It stops only through `shutdown`.
pub async fn spawn_proxy(config: ProxyConfig) -> RunningProxy {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let listener = Listener::from_tcp(tcp, config.listener.max_connections);
    let addr = listener.local_addr().unwrap();

    let proxy = Proxy::new(config).unwrap();
    let table = proxy.routing_table();
    let shutdown = proxy.shutdown_handle();
    let handle = tokio::spawn(proxy.run_with_listener(listener, std::future::pending()));

    RunningProxy {
        addr,
        table,
        shutdown,
        handle,
    }
}

/// Wait until `subdomain` is routable.
pub async fn wait_for_route(table: &RoutingTable, subdomain: &str) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while table.lookup(subdomain).is_none() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("route never installed");
}

/// Send a GET with the given target and Host over a fresh connection and
/// return the whole response as text.
pub async fn get(addr: SocketAddr, host: &str, target: &str) -> String {
    send(addr, &format!("GET {target} HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\n\r\n")).await
}

/// Write `request` verbatim and read the response until the proxy closes.
pub async fn send(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    let _ = stream.read_to_end(&mut response).await;
    String::from_utf8_lossy(&response).into_owned()
}

/// Read a response head (up to the blank line) from an open client stream.
pub async fn read_response_head(stream: &mut TcpStream) -> String {
    read_head(stream).await
}

/// Body of a raw HTTP/1.1 response.
pub fn body_of(response: &str) -> &str {
    response.split_once("\r\n\r\n").map(|(_, body)| body).unwrap_or("")
}
