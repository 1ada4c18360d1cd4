use crate::adapter::FeedError;

use bytes::Bytes;
use fastwebsockets::FragmentCollector;
use http_body_util::Empty;
use hyper::{
    Request,
    header::{CONNECTION, UPGRADE},
    upgrade::Upgraded,
};
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, OwnedTrustAnchor},
};
use url::Url;

use std::{sync::LazyLock, time::Duration};

const TCP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const WS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(15);

/// Maximum idle time before considering the feed connection dead.
/// A live session pushes a pending-period update at least every couple of
/// seconds; 15s of silence means a half-open socket or a stalled server,
/// and the stream loop reconnects rather than keep waiting.
pub const WS_READ_TIMEOUT: Duration = Duration::from_secs(15);

/// An upgraded feed websocket ready for frame I/O.
pub type FeedSocket = FragmentCollector<TokioIo<Upgraded>>;

/// Connection state driven by the stream loop in `adapter`.
pub enum State {
    Disconnected,
    Connected(FeedSocket),
}

static TLS_CONNECTOR: LazyLock<TlsConnector> =
    LazyLock::new(|| tls_connector().expect("failed to create TLS connector"));

fn tls_connector() -> Result<TlsConnector, FeedError> {
    let mut root_store = tokio_rustls::rustls::RootCertStore::empty();

    root_store.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.0.iter().map(|ta| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            ta.subject,
            ta.spki,
            ta.name_constraints,
        )
    }));

    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(TlsConnector::from(std::sync::Arc::new(config)))
}

pub async fn connect_ws(url: &str) -> Result<FeedSocket, FeedError> {
    let parsed = Url::parse(url).map_err(|e| FeedError::InvalidRequest(e.to_string()))?;

    let domain = parsed
        .host_str()
        .ok_or_else(|| FeedError::InvalidRequest("missing host in websocket URL".to_string()))?
        .to_string();

    let target_port = parsed
        .port_or_known_default()
        .ok_or_else(|| FeedError::InvalidRequest("missing port for websocket URL".to_string()))?;

    let addr = format!("{domain}:{target_port}");
    let tcp = tokio::time::timeout(TCP_CONNECT_TIMEOUT, tokio::net::TcpStream::connect(&addr))
        .await
        .map_err(|_| FeedError::Websocket(format!("TCP connect timeout: {addr}")))?
        .map_err(|e| FeedError::Websocket(e.to_string()))?;

    match parsed.scheme() {
        "wss" => {
            let tls_stream =
                tokio::time::timeout(TLS_HANDSHAKE_TIMEOUT, upgrade_to_tls(&domain, tcp))
                    .await
                    .map_err(|_| {
                        FeedError::Websocket("TLS handshake to feed timed out".to_string())
                    })??;

            tokio::time::timeout(
                WS_HANDSHAKE_TIMEOUT,
                upgrade_to_websocket(&domain, tls_stream, &parsed),
            )
            .await
            .map_err(|_| FeedError::Websocket("WebSocket handshake timed out".to_string()))?
        }
        "ws" => tokio::time::timeout(
            WS_HANDSHAKE_TIMEOUT,
            upgrade_to_websocket(&domain, tcp, &parsed),
        )
        .await
        .map_err(|_| FeedError::Websocket("WebSocket handshake timed out".to_string()))?,
        _ => Err(FeedError::InvalidRequest(
            "invalid scheme for websocket URL".to_string(),
        )),
    }
}

async fn upgrade_to_tls<S>(
    domain: &str,
    stream: S,
) -> Result<tokio_rustls::client::TlsStream<S>, FeedError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let server_name: tokio_rustls::rustls::ServerName =
        tokio_rustls::rustls::ServerName::try_from(domain)
            .map_err(|_| FeedError::InvalidRequest("invalid dnsname".to_string()))?;

    TLS_CONNECTOR
        .connect(server_name, stream)
        .await
        .map_err(|e| FeedError::Websocket(e.to_string()))
}

async fn upgrade_to_websocket<S>(
    domain: &str,
    stream: S,
    parsed: &Url,
) -> Result<FeedSocket, FeedError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let mut path_and_query = parsed.path().to_string();
    if let Some(q) = parsed.query() {
        path_and_query.push('?');
        path_and_query.push_str(q);
    }
    if path_and_query.is_empty() {
        path_and_query.push('/');
    }

    let host_header = match parsed.port() {
        Some(explicit_port) => {
            let default_port = parsed.port_or_known_default().unwrap_or(explicit_port);
            if explicit_port != default_port {
                format!("{domain}:{explicit_port}")
            } else {
                domain.to_string()
            }
        }
        None => domain.to_string(),
    };

    let req: Request<Empty<Bytes>> = Request::builder()
        .method("GET")
        .uri(path_and_query)
        .header("Host", host_header)
        .header(UPGRADE, "websocket")
        .header(CONNECTION, "upgrade")
        .header(
            "Sec-WebSocket-Key",
            fastwebsockets::handshake::generate_key(),
        )
        .header("Sec-WebSocket-Version", "13")
        .body(Empty::<Bytes>::new())
        .map_err(|e| FeedError::Websocket(e.to_string()))?;

    let exec = TokioExecutor::new();
    let (ws, _) = fastwebsockets::handshake::client(&exec, req, stream)
        .await
        .map_err(|e| FeedError::Websocket(e.to_string()))?;

    Ok(FragmentCollector::new(ws))
}
