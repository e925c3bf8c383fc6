//! Upstream connection to the realtime model service.

use http::Request;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite};
use url::Url;

use super::RelayError;
use super::config::RelaySettings;

/// The duplex stream to the model service.
pub type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Open the WebSocket to the model service, authenticating with the
/// configured API key and selecting the model via query parameter.
pub async fn connect(settings: &RelaySettings) -> Result<UpstreamSocket, RelayError> {
    let mut url = Url::parse(&settings.endpoint)
        .map_err(|e| RelayError::InvalidEndpoint(e.to_string()))?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(RelayError::InvalidEndpoint(format!(
            "expected ws:// or wss:// endpoint, got {}",
            url.scheme()
        )));
    }
    url.query_pairs_mut().append_pair("model", &settings.model);

    let host = url
        .host_str()
        .ok_or_else(|| RelayError::InvalidEndpoint("endpoint has no host".to_string()))?;
    let host = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let request = Request::builder()
        .uri(url.as_str())
        .header("Authorization", format!("Bearer {}", settings.api_key))
        .header("OpenAI-Beta", "realtime=v1")
        .header(
            "Sec-WebSocket-Key",
            tungstenite::handshake::client::generate_key(),
        )
        .header("Sec-WebSocket-Version", "13")
        .header("Connection", "Upgrade")
        .header("Upgrade", "websocket")
        .header("Host", host)
        .body(())
        .map_err(|e| RelayError::ConnectionFailed(e.to_string()))?;

    let (stream, _response) = connect_async(request)
        .await
        .map_err(|e| RelayError::ConnectionFailed(e.to_string()))?;

    tracing::info!(model = %settings.model, "connected to realtime model service");
    Ok(stream)
}
