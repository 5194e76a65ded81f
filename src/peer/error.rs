use thiserror::Error;

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("network I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("malformed message envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}
