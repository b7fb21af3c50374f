// ABOUTME: Platform error types with SNAFU pattern.
// ABOUTME: Separates transport failures from malformed response bodies.

use snafu::Snafu;

/// Failure of a single platform round trip.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PlatformError {
    #[snafu(display("request to {url} failed: {message}"))]
    Transport { url: String, message: String },

    #[snafu(display("malformed response from {url}: {source}"))]
    MalformedBody {
        url: String,
        source: serde_json::Error,
    },

    #[snafu(display("could not set up TLS: {source}"))]
    TlsSetup { source: rustls::Error },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformErrorKind {
    /// Host unreachable, connection reset, TLS failure, or request could not be built.
    Transport,
    /// Response body was not the JSON the call expects.
    MalformedBody,
}

impl PlatformError {
    pub fn kind(&self) -> PlatformErrorKind {
        match self {
            PlatformError::Transport { .. } | PlatformError::TlsSetup { .. } => {
                PlatformErrorKind::Transport
            }
            PlatformError::MalformedBody { .. } => PlatformErrorKind::MalformedBody,
        }
    }

    pub fn is_transport(&self) -> bool {
        self.kind() == PlatformErrorKind::Transport
    }

    /// Request url, empty when the client itself could not be built.
    pub fn url(&self) -> &str {
        match self {
            PlatformError::Transport { url, .. } | PlatformError::MalformedBody { url, .. } => url,
            PlatformError::TlsSetup { .. } => "",
        }
    }
}
