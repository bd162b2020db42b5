//! Error types for tether-gateway.

use std::{fmt, io};

use tether_types::Request;

// ─── ServerError ─────────────────────────────────────────────────────────────

/// An error returned by the server in response to a request.
///
/// Numeric values are stripped from the name and placed in
/// [`ServerError::value`].
///
/// # Example
/// `FLOOD_WAIT_30` → `ServerError { code: 420, name: "FLOOD_WAIT", value: Some(30) }`
#[derive(Clone, Debug, PartialEq)]
pub struct ServerError {
    /// HTTP-like status code.
    pub code: i32,
    /// Error name in SCREAMING_SNAKE_CASE with digits removed.
    pub name: String,
    /// Numeric suffix extracted from the name, if any.
    pub value: Option<u32>,
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RPC {}: {}", self.code, self.name)?;
        if let Some(v) = self.value {
            write!(f, " (value: {v})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ServerError {}

impl ServerError {
    /// Parse a raw server error message like `"FLOOD_WAIT_30"`.
    pub fn parse(code: i32, message: &str) -> Self {
        // Try to find a numeric suffix after the last underscore.
        // e.g. "FLOOD_WAIT_30" → name = "FLOOD_WAIT", value = Some(30)
        if let Some(idx) = message.rfind('_') {
            let suffix = &message[idx + 1..];
            if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) {
                if let Ok(v) = suffix.parse::<u32>() {
                    let name = message[..idx].to_string();
                    return Self { code, name, value: Some(v) };
                }
            }
        }
        Self { code, name: message.to_string(), value: None }
    }

    /// Match on the error name, with optional wildcard prefix/suffix `'*'`.
    ///
    /// # Examples
    /// - `err.is("FLOOD_WAIT")` — exact match
    /// - `err.is("FILE_REFERENCE_*")` — starts-with match
    /// - `err.is("*_INVALID")` — ends-with match
    pub fn is(&self, pattern: &str) -> bool {
        if let Some(prefix) = pattern.strip_suffix('*') {
            self.name.starts_with(prefix)
        } else if let Some(suffix) = pattern.strip_prefix('*') {
            self.name.ends_with(suffix)
        } else {
            self.name == pattern
        }
    }

    /// The server-prescribed wait in seconds, if this is a rate-limit error
    /// (global flood wait or per-chat slow mode).
    pub fn rate_limit_seconds(&self) -> Option<u64> {
        if self.name == "FLOOD_WAIT" || self.name == "SLOWMODE_WAIT" {
            self.value.map(|v| v as u64)
        } else {
            None
        }
    }
}

// ─── InvocationError ─────────────────────────────────────────────────────────

/// The error type returned from any gateway call that talks to the server.
#[derive(Debug)]
pub enum InvocationError {
    /// The server rejected the request.
    Server(ServerError),
    /// Network / I/O failure inside the transport.
    Io(io::Error),
    /// The request was dropped (e.g. transport shut down mid-flight).
    Dropped,
    /// The gateway refused to issue the request: connection state was not
    /// `Connected`. No transport call was made.
    Disconnected,
    /// A gateway-side invariant failed (malformed response, unknown media).
    Unexpected(String),
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server(e)     => write!(f, "{e}"),
            Self::Io(e)         => write!(f, "I/O error: {e}"),
            Self::Dropped       => write!(f, "request dropped"),
            Self::Disconnected  => write!(f, "not connected"),
            Self::Unexpected(s) => write!(f, "unexpected: {s}"),
        }
    }
}

impl std::error::Error for InvocationError {}

impl From<io::Error> for InvocationError {
    fn from(e: io::Error) -> Self { Self::Io(e) }
}

impl InvocationError {
    /// Returns `true` if this is the named server error (supports `'*'`
    /// wildcards).
    pub fn is(&self, pattern: &str) -> bool {
        match self {
            Self::Server(e) => e.is(pattern),
            _               => false,
        }
    }

    /// If this is a rate-limit error, how many seconds the server asked us
    /// to wait.
    pub fn rate_limit_seconds(&self) -> Option<u64> {
        match self {
            Self::Server(e) => e.rate_limit_seconds(),
            _               => None,
        }
    }

    /// `true` for the stale-media-reference error family, which triggers the
    /// one-shot repair path.
    pub fn is_stale_reference(&self) -> bool {
        self.is("FILE_REFERENCE_*")
    }

    /// `true` when the session itself was invalidated server-side.
    pub fn is_auth_revoked(&self) -> bool {
        self.is("AUTH_KEY_UNREGISTERED") || self.is("SESSION_REVOKED")
    }
}

// ─── ErrorEnvelope ───────────────────────────────────────────────────────────

/// Classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The server asked us to wait; the duration is surfaced to the UI, the
    /// gateway itself never sleeps on it.
    RateLimited { wait_seconds: u64 },
    /// An expired media file reference; repairable once.
    StaleReference,
    /// The request was never sent — connection state was not `Connected`.
    Disconnected,
    /// Anything not otherwise classified.
    Unexpected,
}

/// A classified failure, handed to the error-dispatch sink.
#[derive(Debug)]
pub struct ErrorEnvelope {
    pub kind: ErrorKind,
    /// Wire method name of the failed request.
    pub method: &'static str,
    /// The rate limit came from a per-chat slow mode on a send request, so
    /// the UI should surface it on the composer rather than globally.
    pub is_slow_mode: bool,
    /// The original, unclassified error.
    pub error: InvocationError,
}

impl ErrorEnvelope {
    /// Classify a failed invocation of `request`.
    pub fn classify(request: &Request, error: InvocationError) -> Self {
        let kind = match &error {
            InvocationError::Disconnected => ErrorKind::Disconnected,
            _ if error.is_stale_reference() => ErrorKind::StaleReference,
            _ => match error.rate_limit_seconds() {
                Some(wait_seconds) => ErrorKind::RateLimited { wait_seconds },
                None               => ErrorKind::Unexpected,
            },
        };
        let is_slow_mode = request.is_send()
            && matches!(kind, ErrorKind::RateLimited { .. })
            && error.is("SLOWMODE_WAIT");
        Self { kind, method: request.method(), is_slow_mode, error }
    }
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.method, self.error)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
