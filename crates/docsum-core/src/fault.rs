//! Classification of completion-service failures
//!
//! Every failure coming back from the completion service is mapped exactly
//! once, at the gateway boundary, into a `FaultKind`. The engine only ever
//! matches on the kind; it never re-inspects error text.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

/// What the engine should do about a failed completion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Server-side hiccup with no content implication. Retry the same input.
    Transient,
    /// Rate-limit rejection. Back off, then retry the same input.
    Throttled,
    /// Input exceeds what the service accepts. Split and recurse.
    TooLarge,
    /// Anything else. Propagate without retrying.
    Fatal,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FaultKind::Transient => "transient",
            FaultKind::Throttled => "throttled",
            FaultKind::TooLarge => "too-large",
            FaultKind::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// A classified completion failure, as returned by every `CompletionGateway`.
#[derive(Error, Debug, Clone)]
#[error("{kind} fault: {message}")]
pub struct CompletionError {
    pub kind: FaultKind,
    pub message: String,
    /// Server-requested wait before the next attempt, if any.
    pub retry_after: Option<Duration>,
}

impl CompletionError {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Transient, message)
    }

    pub fn throttled(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Throttled, message)
    }

    pub fn too_large(message: impl Into<String>) -> Self {
        Self::new(FaultKind::TooLarge, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Fatal, message)
    }
}

/// Raw failure signal observed at the HTTP boundary, before classification.
#[derive(Debug, Clone, Default)]
pub struct GatewayFailure {
    /// HTTP status, `None` when the request never produced a response.
    pub status: Option<u16>,
    /// Provider error code (`error.code` or `error.type` in the response body).
    pub code: Option<String>,
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl GatewayFailure {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            ..Default::default()
        }
    }

    /// A failure without an HTTP response, such as a timeout or refused connection.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }
}

static QUOTA_EXHAUSTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)insufficient_quota|exceeded your current quota|billing hard limit")
        .expect("valid quota pattern")
});

static TOO_LARGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)context_length_exceeded|context length|maximum context|context window|request too large|payload too large|reduce the length|too many tokens",
    )
    .expect("valid size pattern")
});

static RATE_LIMITED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)rate[ _-]?limit|too many requests").expect("valid rate pattern")
});

/// Maps raw gateway failures into fault kinds.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultClassifier;

impl FaultClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, failure: &GatewayFailure) -> FaultKind {
        let signal = match &failure.code {
            Some(code) => format!("{} {}", code, failure.message),
            None => failure.message.clone(),
        };

        // A spent quota will not come back by waiting, even though providers
        // report it with a 429.
        if QUOTA_EXHAUSTED.is_match(&signal) {
            return FaultKind::Fatal;
        }

        if failure.status == Some(413) || TOO_LARGE.is_match(&signal) {
            return FaultKind::TooLarge;
        }

        if failure.status == Some(429) || RATE_LIMITED.is_match(&signal) {
            return FaultKind::Throttled;
        }

        match failure.status {
            None => FaultKind::Transient,
            Some(408) => FaultKind::Transient,
            Some(status) if (500..600).contains(&status) => FaultKind::Transient,
            Some(_) => FaultKind::Fatal,
        }
    }

    /// Classifies a failure and carries its message and retry hint along.
    pub fn to_completion_error(&self, failure: GatewayFailure) -> CompletionError {
        let kind = self.classify(&failure);
        let message = match failure.status {
            Some(status) => format!("status {}: {}", status, failure.message),
            None => failure.message,
        };
        CompletionError {
            kind,
            message,
            retry_after: failure.retry_after,
        }
    }
}
