use http::Request;
use tower_http::trace::MakeSpan;
use tracing::{Level, Span};

pub const TRACE_ID: &str = "x-trace-id";

/// Request span that carries the `X-Trace-Id` of the request.
#[derive(Debug, Clone, Copy)]
pub struct MakeSpanWithTrace {
    level: Level,
}

impl MakeSpanWithTrace {
    pub fn new() -> Self {
        Self {
            level: Level::DEBUG,
        }
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

impl Default for MakeSpanWithTrace {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> MakeSpan<B> for MakeSpanWithTrace {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let trace_id = request
            .headers()
            .get(TRACE_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        // `tracing::span!` needs a constant level.
        macro_rules! make_span {
            ($level:expr) => {
                tracing::span!(
                    $level,
                    "request",
                    trace_id = %trace_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            };
        }

        match self.level {
            Level::ERROR => make_span!(Level::ERROR),
            Level::WARN => make_span!(Level::WARN),
            Level::INFO => make_span!(Level::INFO),
            Level::DEBUG => make_span!(Level::DEBUG),
            Level::TRACE => make_span!(Level::TRACE),
        }
    }
}
