use std::{error::Error as StdError, fmt};

use backtrace::Backtrace;
use http::StatusCode;
use thiserror::Error;

pub trait ErrorCode: StdError + 'static {
    fn code(&self) -> (StatusCode, &'static str);
}

#[derive(Error, Debug)]
pub enum Code {
    #[error(transparent)]
    Any(#[from] anyhow::Error),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("Please recheck the request.see: {0}")]
    BadRequest(String),
    /// Valid credentials without the required access level. Rendered as 401
    /// so clients see a single "not allowed" status.
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
}

impl ErrorCode for Code {
    fn code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Any(_) => (StatusCode::INTERNAL_SERVER_ERROR, "1010001"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "1010002"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "1010003"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "1010004"),
            Self::Forbidden(_) => (StatusCode::UNAUTHORIZED, "1010005"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "1010006"),
        }
    }
}

pub struct WithBacktrace {
    source: Code,
    backtrace: Backtrace,
}

impl WithBacktrace {
    pub fn status(&self) -> StatusCode {
        self.source.code().0
    }

    pub fn code(&self) -> &Code {
        &self.source
    }

    /// Resolved frames of the captured backtrace, one symbol per line.
    pub fn stack(&self) -> Vec<String> {
        let mut backtrace = self.backtrace.clone();
        backtrace.resolve();
        backtrace
            .frames()
            .iter()
            .flat_map(|frame| frame.symbols())
            .map(|symbol| match (symbol.name(), symbol.filename(), symbol.lineno()) {
                (Some(name), Some(file), Some(line)) => {
                    format!("{} ({}:{})", name, file.display(), line)
                }
                (Some(name), _, _) => name.to_string(),
                _ => String::from("<unknown>"),
            })
            .collect()
    }
}

impl fmt::Debug for WithBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WithBacktrace")
            .field("source", &self.source)
            .field("backtrace", &self.backtrace)
            .finish()
    }
}

impl fmt::Display for WithBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl StdError for WithBacktrace {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.source)
    }
}

impl From<Code> for WithBacktrace {
    fn from(code: Code) -> Self {
        WithBacktrace {
            source: code,
            backtrace: Backtrace::new_unresolved(),
        }
    }
}

impl From<WithBacktrace> for Code {
    fn from(value: WithBacktrace) -> Self {
        value.source
    }
}

impl PartialEq for WithBacktrace {
    fn eq(&self, other: &Self) -> bool {
        let (_, src_code) = self.source.code();
        let (_, dst_code) = other.source.code();
        src_code == dst_code
    }
}

#[inline]
pub fn any<E: StdError>(err: E) -> WithBacktrace {
    Code::Any(anyhow::anyhow!("{}", err.to_string())).into()
}

#[inline]
pub fn anyhow(err: anyhow::Error) -> WithBacktrace {
    Code::Any(err).into()
}

#[inline]
pub fn not_found<S: ToString + ?Sized>(err: &S) -> WithBacktrace {
    Code::NotFound(err.to_string()).into()
}

#[inline]
pub fn unauthorized<S: ToString + ?Sized>(err: &S) -> WithBacktrace {
    Code::Unauthorized(err.to_string()).into()
}

#[inline]
pub fn forbidden<S: ToString + ?Sized>(err: &S) -> WithBacktrace {
    Code::Forbidden(err.to_string()).into()
}

#[inline]
pub fn bad_request<S: ToString + ?Sized>(err: &S) -> WithBacktrace {
    Code::BadRequest(err.to_string()).into()
}

#[inline]
pub fn conflict<S: ToString + ?Sized>(err: &S) -> WithBacktrace {
    Code::Conflict(err.to_string()).into()
}

#[cfg(feature = "axum-resp")]
mod axum_resp {
    use axum::response::IntoResponse;
    use http::StatusCode;
    use serde_json::json;

    use super::ErrorCode;

    impl IntoResponse for super::WithBacktrace {
        fn into_response(self) -> axum::response::Response {
            let (status_code, code) = self.source.code();

            let payload = if status_code == StatusCode::INTERNAL_SERVER_ERROR
            {
                tracing::error!("{:?}", self);
                json!({
                    "code": code,
                    "error": self.to_string(),
                    "stack": self.stack(),
                })
            } else {
                tracing::debug!("{}", self);
                json!({
                    "code": code,
                    "error": self.to_string(),
                })
            };

            (status_code, axum::Json(payload)).into_response()
        }
    }
}
