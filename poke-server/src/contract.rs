use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::{HeaderMap, Method, StatusCode, Uri};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use poke_slo::{
    errors::{self, WithBacktrace},
    Result,
};

use crate::valid::Violation;

/// Everything a resource handler may look at for one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Trailing path parameter, when the matched route declares one.
    pub param: Option<String>,
    /// Parsed JSON body; `None` for an empty body.
    pub body: Option<Value>,
}

impl RequestContext {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            param: None,
            body: None,
        }
    }

    pub fn query<T: DeserializeOwned>(&self) -> Result<T> {
        serde_urlencoded::from_str(self.uri.query().unwrap_or_default())
            .map_err(|err| errors::bad_request(&err))
    }

    /// Deserializes the body into a record; a missing body reads as `{}`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let body = self
            .body
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new()));
        serde_json::from_value(body).map_err(|err| errors::bad_request(&err))
    }

    pub fn fields(&self) -> Result<Map<String, Value>> {
        match &self.body {
            None => Ok(Map::new()),
            Some(Value::Object(fields)) => Ok(fields.clone()),
            Some(other) => Err(errors::bad_request(&format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }

    pub fn param_id(&self) -> Option<u64> {
        self.param.as_deref()?.parse().ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Unauthenticated,
    Forbidden,
}

impl From<Denial> for WithBacktrace {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthenticated => errors::unauthorized("token does not exist"),
            Denial::Forbidden => errors::forbidden("user does not have permission"),
        }
    }
}

/// Result of a resource handler, turned into a response in exactly one
/// place.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    Created(T),
    Denied(Denial),
    NotFound,
    Invalid(Vec<Violation>),
}

impl<T: Serialize> Outcome<T> {
    pub fn into_value(self) -> Result<Outcome<Value>> {
        Ok(match self {
            Self::Ok(v) => Outcome::Ok(serde_json::to_value(v).map_err(errors::any)?),
            Self::Created(v) => {
                Outcome::Created(serde_json::to_value(v).map_err(errors::any)?)
            }
            Self::Denied(denial) => Outcome::Denied(denial),
            Self::NotFound => Outcome::NotFound,
            Self::Invalid(violations) => Outcome::Invalid(violations),
        })
    }
}

impl<T: Serialize> IntoResponse for Outcome<T> {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(v) => Json(v).into_response(),
            Self::Created(v) => (StatusCode::CREATED, Json(v)).into_response(),
            Self::Denied(denial) => WithBacktrace::from(denial).into_response(),
            Self::NotFound => errors::not_found("Not Found").into_response(),
            Self::Invalid(violations) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(violations)).into_response()
            }
        }
    }
}

pub fn respond(result: Result<Outcome<Value>>) -> Response {
    match result {
        Ok(outcome) => outcome.into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use axum::body::to_bytes;
    use serde_json::json;

    use super::*;

    async fn body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn denial_is_unauthorized() {
        let response = respond(Ok(Outcome::Denied(Denial::Unauthenticated)));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body(response).await["error"], "token does not exist");

        let response = respond(Ok(Outcome::Denied(Denial::Forbidden)));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let payload = body(response).await;
        assert_eq!(payload["error"], "user does not have permission");
        assert_eq!(payload["code"], "1010005");
    }

    #[tokio::test]
    async fn statuses() {
        let record = json!({"teamID": 1});
        assert_eq!(
            respond(Ok(Outcome::Ok(record.clone()))).status(),
            StatusCode::OK
        );
        assert_eq!(
            respond(Ok(Outcome::Created(record))).status(),
            StatusCode::CREATED
        );
        assert_eq!(
            respond(Ok(Outcome::NotFound)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            respond(Err(errors::bad_request("eof"))).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn violations_are_an_array() {
        let violation = Violation {
            property: "pokeName".to_owned(),
            constraints: BTreeMap::from([(
                "length".to_owned(),
                "Given Name must be from 1 to 50 characters".to_owned(),
            )]),
            value: None,
            target: None,
        };
        let response = respond(Ok(Outcome::Invalid(vec![violation])));
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body(response).await,
            json!([{
                "property": "pokeName",
                "constraints": {"length": "Given Name must be from 1 to 50 characters"}
            }])
        );
    }

    #[tokio::test]
    async fn internal_errors_carry_a_stack() {
        let response = respond(Err(errors::any(std::fmt::Error)));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body(response).await["stack"].is_array());
    }

    #[test]
    fn context_parsing() {
        let mut ctx = RequestContext::new(
            Method::PUT,
            Uri::from_static("/poketeam/3?reverse=1"),
        );
        ctx.param = Some("3".to_owned());
        assert_eq!(ctx.param_id(), Some(3));
        assert!(ctx.fields().unwrap().is_empty());

        ctx.body = Some(json!([1, 2]));
        assert_eq!(ctx.fields().unwrap_err(), errors::bad_request(""));

        ctx.param = Some("three".to_owned());
        assert_eq!(ctx.param_id(), None);
    }
}
