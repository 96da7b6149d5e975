use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use axum::{
    body::to_bytes,
    extract::{FromRequestParts, Path, Request},
    response::IntoResponse,
    routing::{MethodFilter, MethodRouter},
    Router,
};
use http::Uri;
use serde_json::Value;

use poke_slo::errors;

use crate::contract::{respond, Outcome, RequestContext};

use super::registry::{Handler, Registry};

const BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Installs every registered route into an axum router.
pub fn install(registry: &Registry) -> Result<Router> {
    let mut grouped: BTreeMap<String, MethodRouter> = BTreeMap::new();
    for (route, handler) in registry.routes()? {
        let filter = MethodFilter::try_from(route.method.clone())
            .map_err(|err| anyhow!("{} {}: {}", route.method, route.path, err))?;
        let with_param = route.param.is_some();
        let endpoint = move |request: Request| {
            let handler = handler.clone();
            async move { respond(invoke(handler, with_param, request).await) }
        };
        let methods = grouped.remove(&route.path).unwrap_or_else(MethodRouter::new);
        grouped.insert(route.path, methods.on(filter, endpoint));
    }

    // A known path with an unregistered verb is answered like an unknown path.
    Ok(grouped
        .into_iter()
        .fold(Router::new(), |router, (path, methods)| {
            router.route(&path, methods)
        })
        .method_not_allowed_fallback(not_found))
}

pub async fn not_found(uri: Uri) -> impl IntoResponse {
    errors::not_found(&format!("no route for {}", uri))
}

async fn invoke(
    handler: Handler,
    with_param: bool,
    request: Request,
) -> poke_slo::Result<Outcome<Value>> {
    let (mut parts, body) = request.into_parts();
    let param = if with_param {
        let Path(v) = Path::<String>::from_request_parts(&mut parts, &())
            .await
            .map_err(|err| errors::bad_request(&err))?;
        Some(v)
    } else {
        None
    };
    let bytes = to_bytes(body, BODY_LIMIT)
        .await
        .map_err(|err| errors::bad_request(&err))?;
    let body = if bytes.is_empty() {
        None
    } else {
        Some(
            serde_json::from_slice(&bytes)
                .map_err(|err| errors::bad_request(&err))?,
        )
    };

    handler(RequestContext {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        param,
        body,
    })
    .await
}
