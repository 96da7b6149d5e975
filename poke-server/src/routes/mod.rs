pub mod dispatch;
pub mod registry;

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    Router,
};
use http::HeaderValue;
use tower::ServiceBuilder;
use tower_http::{
    trace::{DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::Level;

use crate::{
    auth::Authorizer,
    controllers::{pokemon, poketeam, users},
    middlewares::{MakeSpanWithTrace, TRACE_ID},
    AppState,
};

use self::registry::Registry;

pub struct AppRouter;

impl AppRouter {
    pub fn build(state: AppState) -> Result<Router> {
        let auth = Authorizer::new(Arc::clone(&state.store.credentials));
        let registry = Registry::new()
            .mount(pokemon::new_controller(
                auth.clone(),
                Arc::clone(&state.store.pokemon),
            ))
            .mount(poketeam::new_controller(
                auth.clone(),
                Arc::clone(&state.store.teams),
            ))
            .mount(users::new_controller(auth, Arc::clone(&state.store.users)));

        let router = dispatch::install(&registry)?
            .fallback(dispatch::not_found)
            .layer(
                ServiceBuilder::new().layer(
                    TraceLayer::new_for_http()
                        .make_span_with(
                            MakeSpanWithTrace::new().level(Level::INFO),
                        )
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(LatencyUnit::Millis),
                        ),
                ),
            )
            .layer(middleware::from_fn(Self::trace));

        Ok(router)
    }

    /// Propagates the caller's `X-Trace-Id`, or mints one, on both the
    /// request and the response.
    async fn trace(mut request: Request, next: Next) -> Response {
        let trace_id = request.headers().get(TRACE_ID).cloned().or_else(|| {
            HeaderValue::try_from(uuid::Uuid::new_v4().hyphenated().to_string())
                .ok()
        });
        if let Some(v) = &trace_id {
            request.headers_mut().insert(TRACE_ID, v.clone());
        }
        let mut response = next.run(request).await;
        if let Some(v) = trace_id {
            response.headers_mut().insert(TRACE_ID, v);
        }
        response
    }
}
