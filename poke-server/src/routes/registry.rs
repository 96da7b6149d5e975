use std::{collections::HashSet, fmt, future::Future, sync::Arc};

use anyhow::{bail, Result};
use futures_util::future::BoxFuture;
use http::Method;
use serde::Serialize;
use serde_json::Value;

use crate::contract::{Outcome, RequestContext};

pub type Handler = Arc<
    dyn Fn(RequestContext) -> BoxFuture<'static, poke_slo::Result<Outcome<Value>>>
        + Send
        + Sync,
>;

/// A declared `(verb, pattern) -> handler` triple. Patterns may end in one
/// parameter segment, `{name}` or optional `{name?}`.
#[derive(Clone)]
pub struct RouteEntry {
    pub method: Method,
    pub pattern: String,
    pub handler: Handler,
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// A route as axum sees it: no optional segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Concrete {
    pub method: Method,
    pub path: String,
    pub param: Option<String>,
}

impl RouteEntry {
    pub fn expand(&self) -> Result<Vec<Concrete>> {
        let segments: Vec<&str> = self.pattern.split('/').collect();
        let last = segments.len() - 1;
        let mut base = Vec::with_capacity(segments.len());
        for (i, segment) in segments.iter().enumerate() {
            let Some(name) = segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
            else {
                base.push(*segment);
                continue;
            };
            if i != last {
                bail!(
                    "{} {}: parameters are only allowed as the last segment",
                    self.method,
                    self.pattern
                );
            }
            let (name, optional) = match name.strip_suffix('?') {
                Some(name) => (name, true),
                None => (name, false),
            };
            if name.is_empty() {
                bail!("{} {}: unnamed parameter", self.method, self.pattern);
            }
            let base = join(&base);
            let item = Concrete {
                method: self.method.clone(),
                path: format!("{}/{{{name}}}", base.trim_end_matches('/')),
                param: Some(name.to_owned()),
            };
            return Ok(if optional {
                vec![
                    Concrete {
                        method: self.method.clone(),
                        path: base,
                        param: None,
                    },
                    item,
                ]
            } else {
                vec![item]
            });
        }
        Ok(vec![Concrete {
            method: self.method.clone(),
            path: join(&base),
            param: None,
        }])
    }
}

fn join(segments: &[&str]) -> String {
    let path = segments.join("/");
    if path.is_empty() {
        String::from("/")
    } else {
        path
    }
}

/// Routes of one resource under a shared base path.
pub struct Controller<C> {
    base: String,
    controller: Arc<C>,
    entries: Vec<RouteEntry>,
}

impl<C> fmt::Debug for Controller<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("base", &self.base)
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl<C: Send + Sync + 'static> Controller<C> {
    pub fn new(base: impl Into<String>, controller: C) -> Self {
        Self {
            base: base.into(),
            controller: Arc::new(controller),
            entries: Vec::new(),
        }
    }

    pub fn route<H, Fut, O>(mut self, method: Method, path: &str, handler: H) -> Self
    where
        H: Fn(Arc<C>, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = poke_slo::Result<Outcome<O>>> + Send + 'static,
        O: Serialize + 'static,
    {
        let controller = Arc::clone(&self.controller);
        let handler: Handler = Arc::new(
            move |ctx: RequestContext| -> BoxFuture<'static, poke_slo::Result<Outcome<Value>>> {
                let fut = handler(Arc::clone(&controller), ctx);
                Box::pin(async move { fut.await?.into_value() })
            },
        );
        self.entries.push(RouteEntry {
            method,
            pattern: format!("{}{}", self.base, path),
            handler,
        });
        self
    }
}

/// Every route the server answers, filled once at startup.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<RouteEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount<C>(mut self, controller: Controller<C>) -> Self {
        self.entries.extend(controller.entries);
        self
    }

    /// Concrete routes paired with their handlers; duplicates are rejected.
    pub fn routes(&self) -> Result<Vec<(Concrete, Handler)>> {
        let mut seen = HashSet::new();
        let mut routes = Vec::new();
        for entry in &self.entries {
            for concrete in entry.expand()? {
                if !seen.insert((concrete.method.clone(), concrete.path.clone())) {
                    bail!(
                        "route {} {} is registered twice",
                        concrete.method,
                        concrete.path
                    );
                }
                routes.push((concrete, Arc::clone(&entry.handler)));
            }
        }
        Ok(routes)
    }
}
