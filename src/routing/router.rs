//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store registered routes and their access level
//! - Decode the request body, authenticate protected routes, call the handler
//! - Normalize every failure into a response (the single place this happens)
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Longest matching prefix wins; registration order breaks ties
//! - Explicit not-found rather than a silent default handler

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;

use crate::http::request::{request_id, RequestContext};
use crate::http::response::GatewayError;
use crate::observability::metrics;
use crate::routing::matcher::{ExactPathMatcher, Matcher, PathPrefixMatcher};
use crate::security::AuthGate;

/// A resource handler behind the gatekeeping chain.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn handle(&self, ctx: RequestContext) -> Result<Response, GatewayError>;
}

/// Whether a route requires an authenticated identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected,
}

/// A registered route.
pub struct Route {
    pub name: String,
    pub access: Access,
    matcher: Box<dyn Matcher>,
    handler: Arc<dyn ResourceHandler>,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("access", &self.access)
            .field("matcher", &self.matcher)
            .finish()
    }
}

/// Routes admitted requests to exactly one handler.
pub struct Dispatcher {
    routes: Vec<Route>,
    gate: Arc<AuthGate>,
    max_body: usize,
}

impl Dispatcher {
    pub fn builder(gate: Arc<AuthGate>, max_body: usize) -> DispatcherBuilder {
        DispatcherBuilder {
            routes: Vec::new(),
            gate,
            max_body,
        }
    }

    /// Find the most specific route for `path` and the unmatched remainder.
    pub fn match_path<'a>(&self, path: &'a str) -> Option<(&Route, &'a str)> {
        let mut best: Option<(&Route, &'a str)> = None;
        for route in &self.routes {
            if let Some(rest) = route.matcher.strip(path) {
                let better = best
                    .map(|(b, _)| route.matcher.specificity() > b.matcher.specificity())
                    .unwrap_or(true);
                if better {
                    best = Some((route, rest));
                }
            }
        }
        best
    }

    /// Run the dispatch stage for one request and normalize the outcome.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let method = request.method().to_string();
        let path = request.uri().path().to_string();
        let request_id = request_id(request.headers()).to_string();

        let response = match self.route(request).await {
            Ok(response) => response,
            Err(err) => normalize(err, &request_id, &path),
        };

        metrics::record_request(&method, response.status().as_u16(), start);
        response
    }

    async fn route(&self, request: Request<Body>) -> Result<Response, GatewayError> {
        let mut ctx = RequestContext::from_request(request, self.max_body).await?;

        let (route, rest) = self
            .match_path(&ctx.path)
            .ok_or_else(|| GatewayError::not_found(ctx.path.clone()))?;
        ctx.sub_path = rest.to_string();

        if route.access == Access::Protected {
            let identity = self.gate.authenticate(ctx.authorization()).await?;
            tracing::debug!(route = %route.name, subject = %identity.subject_id, "Authenticated");
            ctx.identity = Some(identity);
        }

        route.handler.handle(ctx).await
    }
}

/// Log `err` at a level matching its kind and turn it into a response.
fn normalize(err: GatewayError, request_id: &str, path: &str) -> Response {
    match &err {
        GatewayError::RouteNotFound { .. } => {
            tracing::warn!(request_id = %request_id, path = %path, error = %err, "No route matched");
        }
        GatewayError::Internal(_) | GatewayError::StoreUnavailable(_) => {
            tracing::error!(request_id = %request_id, path = %path, error = %err, "Request failed");
        }
        _ => {
            tracing::debug!(request_id = %request_id, path = %path, error = %err, "Request rejected");
        }
    }
    err.into_response()
}

/// Axum fallback that hands every request to the dispatcher.
pub async fn dispatch_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    request: Request<Body>,
) -> Response {
    dispatcher.dispatch(request).await
}

/// Collects routes before freezing them into a [`Dispatcher`].
pub struct DispatcherBuilder {
    routes: Vec<Route>,
    gate: Arc<AuthGate>,
    max_body: usize,
}

impl DispatcherBuilder {
    /// Register `handler` under a path prefix.
    pub fn prefix(
        self,
        prefix: &str,
        access: Access,
        handler: Arc<dyn ResourceHandler>,
    ) -> Self {
        self.push(prefix, Box::new(PathPrefixMatcher::new(prefix)), access, handler)
    }

    /// Register `handler` for exactly one path.
    pub fn exact(self, path: &str, access: Access, handler: Arc<dyn ResourceHandler>) -> Self {
        self.push(path, Box::new(ExactPathMatcher::new(path)), access, handler)
    }

    fn push(
        mut self,
        name: &str,
        matcher: Box<dyn Matcher>,
        access: Access,
        handler: Arc<dyn ResourceHandler>,
    ) -> Self {
        self.routes.push(Route {
            name: name.to_string(),
            access,
            matcher,
            handler,
        });
        self
    }

    pub fn build(self) -> Dispatcher {
        tracing::debug!(routes = self.routes.len(), "Dispatcher built");
        Dispatcher {
            routes: self.routes,
            gate: self.gate,
            max_body: self.max_body,
        }
    }
}
