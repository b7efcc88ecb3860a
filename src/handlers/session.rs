//! Root greeting and logout.

use async_trait::async_trait;
use axum::{
    http::Method,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::http::request::RequestContext;
use crate::http::response::GatewayError;
use crate::routing::ResourceHandler;
use crate::security::access_control::{bearer_token, AuthFailure};
use crate::security::AuthGate;

/// Answers `GET /` with a fixed greeting.
pub struct WelcomeHandler;

#[async_trait]
impl ResourceHandler for WelcomeHandler {
    async fn handle(&self, ctx: RequestContext) -> Result<Response, GatewayError> {
        if ctx.method != Method::GET || !ctx.sub_path.is_empty() {
            return Err(GatewayError::not_found(ctx.path));
        }
        Ok(Json(json!({ "msg": "Welcome" })).into_response())
    }
}

/// Revokes the bearer token that authenticated the request.
pub struct LogoutHandler {
    gate: Arc<AuthGate>,
}

impl LogoutHandler {
    pub fn new(gate: Arc<AuthGate>) -> Self {
        Self { gate }
    }
}

#[async_trait]
impl ResourceHandler for LogoutHandler {
    async fn handle(&self, ctx: RequestContext) -> Result<Response, GatewayError> {
        if ctx.method != Method::POST || !ctx.sub_path.is_empty() {
            return Err(GatewayError::not_found(ctx.path));
        }
        let token = bearer_token(ctx.authorization()).ok_or(AuthFailure::MissingCredential)?;

        self.gate.revoke(token).await?;
        tracing::info!(
            subject = ctx.identity.as_ref().map(|i| i.subject_id.as_str()).unwrap_or("-"),
            "Token revoked"
        );
        Ok(Json(json!({ "msg": "Logged out" })).into_response())
    }
}
