//! Generic catalog collection over a [`DocumentStore`].
//!
//! Sub-paths served under the route prefix:
//! - `GET ""` / `GET "/"`: list, filtered by query parameters
//! - `POST /add`: insert the JSON body
//! - `PATCH /update/<id>`: merge the JSON body into one document
//! - `DELETE /delete/<id>`: remove one document
//!
//! Anything else is reported as an unmatched route.

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
use crate::store::DocumentStore;

/// Operation selected by method and sub-path.
#[derive(Debug, PartialEq, Eq)]
enum Operation<'a> {
    List,
    Add,
    Update(&'a str),
    Delete(&'a str),
}

fn operation<'a>(method: &Method, sub_path: &'a str) -> Option<Operation<'a>> {
    let id_after = |prefix: &str| {
        sub_path
            .strip_prefix(prefix)
            .filter(|id| !id.is_empty() && !id.contains('/'))
    };

    match *method {
        Method::GET if sub_path.is_empty() || sub_path == "/" => Some(Operation::List),
        Method::POST if sub_path == "/add" => Some(Operation::Add),
        Method::PATCH => id_after("/update/").map(Operation::Update),
        Method::DELETE => id_after("/delete/").map(Operation::Delete),
        _ => None,
    }
}

pub struct CollectionHandler {
    collection: String,
    label: String,
    store: Arc<dyn DocumentStore>,
}

impl CollectionHandler {
    /// `collection` names the storage bucket, `label` keys the list response.
    pub fn new(
        collection: impl Into<String>,
        label: impl Into<String>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            collection: collection.into(),
            label: label.into(),
            store,
        }
    }
}

#[async_trait]
impl ResourceHandler for CollectionHandler {
    async fn handle(&self, ctx: RequestContext) -> Result<Response, GatewayError> {
        let op = operation(&ctx.method, &ctx.sub_path)
            .ok_or_else(|| GatewayError::not_found(ctx.path.clone()))?;

        let response = match op {
            Operation::List => {
                let docs = self.store.find(&self.collection, &ctx.query).await?;
                Json(json!({ &self.label: docs }))
            }
            Operation::Add => {
                let doc = self.store.insert(&self.collection, ctx.body).await?;
                tracing::info!(collection = %self.collection, "Document added");
                Json(json!({
                    "msg": format!("New {} data added.", self.label),
                    "data": doc,
                }))
            }
            Operation::Update(id) => {
                self.store
                    .update(&self.collection, id, ctx.body)
                    .await?
                    .ok_or_else(|| missing(&self.label, id))?;
                Json(json!({ "msg": format!("{} id {id} has been updated", self.label) }))
            }
            Operation::Delete(id) => {
                if !self.store.delete(&self.collection, id).await? {
                    return Err(missing(&self.label, id));
                }
                Json(json!({ "msg": format!("{} id {id} has been deleted", self.label) }))
            }
        };
        Ok(response.into_response())
    }
}

fn missing(label: &str, id: &str) -> GatewayError {
    GatewayError::BadRequest(format!("No {label} data with id {id}"))
}
