//! Remote inventory service client.
//!
//! The remote service is the authority for categories, products and stock.
//! The sync engines talk to it through the narrow [`RemoteInventory`]
//! trait so they can be exercised against an in-memory fake; the real
//! implementation is [`HttpRemote`].

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use mostrador_catalog::{Category, Product};
use mostrador_core::{CategoryId, ProductId};

use crate::types::Vendor;

/// Bounded timeout for every remote call, so a hung service can never
/// wedge the sync indicator.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Remote call failures.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote unreachable: {0}")]
    Unreachable(String),

    #[error("remote API error ({0}): {1}")]
    Api(u16, String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// The operations the sync subsystem needs from the remote service.
///
/// Futures are `Send` so engines can run inside spawned workers.
pub trait RemoteInventory: Send + Sync {
    fn fetch_categories(&self)
    -> impl Future<Output = Result<Vec<Category>, RemoteError>> + Send;

    fn fetch_products(&self) -> impl Future<Output = Result<Vec<Product>, RemoteError>> + Send;

    /// Current authoritative record for one product. Reconciliation
    /// re-fetches rather than trusting the local replica, since remote
    /// state may have changed independently.
    fn fetch_product(
        &self,
        id: &ProductId,
    ) -> impl Future<Output = Result<Product, RemoteError>> + Send;

    /// Full-record update; the only stock-mutation primitive.
    fn update_product(
        &self,
        product: &Product,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Establish the vendor identity used to key the local sale tables.
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<Vendor, RemoteError>> + Send;

    /// Lightweight reachability probe.
    fn ping(&self) -> impl Future<Output = bool> + Send;
}

/// Full product record sent on update. The server expects the whole
/// record rather than a stock-only delta, avoiding partial-update
/// ambiguity on its side.
#[derive(Debug, Serialize)]
struct ProductBody<'a> {
    name: &'a str,
    price: f64,
    stock: i64,
    category: Option<&'a CategoryId>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    success: bool,
    #[serde(default)]
    user: Option<Vendor>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the remote inventory service.
pub struct HttpRemote {
    base_url: String,
    http: reqwest::Client,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Unreachable(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, RemoteError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| RemoteError::Unreachable(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Api(status, body));
        }

        resp.json().await.map_err(|e| RemoteError::Parse(e.to_string()))
    }
}

impl RemoteInventory for HttpRemote {
    async fn fetch_categories(&self) -> Result<Vec<Category>, RemoteError> {
        self.get_json("/categories").await
    }

    async fn fetch_products(&self) -> Result<Vec<Product>, RemoteError> {
        self.get_json("/products").await
    }

    async fn fetch_product(&self, id: &ProductId) -> Result<Product, RemoteError> {
        self.get_json(&format!("/products/{id}")).await
    }

    async fn update_product(&self, product: &Product) -> Result<(), RemoteError> {
        let url = format!("{}/products/{}", self.base_url, product.id);
        let body = ProductBody {
            name: &product.name,
            price: product.price,
            stock: product.stock,
            category: product.category.as_ref(),
        };

        let resp = self
            .http
            .put(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::Unreachable(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Api(status, body));
        }

        Ok(())
    }

    async fn login(&self, username: &str, password: &str) -> Result<Vendor, RemoteError> {
        let url = format!("{}/login", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(|e| RemoteError::Unreachable(e.to_string()))?;

        let status = resp.status().as_u16();
        let body: LoginResponse = resp
            .json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))?;

        match (body.success, body.user) {
            (true, Some(user)) => Ok(user),
            _ => Err(RemoteError::Api(
                status,
                body.error.unwrap_or_else(|| "login rejected".to_string()),
            )),
        }
    }

    async fn ping(&self) -> bool {
        match self.http.get(&self.base_url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}
