//! Resource collections behind the dashboard pages.
//!
//! Thin typed calls over [`HttpClient`]; every one of them goes through the
//! refresh protocol. Payloads default to `serde_json::Value` since the pages
//! own their shapes.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::client::HttpClient;
use crate::error::{ApiError, ApiResult};
use crate::models::{Envelope, ListEnvelope, ListQuery, Role};

/// API collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Stores,
    Products,
    Categories,
    Stock,
    Transactions,
    Analytics,
    AuditLogs,
}

impl Resource {
    pub const ALL: [Resource; 8] = [
        Resource::Users,
        Resource::Stores,
        Resource::Products,
        Resource::Categories,
        Resource::Stock,
        Resource::Transactions,
        Resource::Analytics,
        Resource::AuditLogs,
    ];

    /// Collection path.
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Users => "/api/v1/users",
            Resource::Stores => "/api/v1/stores",
            Resource::Products => "/api/v1/products",
            Resource::Categories => "/api/v1/categories",
            Resource::Stock => "/api/v1/stock",
            Resource::Transactions => "/api/v1/transactions",
            Resource::Analytics => "/api/v1/analytics",
            Resource::AuditLogs => "/api/v1/audit-logs",
        }
    }

    pub fn name(&self) -> &'static str {
        self.path().trim_start_matches("/api/v1/")
    }

    /// Path of a single item.
    pub fn item_path(&self, id: impl fmt::Display) -> String {
        format!("{}/{id}", self.path())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| format!("unknown resource: {s}"))
    }
}

/// CRUD calls for the dashboard pages.
#[derive(Clone)]
pub struct ResourceClient {
    client: Arc<HttpClient>,
}

impl ResourceClient {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    /// Paginated listing with `page`, `limit` and optional `search`.
    pub async fn list<T: DeserializeOwned>(
        &self,
        resource: Resource,
        query: &ListQuery,
    ) -> ApiResult<ListEnvelope<T>> {
        self.client
            .get_json(resource.path(), Some(query.to_pairs().as_slice()))
            .await
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        resource: Resource,
        id: impl fmt::Display,
    ) -> ApiResult<Envelope<T>> {
        self.client.get_json(&resource.item_path(id), None).await
    }

    pub async fn create<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        resource: Resource,
        body: &B,
    ) -> ApiResult<Envelope<T>> {
        self.client.post_json(resource.path(), Some(body)).await
    }

    pub async fn update<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        resource: Resource,
        id: impl fmt::Display,
        body: &B,
    ) -> ApiResult<Envelope<T>> {
        self.client.put_json(&resource.item_path(id), Some(body)).await
    }

    pub async fn delete(
        &self,
        resource: Resource,
        id: impl fmt::Display,
    ) -> ApiResult<Envelope<serde_json::Value>> {
        self.client.delete_json(&resource.item_path(id)).await
    }

    /// `PUT /users/{id}/role`.
    pub async fn set_user_role(
        &self,
        user_id: i64,
        role: Role,
    ) -> ApiResult<Envelope<serde_json::Value>> {
        let path = format!("{}/role", Resource::Users.item_path(user_id));
        self.client
            .put_json(&path, Some(&serde_json::json!({ "role": role })))
            .await
    }

    /// `GET /products/by-barcode/{code}`.
    pub async fn product_by_barcode<T: DeserializeOwned>(
        &self,
        barcode: &str,
    ) -> ApiResult<Envelope<T>> {
        if barcode.is_empty() || barcode == "." || barcode == ".." {
            return Err(ApiError::Validation(format!("invalid barcode `{barcode}`")));
        }
        let path = format!(
            "{}/by-barcode/{}",
            Resource::Products.path(),
            urlencoding::encode(barcode)
        );
        self.client.get_json(&path, None).await
    }

    /// `POST /stock/operations`.
    pub async fn stock_operation<B: Serialize + ?Sized>(
        &self,
        body: &B,
    ) -> ApiResult<Envelope<serde_json::Value>> {
        let path = format!("{}/operations", Resource::Stock.path());
        self.client.post_json(&path, Some(body)).await
    }
}
