//! Data access for the CRUD screens.
//!
//! [`DataService`] hides whether calls go to the live backend through the
//! authenticated pipeline or to the in-process substitute. Both share the same
//! [`SessionResolver`](common_auth::SessionResolver), so identity has one
//! source of truth either way.

pub mod models;
pub mod remote;
pub mod substitute;

use std::sync::Arc;

use async_trait::async_trait;
use common_auth::Principal;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::pipeline::FileUpload;

pub use models::{Category, Courier, Product, Record, Resource, Subcategory};
pub use remote::RemoteSource;
pub use substitute::SubstituteSource;

/// Placeholder shown for records without an image.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";

#[async_trait]
pub trait DataSource: Send + Sync {
    async fn login(&self, login: &str, password: &str) -> ApiResult<Principal>;
    async fn logout(&self) -> ApiResult<()>;
    async fn list(&self, resource: Resource) -> ApiResult<Vec<Value>>;
    async fn create(&self, resource: Resource, draft: Value) -> ApiResult<Value>;
    async fn update(&self, resource: Resource, id: &str, patch: Value) -> ApiResult<Value>;
    async fn delete(&self, resource: Resource, id: &str) -> ApiResult<()>;
    async fn cities(&self) -> ApiResult<Vec<String>>;
    async fn upload_image(&self, file: FileUpload) -> ApiResult<String>;
    fn image_url(&self, filename: &str) -> String;
}

#[derive(Clone)]
pub struct DataService {
    source: Arc<dyn DataSource>,
}

impl DataService {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self { source }
    }

    pub async fn login(&self, login: &str, password: &str) -> ApiResult<Principal> {
        self.source.login(login, password).await
    }

    pub async fn logout(&self) -> ApiResult<()> {
        self.source.logout().await
    }

    pub async fn list<R: Record>(&self) -> ApiResult<Vec<R>> {
        self.source
            .list(R::RESOURCE)
            .await?
            .into_iter()
            .map(from_value)
            .collect()
    }

    pub async fn create<R, D>(&self, draft: &D) -> ApiResult<R>
    where
        R: Record,
        D: Serialize + Sync + ?Sized,
    {
        let draft = to_value(draft)?;
        let record: R = from_value(self.source.create(R::RESOURCE, draft).await?)?;
        debug!(resource = R::RESOURCE.label(), id = record.id(), "record created");
        Ok(record)
    }

    pub async fn update<R, P>(&self, id: &str, patch: &P) -> ApiResult<R>
    where
        R: Record,
        P: Serialize + Sync + ?Sized,
    {
        let patch = to_value(patch)?;
        from_value(self.source.update(R::RESOURCE, id, patch).await?)
    }

    pub async fn delete<R: Record>(&self, id: &str) -> ApiResult<()> {
        self.source.delete(R::RESOURCE, id).await
    }

    pub async fn categories(&self) -> ApiResult<Vec<Category>> {
        self.list().await
    }

    pub async fn subcategories(&self) -> ApiResult<Vec<Subcategory>> {
        self.list().await
    }

    pub async fn products(&self) -> ApiResult<Vec<Product>> {
        self.list().await
    }

    pub async fn couriers(&self) -> ApiResult<Vec<Courier>> {
        self.list().await
    }

    pub async fn cities(&self) -> ApiResult<Vec<String>> {
        self.source.cities().await
    }

    pub async fn upload_image(&self, file: FileUpload) -> ApiResult<String> {
        self.source.upload_image(file).await
    }

    pub fn image_url(&self, filename: &str) -> String {
        if filename.is_empty() {
            return PLACEHOLDER_IMAGE.to_string();
        }
        self.source.image_url(filename)
    }
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|err| ApiError::InvalidRequest {
        detail: err.to_string(),
    })
}

fn from_value<R: Record>(value: Value) -> ApiResult<R> {
    serde_json::from_value(value).map_err(|err| ApiError::InvalidPayload {
        status: None,
        detail: err.to_string(),
    })
}
