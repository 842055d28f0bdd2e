use std::sync::Arc;

use async_trait::async_trait;
use common_auth::Principal;
use serde_json::Value;

use super::models::{Resource, UploadedImage};
use super::DataSource;
use crate::error::ApiResult;
use crate::pipeline::{ApiClient, FileUpload};

/// Live backend, reached through the authenticated pipeline.
pub struct RemoteSource {
    client: Arc<ApiClient>,
}

impl RemoteSource {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    fn record_path(&self, resource: Resource, id: &str) -> String {
        format!("{}/{}", resource.endpoint(self.client.endpoints()), id)
    }
}

#[async_trait]
impl DataSource for RemoteSource {
    async fn login(&self, login: &str, password: &str) -> ApiResult<Principal> {
        self.client.login(login, password).await
    }

    async fn logout(&self) -> ApiResult<()> {
        self.client.logout().await
    }

    async fn list(&self, resource: Resource) -> ApiResult<Vec<Value>> {
        self.client
            .get(resource.endpoint(self.client.endpoints()))
            .await
    }

    async fn create(&self, resource: Resource, draft: Value) -> ApiResult<Value> {
        self.client
            .post(resource.endpoint(self.client.endpoints()), &draft)
            .await
    }

    async fn update(&self, resource: Resource, id: &str, patch: Value) -> ApiResult<Value> {
        self.client
            .put(&self.record_path(resource, id), &patch)
            .await
    }

    async fn delete(&self, resource: Resource, id: &str) -> ApiResult<()> {
        let _: Value = self.client.delete(&self.record_path(resource, id)).await?;
        Ok(())
    }

    async fn cities(&self) -> ApiResult<Vec<String>> {
        self.client.get(&self.client.endpoints().cities).await
    }

    async fn upload_image(&self, file: FileUpload) -> ApiResult<String> {
        let uploaded: UploadedImage = self
            .client
            .upload_file(&self.client.endpoints().images_upload, file)
            .await?;
        Ok(uploaded.filename)
    }

    fn image_url(&self, filename: &str) -> String {
        self.client
            .url(&format!("{}/{}", self.client.endpoints().images_get, filename))
    }
}
