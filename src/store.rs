//! Store seam for format-association persistence.
//!
//! [`FormatStore`] is the trait boundary the Chain Builder, Chain Extender
//! and Batch Editor write through; [`RestStore`] is the production
//! implementation speaking JSON over HTTP to the `/format-associations`
//! endpoints. Tests substitute an in-memory implementation.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    config::StoreConfig,
    error::{FormatoError, Result},
    format::{FormatId, FormatNode, FormatUpdate, MaterialId, NewFormat, SupplierId},
};

/// Persistence operations of the format-association store.
///
/// No retry and no timeout layer here: a failed call surfaces as
/// [`FormatoError::Store`], a stuck call stalls only its own operation.
#[async_trait]
pub trait FormatStore: Send + Sync {
    /// All nodes for a supplier, optionally narrowed to one material.
    async fn list(
        &self,
        supplier: SupplierId,
        material: Option<MaterialId>,
    ) -> Result<Vec<FormatNode>>;

    /// Create one node; the store assigns and returns its id.
    async fn create(&self, new: NewFormat) -> Result<FormatNode>;

    /// Update one node in place with a base-style or derived-style payload.
    async fn update(&self, id: FormatId, update: FormatUpdate) -> Result<FormatNode>;
}

#[async_trait]
impl<T: FormatStore + ?Sized> FormatStore for std::sync::Arc<T> {
    async fn list(
        &self,
        supplier: SupplierId,
        material: Option<MaterialId>,
    ) -> Result<Vec<FormatNode>> {
        (**self).list(supplier, material).await
    }

    async fn create(&self, new: NewFormat) -> Result<FormatNode> {
        (**self).create(new).await
    }

    async fn update(&self, id: FormatId, update: FormatUpdate) -> Result<FormatNode> {
        (**self).update(id, update).await
    }
}

/// REST-backed [`FormatStore`], bearer-token authenticated.
pub struct RestStore {
    client: Client,
    config: StoreConfig,
}

impl RestStore {
    pub fn new(config: StoreConfig) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(RestStore { client, config })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.config.base_url.join(path)?)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn expect_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FormatoError::Store {
                status: Some(status.as_u16()),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl FormatStore for RestStore {
    async fn list(
        &self,
        supplier: SupplierId,
        material: Option<MaterialId>,
    ) -> Result<Vec<FormatNode>> {
        let url = self.endpoint("format-associations")?;
        tracing::debug!("GET {url} supplierId={supplier} materialId={material:?}");
        let mut request = self
            .client
            .get(url)
            .query(&[("supplierId", supplier.to_string())]);
        if let Some(material) = material {
            request = request.query(&[("materialId", material.to_string())]);
        }
        let response = self.authorize(request).send().await?;
        Self::expect_json(response).await
    }

    async fn create(&self, new: NewFormat) -> Result<FormatNode> {
        let url = self.endpoint("format-associations")?;
        tracing::debug!("POST {url} label={}", new.label);
        let response = self.authorize(self.client.post(url).json(&new)).send().await?;
        Self::expect_json(response).await
    }

    async fn update(&self, id: FormatId, update: FormatUpdate) -> Result<FormatNode> {
        let url = self.endpoint(&format!("format-associations/{id}"))?;
        tracing::debug!("PUT {url}");
        let response = self
            .authorize(self.client.put(url).json(&update))
            .send()
            .await?;
        Self::expect_json(response).await
    }
}
