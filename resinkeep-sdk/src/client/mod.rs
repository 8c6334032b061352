//! HTTP and WebSocket client for the resinkeep API.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest`.

mod watch;

pub use watch::WatchStream;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::objects::{
    ContainerParameters, ContainerQuery, ContainerResponse, ContainerUpdateParameters,
    ContainerUseParameters, MaterialTypeParameters, MaterialTypeQuery, MaterialTypeResponse,
    MaterialTypeUpdateParameters, Message, Resource, TOTAL_COUNT_HEADER, VendorParameters,
    VendorQuery, VendorResponse, VendorUpdateParameters,
};

/// Errors produced by the SDK client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket handshake or framing failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The server returned a non-2xx status code.
    #[error("api error: status {status}, body: {body}")]
    Api { status: StatusCode, body: String },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// One page of search results plus the total number of matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
}

/// Typed client for the `/api/v1` surface.
#[derive(Debug, Clone)]
pub struct ResinkeepClient {
    http: Client,
    base_url: Url,
}

impl ResinkeepClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    // ----------------------------------------------------------------
    // Vendors
    // ----------------------------------------------------------------

    pub async fn find_vendors(&self, query: &VendorQuery) -> Result<Page<VendorResponse>, ClientError> {
        self.find("/api/v1/vendor", query).await
    }

    pub async fn get_vendor(&self, id: i64) -> Result<VendorResponse, ClientError> {
        self.get(&format!("/api/v1/vendor/{id}")).await
    }

    pub async fn create_vendor(&self, params: &VendorParameters) -> Result<VendorResponse, ClientError> {
        self.send_json(reqwest::Method::POST, "/api/v1/vendor", params)
            .await
    }

    pub async fn update_vendor(
        &self,
        id: i64,
        patch: &VendorUpdateParameters,
    ) -> Result<VendorResponse, ClientError> {
        self.send_json(reqwest::Method::PATCH, &format!("/api/v1/vendor/{id}"), patch)
            .await
    }

    pub async fn delete_vendor(&self, id: i64) -> Result<Message, ClientError> {
        self.delete(&format!("/api/v1/vendor/{id}")).await
    }

    // ----------------------------------------------------------------
    // Material types
    // ----------------------------------------------------------------

    pub async fn find_material_types(
        &self,
        query: &MaterialTypeQuery,
    ) -> Result<Page<MaterialTypeResponse>, ClientError> {
        self.find("/api/v1/material_type", query).await
    }

    pub async fn get_material_type(&self, id: i64) -> Result<MaterialTypeResponse, ClientError> {
        self.get(&format!("/api/v1/material_type/{id}")).await
    }

    pub async fn create_material_type(
        &self,
        params: &MaterialTypeParameters,
    ) -> Result<MaterialTypeResponse, ClientError> {
        self.send_json(reqwest::Method::POST, "/api/v1/material_type", params)
            .await
    }

    pub async fn update_material_type(
        &self,
        id: i64,
        patch: &MaterialTypeUpdateParameters,
    ) -> Result<MaterialTypeResponse, ClientError> {
        self.send_json(
            reqwest::Method::PATCH,
            &format!("/api/v1/material_type/{id}"),
            patch,
        )
        .await
    }

    pub async fn delete_material_type(&self, id: i64) -> Result<Message, ClientError> {
        self.delete(&format!("/api/v1/material_type/{id}")).await
    }

    // ----------------------------------------------------------------
    // Containers
    // ----------------------------------------------------------------

    pub async fn find_containers(
        &self,
        query: &ContainerQuery,
    ) -> Result<Page<ContainerResponse>, ClientError> {
        self.find("/api/v1/container", query).await
    }

    pub async fn get_container(&self, id: i64) -> Result<ContainerResponse, ClientError> {
        self.get(&format!("/api/v1/container/{id}")).await
    }

    pub async fn create_container(
        &self,
        params: &ContainerParameters,
    ) -> Result<ContainerResponse, ClientError> {
        self.send_json(reqwest::Method::POST, "/api/v1/container", params)
            .await
    }

    pub async fn update_container(
        &self,
        id: i64,
        patch: &ContainerUpdateParameters,
    ) -> Result<ContainerResponse, ClientError> {
        self.send_json(reqwest::Method::PATCH, &format!("/api/v1/container/{id}"), patch)
            .await
    }

    pub async fn delete_container(&self, id: i64) -> Result<Message, ClientError> {
        self.delete(&format!("/api/v1/container/{id}")).await
    }

    /// `PUT /api/v1/container/{id}/use` – consume material by weight or length.
    pub async fn use_container(
        &self,
        id: i64,
        usage: &ContainerUseParameters,
    ) -> Result<ContainerResponse, ClientError> {
        self.send_json(
            reqwest::Method::PUT,
            &format!("/api/v1/container/{id}/use"),
            usage,
        )
        .await
    }

    // ----------------------------------------------------------------
    // Distinct values
    // ----------------------------------------------------------------

    pub async fn list_materials(&self) -> Result<Vec<String>, ClientError> {
        self.get("/api/v1/material").await
    }

    pub async fn list_article_numbers(&self) -> Result<Vec<String>, ClientError> {
        self.get("/api/v1/article-number").await
    }

    pub async fn list_locations(&self) -> Result<Vec<String>, ClientError> {
        self.get("/api/v1/location").await
    }

    pub async fn list_lot_numbers(&self) -> Result<Vec<String>, ClientError> {
        self.get("/api/v1/lot-number").await
    }

    // ----------------------------------------------------------------
    // Change stream
    // ----------------------------------------------------------------

    /// Open a change stream for every entity of `resource`, or for the
    /// single entity `id` when given.
    pub async fn watch(&self, resource: Resource, id: Option<i64>) -> Result<WatchStream, ClientError> {
        let path = match id {
            Some(id) => format!("/api/v1/{resource}/{id}"),
            None => format!("/api/v1/{resource}"),
        };
        let mut url = self.base_url.join(&path)?;
        let scheme = match url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        // http(s) -> ws(s) is always an allowed scheme change
        let _ = url.set_scheme(scheme);
        WatchStream::connect(url).await
    }

    // ----------------------------------------------------------------
    // Plumbing
    // ----------------------------------------------------------------

    async fn find<Q, T>(&self, path: &str, query: &Q) -> Result<Page<T>, ClientError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.base_url.join(path)?;
        let resp = self.http.get(url).query(query).send().await?;
        let total_count = resp
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        let items: Vec<T> = parse_response(resp).await?;
        let total_count = total_count.unwrap_or(items.len() as u64);
        Ok(Page { items, total_count })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.base_url.join(path)?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.base_url.join(path)?;
        let resp = self.http.delete(url).send().await?;
        parse_response(resp).await
    }

    async fn send_json<B, T>(&self, method: reqwest::Method, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.base_url.join(path)?;
        let resp = self.http.request(method, url).json(body).send().await?;
        parse_response(resp).await
    }
}

async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}
