use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::remote::{EntryDescriptor, Gateway, Listing, ModelInfo};
use crate::tree::node::EntryId;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
struct CreateFileBody<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dir: Option<EntryId>,
}

#[derive(Serialize)]
struct DirectoryBody<'a> {
    name: &'a str,
    summary: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dir: Option<EntryId>,
}

#[derive(Serialize)]
struct RenameBody<'a> {
    name: &'a str,
}

/// [`Gateway`] over the workspace's JSON/HTTP API.
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder.header(AUTHORIZATION, format!("Bearer {}", token))
    }

    /// Send a request and turn non-success statuses into [`AppError::Api`].
    async fn send(&self, builder: RequestBuilder, url: &str) -> Result<Response> {
        tracing::debug!(url, "workspace request");
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Api {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned + Default>(&self, token: &str, path: &str) -> Result<T> {
        let url = self.url(path);
        let builder = self
            .authorized(self.client.get(&url), token)
            .header(ACCEPT, "application/json");
        let response = self.send(builder, &url).await?;
        decode(response).await
    }

    async fn send_json<B: Serialize, T: DeserializeOwned + Default>(
        &self,
        token: &str,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(path);
        let builder = self
            .authorized(self.client.request(method, &url), token)
            .header(ACCEPT, "application/json")
            .json(body);
        let response = self.send(builder, &url).await?;
        decode(response).await
    }

    async fn delete(&self, token: &str, path: &str) -> Result<()> {
        let url = self.url(path);
        let builder = self
            .authorized(self.client.delete(&url), token)
            .header(ACCEPT, "application/json");
        // 204 or a JSON descriptor: the body is not needed either way.
        self.send(builder, &url).await?;
        Ok(())
    }
}

/// Decode a JSON body, treating an empty body as the type's default.
async fn decode<T: DeserializeOwned + Default>(response: Response) -> Result<T> {
    if response.status() == StatusCode::NO_CONTENT {
        return Ok(T::default());
    }
    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn fetch_root(&self, token: &str) -> Result<Listing> {
        self.get_json(token, "tree").await
    }

    async fn fetch_directory(&self, token: &str, id: EntryId) -> Result<Listing> {
        self.get_json(token, &format!("dir/{}", id)).await
    }

    async fn create_file(
        &self,
        token: &str,
        name: &str,
        parent: Option<EntryId>,
    ) -> Result<EntryDescriptor> {
        let body = CreateFileBody { name, dir: parent };
        self.send_json(token, reqwest::Method::POST, "file", &body)
            .await
    }

    async fn create_directory(
        &self,
        token: &str,
        name: &str,
        summary: &str,
        parent: Option<EntryId>,
    ) -> Result<EntryDescriptor> {
        let body = DirectoryBody {
            name,
            summary,
            dir: parent,
        };
        self.send_json(token, reqwest::Method::POST, "dir", &body)
            .await
    }

    async fn edit_file(&self, token: &str, id: EntryId, name: &str) -> Result<EntryDescriptor> {
        self.send_json(
            token,
            reqwest::Method::PUT,
            &format!("file/{}", id),
            &RenameBody { name },
        )
        .await
    }

    async fn edit_directory(
        &self,
        token: &str,
        id: EntryId,
        name: &str,
        summary: &str,
    ) -> Result<EntryDescriptor> {
        let body = DirectoryBody {
            name,
            summary,
            dir: None,
        };
        self.send_json(token, reqwest::Method::PUT, &format!("dir/{}", id), &body)
            .await
    }

    async fn delete_file(&self, token: &str, id: EntryId) -> Result<()> {
        self.delete(token, &format!("file/{}", id)).await
    }

    async fn delete_directory(&self, token: &str, id: EntryId) -> Result<()> {
        self.delete(token, &format!("dir/{}", id)).await
    }

    async fn file_info(&self, token: &str, id: EntryId) -> Result<EntryDescriptor> {
        self.get_json(token, &format!("file/{}", id)).await
    }

    async fn file_content(&self, token: &str, id: EntryId) -> Result<String> {
        let url = self.url(&format!("file/{}/contents", id));
        let builder = self
            .authorized(self.client.get(&url), token)
            .header(ACCEPT, "text/plain");
        let response = self.send(builder, &url).await?;
        Ok(response.text().await?)
    }

    async fn save_file_content(&self, token: &str, id: EntryId, content: &str) -> Result<()> {
        let url = self.url(&format!("file/{}/contents", id));
        let builder = self
            .authorized(self.client.post(&url), token)
            .header(CONTENT_TYPE, "text/plain")
            .body(content.to_string());
        self.send(builder, &url).await?;
        Ok(())
    }

    async fn list_models(&self, token: &str) -> Result<Vec<ModelInfo>> {
        self.get_json(token, "ollama/models").await
    }
}
