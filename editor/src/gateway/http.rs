//! CMS REST API gateway
//!
//! Endpoints are joined onto the configured API base URL:
//! - `api/edit/*` for pages and the site style
//! - `api/files/*` for uploaded files
//!
//! Uploads stream the body in chunks and report progress as each chunk is
//! handed to the transport.

use async_trait::async_trait;
use bytes::Bytes;
use futures::channel::mpsc;
use futures::future::{self, Either};
use futures::{FutureExt, StreamExt};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared_types::{
    DeleteFileRequest, NewPage, Page, RenameRequest, SiteFile, StyleBody, UploadResponse,
};
use url::Url;

use super::{ContentGateway, ListenerRegistry};
use crate::config::EditorConfig;
use crate::error::GatewayError;

pub struct HttpGateway {
    client: Client,
    api_base: Url,
    token: Option<String>,
    upload_chunk_bytes: usize,
    listeners: ListenerRegistry,
}

impl HttpGateway {
    pub fn new(config: &EditorConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("http_client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base_url.clone(),
            token: config.api_token.clone(),
            upload_chunk_bytes: config.upload_chunk_bytes.max(1),
            listeners: ListenerRegistry::new(),
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, GatewayError> {
        let url = self
            .api_base
            .join(path)
            .map_err(|e| GatewayError::Transport(format!("invalid endpoint {path}: {e}")))?;
        let builder = self.client.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
            None => builder,
        })
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, GatewayError> {
        let response = builder.send().await.map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(describe_http_error(response).await);
        }
        Ok(response)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, GatewayError> {
        self.send(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_decode() {
        GatewayError::Decode(e.to_string())
    } else {
        GatewayError::Transport(e.to_string())
    }
}

/// Fold a non-success response into a `GatewayError`, lifting `error` or
/// `message` out of a JSON body when there is one.
async fn describe_http_error(response: Response) -> GatewayError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|json| {
                json.get("error")
                    .or_else(|| json.get("message"))
                    .and_then(|v| v.as_str())
                    .map(ToString::to_string)
            })
            .unwrap_or(body)
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Unauthorized,
        StatusCode::NOT_FOUND => GatewayError::NotFound(message),
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => GatewayError::Rejected(message),
        _ => GatewayError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

fn percent(sent: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent.min(total) * 100) / total) as u8
}

#[async_trait(?Send)]
impl ContentGateway for HttpGateway {
    async fn list_pages(&self) -> Result<Vec<Page>, GatewayError> {
        self.fetch_json(self.request(Method::GET, "api/edit/pages")?)
            .await
    }

    async fn list_files(&self) -> Result<Vec<SiteFile>, GatewayError> {
        self.fetch_json(self.request(Method::GET, "api/files/list")?)
            .await
    }

    async fn get_page(&self, name: &str) -> Result<Page, GatewayError> {
        let builder = self.request(Method::GET, "api/edit/page")?.query(&[("name", name)]);
        self.fetch_json(builder).await
    }

    async fn create_page(&self, page: &NewPage) -> Result<Page, GatewayError> {
        let builder = self.request(Method::POST, "api/edit/create")?.json(page);
        self.fetch_json(builder).await
    }

    async fn edit_page(&self, page: &Page) -> Result<(), GatewayError> {
        let builder = self.request(Method::POST, "api/edit/edit")?.json(page);
        self.send(builder).await.map(|_| ())
    }

    async fn rename_page(&self, old_name: &str, new_name: &str) -> Result<(), GatewayError> {
        let body = RenameRequest {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
        };
        let builder = self.request(Method::POST, "api/edit/rename")?.json(&body);
        self.send(builder).await.map(|_| ())
    }

    async fn rename_file(&self, old_name: &str, new_name: &str) -> Result<(), GatewayError> {
        let body = RenameRequest {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
        };
        let builder = self.request(Method::POST, "api/files/rename")?.json(&body);
        self.send(builder).await.map(|_| ())
    }

    async fn delete_page(&self, page: &Page) -> Result<(), GatewayError> {
        let builder = self.request(Method::POST, "api/edit/delete")?.json(page);
        self.send(builder).await.map(|_| ())
    }

    async fn delete_file(&self, name: &str) -> Result<(), GatewayError> {
        let body = DeleteFileRequest {
            name: name.to_string(),
        };
        let builder = self.request(Method::POST, "api/files/delete")?.json(&body);
        self.send(builder).await.map(|_| ())
    }

    async fn upload_file(
        &self,
        name: &str,
        bytes: Vec<u8>,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<UploadResponse, GatewayError> {
        let total = bytes.len();
        let chunks: Vec<Bytes> = bytes
            .chunks(self.upload_chunk_bytes)
            .map(Bytes::copy_from_slice)
            .collect();

        // The body stream must be Send; progress crosses back over a channel
        // and is relayed to the callback on this task.
        let (progress_tx, mut progress_rx) = mpsc::unbounded::<u8>();
        let mut sent = 0usize;
        let body = futures::stream::iter(chunks).map(move |chunk| {
            sent += chunk.len();
            let _ = progress_tx.unbounded_send(percent(sent, total));
            Ok::<Bytes, std::io::Error>(chunk)
        });

        let builder = self
            .request(Method::POST, "api/files/upload")?
            .query(&[("name", name)])
            .header(CONTENT_LENGTH, total)
            .body(reqwest::Body::wrap_stream(body));

        let mut request = Box::pin(self.fetch_json::<UploadResponse>(builder));
        let response = loop {
            match future::select(request, progress_rx.next()).await {
                Either::Left((response, _)) => break response,
                Either::Right((Some(progress), pending)) => {
                    on_progress(progress);
                    request = pending;
                }
                Either::Right((None, pending)) => break pending.await,
            }
        };
        while let Some(Some(progress)) = progress_rx.next().now_or_never() {
            on_progress(progress);
        }
        if total == 0 {
            on_progress(100);
        }
        response
    }

    async fn get_style(&self) -> Result<String, GatewayError> {
        let body: StyleBody = self
            .fetch_json(self.request(Method::GET, "api/edit/style")?)
            .await?;
        Ok(body.style)
    }

    async fn set_style(&self, style: &str) -> Result<(), GatewayError> {
        let body = StyleBody {
            style: style.to_string(),
        };
        let builder = self.request(Method::POST, "api/edit/style")?.json(&body);
        self.send(builder).await.map(|_| ())
    }

    fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }
}
