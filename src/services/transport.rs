use crate::constants::network;
use crate::errors::ClientError;
use crate::services::request::{MultipartPart, OutgoingRequest, RequestBody};
use crate::services::response::RawResponse;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse, ClientError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout_ms: Option<u64>) -> Result<Self, ClientError> {
        let mut builder = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(network::MAX_REDIRECTS));
        if let Some(timeout_ms) = timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        let client = builder.build().map_err(|err| {
            ClientError::internal(format!("Failed to build HTTP client: {}", err))
        })?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn multipart_form(parts: Vec<MultipartPart>) -> Result<Form, ClientError> {
    let mut form = Form::new();
    for part in parts {
        let mut piece = Part::bytes(part.content.to_vec());
        if let Some(file_name) = part.file_name {
            piece = piece.file_name(file_name);
        }
        if let Some(content_type) = part.content_type {
            piece = piece.mime_str(&content_type).map_err(|err| {
                ClientError::configuration(format!(
                    "Invalid content type for part '{}': {}",
                    part.name, err
                ))
            })?;
        }
        form = form.part(part.name, piece);
    }
    Ok(form)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse, ClientError> {
        let OutgoingRequest {
            method,
            url,
            headers,
            body,
        } = request;
        let mut builder = self.client.request(method, url).headers(headers);
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Bytes { content, .. } => builder.body(content),
            RequestBody::Multipart(parts) => builder.multipart(multipart_form(parts)?),
        };
        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        return ClientError::timeout("HTTP request timed out");
    }
    if err.is_builder() {
        return ClientError::configuration(err.to_string());
    }
    ClientError::transport(err.to_string())
}
