//! HTTP transport for built requests

use crate::error::{Error, Result};
use crate::models::{MediaUpload, Request, Response, ResponseBody, ResumableUpload, UploadSource};
use futures::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::{Body, Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Sanitize response body for logging
/// Truncates long responses and drops control characters
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.chars().count() > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Sends requests. Implementations don't check the status code: callers
/// use [`Response::raise_for_status`].
pub trait Session: Send + Sync {
    fn send(&self, request: &Request) -> impl Future<Output = Result<Response>> + Send;
}

/// [`Session`] backed by reqwest
#[derive(Debug, Clone)]
pub struct ReqwestSession {
    client: Client,
}

impl ReqwestSession {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("gdiscovery/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn builder(&self, request: &Request, url: &str) -> Result<RequestBuilder> {
        let method = reqwest::Method::from_bytes(request.method().as_bytes())
            .map_err(|_| Error::usage(format!("Invalid HTTP method {:?}", request.method())))?;
        let mut builder = self.client.request(method, url);
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = request.timeout() {
            builder = builder.timeout(Duration::from_secs(timeout));
        }
        Ok(builder)
    }

    async fn fire(&self, request: &Request) -> Result<reqwest::Response> {
        if let Some(upload) = request.media_upload() {
            return self.upload(request, upload).await;
        }

        let url = match request.media_download() {
            Some(download) => download.download_url.as_str(),
            None => request.url(),
        };
        tracing::debug!("{} {}", request.method(), url);
        let mut builder = self.builder(request, url)?;
        if let Some(json) = request.json() {
            builder = builder.json(json);
        } else if let Some(data) = request.data() {
            builder = match data {
                Value::String(text) => builder.body(text.clone()),
                Value::Object(_) => builder.form(data),
                other => builder.body(other.to_string()),
            };
        }
        Ok(builder.send().await?)
    }

    async fn upload(&self, request: &Request, upload: &MediaUpload) -> Result<reqwest::Response> {
        let size = upload.source.len().await?;
        upload.check_size(size)?;
        let content_type = upload
            .content_type
            .clone()
            .or_else(|| upload.mime_range.first().filter(|m| !m.contains('*')).cloned())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        if let Some(resumable) = upload.resumable.as_ref().filter(|r| size > r.chunk_size as u64) {
            return self
                .upload_resumable(request, resumable, &upload.source, size, &content_type)
                .await;
        }

        let content = upload.source.chunks(upload.chunk_size).await?;
        match request.json() {
            Some(metadata) if upload.multipart => {
                let url = with_upload_type(&upload.upload_path, "multipart");
                tracing::debug!("{} {} (multipart upload, {} bytes)", request.method(), url, size);
                let boundary = uuid::Uuid::new_v4().simple().to_string();
                let (head, tail) = multipart_related(&boundary, metadata, &content_type)?;
                let length = head.len() as u64 + size + tail.len() as u64;
                let body = stream::once(async move { Ok(head) })
                    .chain(content)
                    .chain(stream::once(async move { Ok(tail) }));
                Ok(self
                    .builder(request, &url)?
                    .header(CONTENT_TYPE, format!("multipart/related; boundary={boundary}"))
                    .header(CONTENT_LENGTH, length)
                    .body(Body::wrap_stream(body))
                    .send()
                    .await?)
            },
            _ => {
                let url = with_upload_type(&upload.upload_path, "media");
                tracing::debug!("{} {} (simple upload, {} bytes)", request.method(), url, size);
                Ok(self
                    .builder(request, &url)?
                    .header(CONTENT_TYPE, content_type)
                    .header(CONTENT_LENGTH, size)
                    .body(Body::wrap_stream(content))
                    .send()
                    .await?)
            },
        }
    }

    /// Start a session, then PUT the content chunk by chunk
    async fn upload_resumable(
        &self,
        request: &Request,
        resumable: &ResumableUpload,
        source: &UploadSource,
        total: u64,
        content_type: &str,
    ) -> Result<reqwest::Response> {
        let url = with_upload_type(&resumable.upload_path, "resumable");
        tracing::debug!("{} {} (resumable upload, {} bytes)", request.method(), url, total);

        let mut start = self
            .builder(request, &url)?
            .header("X-Upload-Content-Type", content_type)
            .header("X-Upload-Content-Length", total.to_string());
        if let Some(metadata) = request.json() {
            start = start.json(metadata);
        }
        let started = start.send().await?;
        if !started.status().is_success() {
            return Ok(started);
        }
        let location = started
            .headers()
            .get(LOCATION)
            .and_then(|l| l.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| Error::Http {
                status: started.status().as_u16(),
                message: "resumable upload session returned no Location header".into(),
                url: url.clone(),
            })?;

        let chunk_size = resumable.chunk_size.max(1);
        let mut offset = 0u64;
        loop {
            let chunk = source.read_chunk(offset, chunk_size).await?;
            let end = offset + chunk.len() as u64;
            let range = if total == 0 {
                "bytes */0".to_string()
            } else {
                format!("bytes {}-{}/{}", offset, end.saturating_sub(1), total)
            };
            tracing::debug!("PUT {} ({})", location, range);
            let mut put = self
                .client
                .put(&location)
                .header(CONTENT_TYPE, content_type)
                .header("Content-Range", range)
                .body(chunk);
            if let Some(timeout) = request.timeout() {
                put = put.timeout(Duration::from_secs(timeout));
            }
            let response = put.send().await?;
            // 308 Resume Incomplete: keep going
            if response.status() != StatusCode::PERMANENT_REDIRECT || end >= total || end == offset {
                return Ok(response);
            }
            offset = end;
        }
    }

    async fn resolve(&self, request: &Request, response: reqwest::Response) -> Result<Response> {
        let status = response.status();
        let headers: HeaderMap = response.headers().clone();
        let url = response.url().to_string();
        let reason = status.canonical_reason().map(str::to_string);

        let mut download_file = None;
        let body = match request.media_download() {
            Some(download) if status.is_success() => {
                let file = tokio::fs::File::create(&download.file_path).await?;
                let mut file = BufWriter::with_capacity(download.chunk_size.max(1), file);
                let mut stream = response.bytes_stream();
                let mut written = 0usize;
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk?;
                    written += chunk.len();
                    file.write_all(&chunk).await?;
                }
                file.flush().await?;
                tracing::debug!("Downloaded {} bytes to {}", written, download.file_path.display());
                download_file = Some(download.file_path.clone());
                ResponseBody::Empty
            },
            _ if status == StatusCode::NO_CONTENT => ResponseBody::Empty,
            _ => decode_body(response.bytes().await?.to_vec()),
        };

        if !status.is_success() {
            let text = match &body {
                ResponseBody::Json(value) => value.to_string(),
                ResponseBody::Text(text) => text.clone(),
                _ => String::new(),
            };
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&text));
        }

        Ok(Response {
            status_code: status.as_u16(),
            headers,
            url,
            body,
            reason,
            request: request.clone(),
            download_file,
        })
    }
}

impl Session for ReqwestSession {
    async fn send(&self, request: &Request) -> Result<Response> {
        let response = self.fire(request).await?;
        self.resolve(request, response).await
    }
}

/// JSON when it parses, text when it's UTF-8, raw bytes otherwise
fn decode_body(bytes: Vec<u8>) -> ResponseBody {
    if bytes.is_empty() {
        return ResponseBody::Empty;
    }
    if let Ok(json) = serde_json::from_slice::<Value>(&bytes) {
        return ResponseBody::Json(json);
    }
    match String::from_utf8(bytes) {
        Ok(text) => ResponseBody::Text(text),
        Err(e) => ResponseBody::Bytes(e.into_bytes()),
    }
}

fn with_upload_type(url: &str, upload_type: &str) -> String {
    let has_upload_type = url
        .split_once('?')
        .map(|(_, q)| url::form_urlencoded::parse(q.as_bytes()).any(|(k, _)| k == "uploadType"))
        .unwrap_or(false);
    if has_upload_type {
        url.to_string()
    } else if url.contains('?') {
        format!("{url}&uploadType={upload_type}")
    } else {
        format!("{url}?uploadType={upload_type}")
    }
}

/// The parts of a multipart/related body around the media content
fn multipart_related(boundary: &str, metadata: &Value, content_type: &str) -> Result<(Vec<u8>, Vec<u8>)> {
    let mut head = format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n").into_bytes();
    head.extend_from_slice(&serde_json::to_vec(metadata)?);
    head.extend_from_slice(format!("\r\n--{boundary}\r\nContent-Type: {content_type}\r\n\r\n").as_bytes());
    let tail = format!("\r\n--{boundary}--").into_bytes();
    Ok((head, tail))
}
