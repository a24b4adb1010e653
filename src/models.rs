//! Request and response models
//!
//! [`Request`] is what the method builder produces and what sessions and
//! credential managers consume. [`Response`] is what a session hands back.

use crate::error::{Error, Result, ValidationError};
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use indexmap::IndexMap;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = 1024 * 1024;
pub const DEFAULT_DOWNLOAD_CHUNK_SIZE: usize = 1024 * 1024;

const MEDIA_SIZE_BIT_SHIFTS: &[(&str, u32)] = &[("KB", 10), ("MB", 20), ("GB", 30), ("TB", 40)];

/// Parse a Discovery media size such as `"10GB"` into bytes.
///
/// A bare numeral is a byte count. Malformed input yields `None`, which
/// disables the size check.
pub fn parse_media_size(size: &str) -> Option<u64> {
    let size = size.trim();
    if size.is_empty() {
        return None;
    }
    let upper = size.to_ascii_uppercase();
    let parsed = match MEDIA_SIZE_BIT_SHIFTS
        .iter()
        .find(|(unit, _)| upper.ends_with(unit))
    {
        Some((unit, shift)) => upper[..upper.len() - unit.len()]
            .trim()
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(1u64 << shift)),
        None => upper.parse::<u64>().ok(),
    };
    if parsed.is_none() {
        tracing::warn!("Unparseable media size {:?}, upload size won't be checked", size);
    }
    parsed
}

/// Where upload content comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl UploadSource {
    /// Size in bytes, reading file metadata if needed
    pub async fn len(&self) -> std::io::Result<u64> {
        match self {
            Self::Path(path) => Ok(tokio::fs::metadata(path).await?.len()),
            Self::Bytes(bytes) => Ok(bytes.len() as u64),
        }
    }

    /// Up to `len` bytes starting at `offset`
    pub async fn read_chunk(&self, offset: u64, len: usize) -> std::io::Result<Vec<u8>> {
        match self {
            Self::Path(path) => {
                let mut file = tokio::fs::File::open(path).await?;
                file.seek(SeekFrom::Start(offset)).await?;
                let mut chunk = Vec::with_capacity(len);
                file.take(len as u64).read_to_end(&mut chunk).await?;
                Ok(chunk)
            },
            Self::Bytes(bytes) => {
                let start = usize::try_from(offset).unwrap_or(usize::MAX).min(bytes.len());
                let end = start.saturating_add(len).min(bytes.len());
                Ok(bytes[start..end].to_vec())
            },
        }
    }

    /// The content as a stream of `chunk_size` pieces. Files are read
    /// lazily, one chunk at a time.
    pub async fn chunks(&self, chunk_size: usize) -> std::io::Result<BoxStream<'static, std::io::Result<Vec<u8>>>> {
        let chunk_size = chunk_size.max(1);
        match self {
            Self::Path(path) => {
                let file = tokio::fs::File::open(path).await?;
                Ok(stream::try_unfold(file, move |file| async move {
                    let mut chunk = Vec::with_capacity(chunk_size);
                    let mut reader = file.take(chunk_size as u64);
                    reader.read_to_end(&mut chunk).await?;
                    if chunk.is_empty() {
                        return Ok(None);
                    }
                    Ok::<_, std::io::Error>(Some((chunk, reader.into_inner())))
                })
                .boxed())
            },
            Self::Bytes(bytes) => {
                let pieces: Vec<std::io::Result<Vec<u8>>> =
                    bytes.chunks(chunk_size).map(|c| Ok(c.to_vec())).collect();
                Ok(stream::iter(pieces).boxed())
            },
        }
    }
}

impl std::fmt::Display for UploadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Bytes(bytes) => write!(f, "<{} bytes in memory>", bytes.len()),
        }
    }
}

impl From<PathBuf> for UploadSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for UploadSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&str> for UploadSource {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<Vec<u8>> for UploadSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// Resumable upload endpoint of a media upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumableUpload {
    pub upload_path: String,
    pub multipart: bool,
    pub chunk_size: usize,
}

/// Media upload descriptor attached to a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub source: UploadSource,
    pub upload_path: String,
    pub mime_range: Vec<String>,
    /// Max upload size in bytes, when the method declares one
    pub max_size: Option<u64>,
    pub multipart: bool,
    pub chunk_size: usize,
    pub resumable: Option<ResumableUpload>,
    pub validate: bool,
    pub content_type: Option<String>,
}

impl MediaUpload {
    pub fn new(source: UploadSource, upload_path: impl Into<String>) -> Self {
        Self {
            source,
            upload_path: upload_path.into(),
            mime_range: Vec::new(),
            max_size: None,
            multipart: false,
            chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
            resumable: None,
            validate: true,
            content_type: None,
        }
    }

    /// Fail if `size` is over the declared max size
    pub fn check_size(&self, size: u64) -> Result<(), ValidationError> {
        match self.max_size {
            Some(max_size) if self.validate && size > max_size => Err(ValidationError::new(format!(
                "\"{}\" has a size of {}KB. Max upload size for this endpoint is: {}KB.",
                self.source,
                size as f64 / 1000.0,
                max_size as f64 / 1000.0
            ))),
            _ => Ok(()),
        }
    }
}

/// Media download descriptor attached to a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDownload {
    pub file_path: PathBuf,
    pub download_url: String,
    pub chunk_size: usize,
}

/// Keys of a call that steer the build instead of being URL parameters
pub const RESERVED_KEYWORDS: &[&str] = &[
    "validate",
    "data",
    "json",
    "upload_file",
    "download_file",
    "timeout",
];

/// Arguments of a single method call.
///
/// `params` holds path, query and extra URL parameters. Keys may use the
/// underscore form of dashed parameter names (`start_token` for
/// `start-token`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub params: IndexMap<String, Value>,
    /// Overrides the API-level validation flag when set
    pub validate: Option<bool>,
    pub json: Option<Value>,
    pub data: Option<Value>,
    pub upload_file: Option<UploadSource>,
    pub download_file: Option<PathBuf>,
    /// Seconds
    pub timeout: Option<u64>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = Some(validate);
        self
    }

    pub fn json(mut self, json: Value) -> Self {
        self.json = Some(json);
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn upload_file(mut self, source: impl Into<UploadSource>) -> Self {
        self.upload_file = Some(source.into());
        self
    }

    pub fn download_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.download_file = Some(path.into());
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    /// Split loosely typed keyword arguments into reserved controls and
    /// URL parameters. A `timeout` that isn't a non-negative integer (booleans
    /// included) is a usage error.
    pub fn from_kwargs(mut kwargs: IndexMap<String, Value>) -> Result<Self> {
        let timeout = match kwargs.shift_remove("timeout") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) if n.is_u64() => n.as_u64(),
            Some(other) => {
                return Err(Error::usage(format!(
                    "Timeouts can only be ints or None, got {other}"
                )));
            },
        };
        let validate = kwargs.shift_remove("validate").and_then(|v| v.as_bool());
        let json = kwargs.shift_remove("json").filter(|v| !v.is_null());
        let data = kwargs.shift_remove("data").filter(|v| !v.is_null());
        let upload_file = match kwargs.shift_remove("upload_file") {
            None | Some(Value::Null) => None,
            Some(Value::String(path)) => Some(UploadSource::Path(PathBuf::from(path))),
            Some(other) => {
                return Err(Error::usage(format!(
                    "upload_file must be a file path, got {other}"
                )));
            },
        };
        let download_file = match kwargs.shift_remove("download_file") {
            None | Some(Value::Null) => None,
            Some(Value::String(path)) => Some(PathBuf::from(path)),
            Some(other) => {
                return Err(Error::usage(format!(
                    "download_file must be a file path, got {other}"
                )));
            },
        };

        Ok(Self {
            params: kwargs,
            validate,
            json,
            data,
            upload_file,
            download_file,
            timeout,
        })
    }

    /// [`CallArgs::from_kwargs`] over a JSON object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Self::from_kwargs(map.into_iter().collect()),
            Value::Null => Ok(Self::default()),
            other => Err(Error::usage(format!(
                "Call arguments must be a JSON object, got {other}"
            ))),
        }
    }
}

/// An unsent HTTP request built from a discovery method
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: String,
    url: String,
    headers: IndexMap<String, String>,
    json: Option<Value>,
    data: Option<Value>,
    media_upload: Option<MediaUpload>,
    media_download: Option<MediaDownload>,
    timeout: Option<u64>,
}

impl Request {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: IndexMap::new(),
            json: None,
            data: None,
            media_upload: None,
            media_download: None,
            timeout: None,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    pub fn json(&self) -> Option<&Value> {
        self.json.as_ref()
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn media_upload(&self) -> Option<&MediaUpload> {
        self.media_upload.as_ref()
    }

    pub fn media_download(&self) -> Option<&MediaDownload> {
        self.media_download.as_ref()
    }

    /// Per-request timeout in seconds
    pub fn timeout(&self) -> Option<u64> {
        self.timeout
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// JSON body. Fails if a data body is already set.
    pub fn with_json(mut self, json: Value) -> Result<Self> {
        if self.data.is_some() {
            return Err(Error::usage("Pass either json or data, not both."));
        }
        self.json = Some(json);
        Ok(self)
    }

    /// Form/text body. Fails if a JSON body is already set.
    pub fn with_data(mut self, data: Value) -> Result<Self> {
        if self.json.is_some() {
            return Err(Error::usage("Pass either json or data, not both."));
        }
        self.data = Some(data);
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Option<u64>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_media_upload(mut self, media_upload: Option<MediaUpload>) -> Self {
        self.media_upload = media_upload;
        self
    }

    pub fn with_media_download(mut self, media_download: Option<MediaDownload>) -> Self {
        self.media_download = media_download;
        self
    }

    /// Whether `name` appears as a query key
    pub fn has_query_param(&self, name: &str) -> bool {
        let Some((_, query)) = self.url.split_once('?') else {
            return false;
        };
        url::form_urlencoded::parse(query.as_bytes()).any(|(k, _)| k == name)
    }

    /// Append `name=value` to the URL (and to upload URLs, which share the query)
    pub fn with_query_param(mut self, name: &str, value: &str) -> Self {
        self.url = append_query(&self.url, name, value);
        if let Some(upload) = self.media_upload.as_mut() {
            upload.upload_path = append_query(&upload.upload_path, name, value);
            if let Some(resumable) = upload.resumable.as_mut() {
                resumable.upload_path = append_query(&resumable.upload_path, name, value);
            }
        }
        if let Some(download) = self.media_download.as_mut() {
            download.download_url = append_query(&download.download_url, name, value);
        }
        self
    }

    /// Drop every `name=...` pair from the URL query
    pub fn without_query_param(mut self, name: &str) -> Self {
        let Some((base, query)) = self.url.split_once('?') else {
            return self;
        };
        let kept: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
            .filter(|(k, _)| k != name)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        self.url = if kept.is_empty() {
            base.to_string()
        } else {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(kept)
                .finish();
            format!("{base}?{query}")
        };
        self
    }

    pub(crate) fn json_mut(&mut self) -> Option<&mut Value> {
        self.json.as_mut()
    }
}

fn append_query(url: &str, name: &str, value: &str) -> String {
    let pair = url::form_urlencoded::Serializer::new(String::new())
        .append_pair(name, value)
        .finish();
    if url.contains('?') {
        format!("{url}&{pair}")
    } else {
        format!("{}?{}", url.trim_end_matches('/'), pair)
    }
}

/// Decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Empty,
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
}

/// A response handed back by a session
#[derive(Debug, Clone)]
pub struct Response {
    pub status_code: u16,
    pub headers: HeaderMap,
    pub url: String,
    pub body: ResponseBody,
    pub reason: Option<String>,
    pub request: Request,
    /// File the body was streamed into, for media downloads
    pub download_file: Option<PathBuf>,
}

impl Response {
    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// JSON body, text body as a JSON string, or `Null`
    pub fn content(&self) -> Value {
        match &self.body {
            ResponseBody::Json(value) => value.clone(),
            ResponseBody::Text(text) => Value::String(text.clone()),
            ResponseBody::Bytes(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
            ResponseBody::Empty => Value::Null,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// The server's `error` payload, if any
    pub fn error_msg(&self) -> Option<String> {
        let error = self.json()?.get("error")?;
        serde_json::to_string_pretty(error).ok()
    }

    /// Turn a >= 400 status into an error; 401 becomes an auth error
    pub fn raise_for_status(self) -> Result<Self> {
        if self.status_code < 400 {
            return Ok(self);
        }
        let mut message = self.reason.clone().unwrap_or_default();
        if let Some(error) = self.error_msg() {
            message = format!("{message}\n\nContent:\n{error}");
        }
        let url = self.request.url().to_string();
        if self.status_code == 401 {
            Err(Error::Auth {
                status: self.status_code,
                message,
                url,
            })
        } else {
            Err(Error::Http {
                status: self.status_code,
                message,
                url,
            })
        }
    }

    /// Request for the following page, if the response carries a token.
    ///
    /// Defaults: `pageToken` in the request, `nextPageToken` in the response.
    pub fn next_page(
        &self,
        req_token_name: Option<&str>,
        res_token_name: Option<&str>,
        json_req: bool,
    ) -> Option<Request> {
        let req_token_name = req_token_name.unwrap_or("pageToken");
        let res_token_name = res_token_name.unwrap_or("nextPageToken");
        let token = self
            .json()?
            .get(res_token_name)?
            .as_str()
            .filter(|t| !t.is_empty())?;

        let mut request = self.request.clone();
        if json_req {
            if let Some(Value::Object(body)) = request.json_mut() {
                body.insert(req_token_name.to_string(), Value::String(token.to_string()));
            }
            Some(request)
        } else {
            Some(
                request
                    .without_query_param(req_token_name)
                    .with_query_param(req_token_name, token),
            )
        }
    }
}
