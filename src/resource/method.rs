//! Method - builds requests for a single discovery method
//!
//! [`Method::build`] turns call arguments into an unsent [`Request`]:
//!
//! 1. drop `null` arguments and map underscore names back to dashed ones
//! 2. pop path parameters in `parameterOrder` and expand the path template
//! 3. split declared query parameters off the remaining arguments
//! 4. handle leftovers (`additionalProperties`, warning, or error)
//! 5. validate the body and attach media upload/download descriptors
//!
//! Nothing here touches the network, and the method spec is never mutated.

use super::parameters::Parameters;
use crate::discovery::{DiscoveryDocument, MethodSpec};
use crate::error::{Error, Result, ValidationError, Warning};
use crate::models::{
    parse_media_size, CallArgs, MediaDownload, MediaUpload, Request, ResumableUpload, UploadSource,
    DEFAULT_DOWNLOAD_CHUNK_SIZE, DEFAULT_UPLOAD_CHUNK_SIZE,
};
use crate::schema::{resolve, validate, validate_collecting, JsonSchema};
use indexmap::IndexMap;
use serde_json::Value;
use std::path::PathBuf;

/// A callable method, borrowed from its discovery document
#[derive(Debug, Clone, Copy)]
pub struct Method<'a> {
    name: &'a str,
    doc: &'a DiscoveryDocument,
    spec: &'a MethodSpec,
    validate: bool,
}

impl<'a> Method<'a> {
    pub fn new(name: &'a str, doc: &'a DiscoveryDocument, spec: &'a MethodSpec, validate: bool) -> Self {
        Self {
            name,
            doc,
            spec,
            validate,
        }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    /// e.g. `calendar.acl.get`
    pub fn id(&self) -> &'a str {
        self.spec.id.as_deref().unwrap_or(self.name)
    }

    pub fn http_method(&self) -> &'a str {
        &self.spec.http_method
    }

    pub fn path(&self) -> &'a str {
        &self.spec.path
    }

    pub fn spec(&self) -> &'a MethodSpec {
        self.spec
    }

    pub fn scopes(&self) -> &'a [String] {
        &self.spec.scopes
    }

    pub fn description(&self) -> Option<&'a str> {
        self.spec.description.as_deref()
    }

    /// Default validation flag inherited from the API
    pub fn validates(&self) -> bool {
        self.validate
    }

    pub fn base_url(&self) -> String {
        self.doc.method_base_url()
    }

    pub fn parameters(&self) -> Parameters<'a> {
        Parameters::merge(&self.spec.parameters, &self.doc.parameters)
    }

    pub fn required_parameters(&self) -> Vec<String> {
        self.parameters().required()
    }

    pub fn optional_parameters(&self) -> Vec<String> {
        self.parameters().optional()
    }

    pub fn path_parameters(&self) -> Vec<String> {
        self.parameters().path()
    }

    pub fn query_parameters(&self) -> Vec<String> {
        self.parameters().query()
    }

    pub fn required_query_parameters(&self) -> Vec<String> {
        self.parameters().required_query()
    }

    pub fn optional_query_parameters(&self) -> Vec<String> {
        self.parameters().optional_query()
    }

    /// Body schema with `$ref` followed
    pub fn request_schema(&self) -> Option<&'a JsonSchema> {
        let schema = self.spec.request.as_ref()?;
        Some(resolve(schema, &self.doc.schemas).unwrap_or(schema))
    }

    /// Response schema with `$ref` followed
    pub fn response_schema(&self) -> Option<&'a JsonSchema> {
        let schema = self.spec.response.as_ref()?;
        Some(resolve(schema, &self.doc.schemas).unwrap_or(schema))
    }

    /// Raw access to a key of the method spec
    pub fn get(&self, key: &str) -> Option<Value> {
        serde_json::to_value(self.spec).ok()?.get(key).cloned()
    }

    /// Whether `param` is a declared parameter (underscore or dashed form)
    pub fn contains(&self, param: &str) -> bool {
        self.parameters().contains(param)
    }

    /// Number of required parameters
    pub fn len(&self) -> usize {
        self.required_parameters().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate an instance against a schema, resolving `$ref` through this API's schemas
    pub fn validate_instance(&self, instance: &Value, schema: &JsonSchema) -> Result<(), ValidationError> {
        validate(instance, schema, &self.doc.schemas)
    }

    /// Build an unsent request
    pub fn build(&self, args: CallArgs) -> Result<Request> {
        let mut warnings = Vec::new();
        self.build_collecting(args, &mut warnings)
    }

    /// Same as [`Method::build`], also handing back non-fatal warnings
    pub fn build_collecting(&self, args: CallArgs, warnings: &mut Vec<Warning>) -> Result<Request> {
        let CallArgs {
            params,
            validate,
            json,
            data,
            upload_file,
            download_file,
            timeout,
        } = args;

        if json.is_some() && data.is_some() {
            return Err(Error::usage(
                "Pass either json or data for the body of the request, not both.",
            ));
        }
        let validate = validate.unwrap_or(self.validate);
        let parameters = self.parameters();
        let schemas = &self.doc.schemas;

        let mut remaining: IndexMap<String, Value> = IndexMap::new();
        for (key, value) in params {
            if value.is_null() {
                continue;
            }
            let wire = parameters.wire_name(&key).map(str::to_string).unwrap_or(key);
            remaining.insert(wire, value);
        }

        let base_url = self.doc.method_base_url();
        let url = format!("{}{}", base_url, self.expand_path(&parameters, &mut remaining, validate)?);

        let query_names: Vec<String> = remaining
            .keys()
            .filter(|key| parameters.get(key).map(|s| s.is_query()).unwrap_or(false))
            .cloned()
            .collect();
        let mut query: Vec<(String, Value)> = Vec::new();
        for name in query_names {
            if let Some(value) = remaining.shift_remove(&name) {
                query.push((name, value));
            }
        }
        for (name, schema) in parameters.iter() {
            if schema.is_query() && schema.is_required() && !query.iter().any(|(n, _)| n == name) {
                return Err(Error::validation(format!("Missing query parameter: \"{name}\"")));
            }
        }
        if validate {
            for (name, value) in &query {
                let Some(schema) = parameters.get(name) else {
                    continue;
                };
                match value {
                    Value::Array(items) if schema.repeated == Some(true) => {
                        for item in items {
                            validate_collecting(item, schema, schemas, warnings)?;
                        }
                    },
                    _ => validate_collecting(value, schema, schemas, warnings)?,
                }
            }
        }

        if !remaining.is_empty() {
            let names: Vec<String> = remaining.keys().cloned().collect();
            match parameters.get("additionalProperties") {
                Some(schema) if validate => {
                    for value in remaining.values() {
                        validate_collecting(value, schema, schemas, warnings)?;
                    }
                },
                None if validate => {
                    return Err(Error::validation(format!(
                        "Invalid (extra) parameters: {names:?} were passed"
                    )));
                },
                Some(_) => {},
                None => {
                    let warning = Warning::UnusedParameters(names);
                    tracing::warn!("{}", warning);
                    warnings.push(warning);
                },
            }
            query.extend(remaining);
        }

        let uri = append_query(&url, &query);

        if validate {
            if let Some(body) = json.as_ref().or(data.as_ref()) {
                self.validate_body(body, warnings)?;
            }
        }

        let media_download = match download_file {
            Some(path) => Some(self.media_download(path, &uri, validate)?),
            None => None,
        };
        let media_upload = match upload_file {
            Some(source) => Some(self.media_upload(source, &uri, &url, validate)?),
            None => None,
        };

        tracing::debug!("Built {} {}", self.spec.http_method, uri);

        let mut request = Request::new(self.spec.http_method.clone(), uri)
            .with_timeout(timeout)
            .with_media_upload(media_upload)
            .with_media_download(media_download);
        if let Some(json) = json {
            request = request.with_json(json)?;
        }
        if let Some(data) = data {
            request = request.with_data(data)?;
        }
        Ok(request)
    }

    /// Path parameters in substitution order: `parameterOrder` first, then
    /// any other path parameter in declaration order
    fn ordered_path_parameters(&self, parameters: &Parameters<'a>) -> Vec<&'a str> {
        let mut ordered: Vec<&'a str> = self
            .spec
            .parameter_order
            .iter()
            .filter_map(|name| parameters.wire_name(name))
            .filter(|name| parameters.get(name).map(|s| s.is_path()).unwrap_or(false))
            .collect();
        for (name, schema) in parameters.iter() {
            if schema.is_path() && !ordered.contains(&name) {
                ordered.push(name);
            }
        }
        ordered
    }

    fn expand_path(
        &self,
        parameters: &Parameters<'a>,
        remaining: &mut IndexMap<String, Value>,
        check: bool,
    ) -> Result<String> {
        let mut values = Vec::new();
        for name in self.ordered_path_parameters(parameters) {
            let value = remaining
                .shift_remove(name)
                .ok_or_else(|| Error::validation(format!("Missing URL path parameter: {name}")))?;
            if check {
                if let Some(schema) = parameters.get(name) {
                    validate(&value, schema, &self.doc.schemas)?;
                }
            }
            values.push(value_to_string(&value));
        }
        expand_template(&self.spec.path, &values)
    }

    fn validate_body(&self, body: &Value, warnings: &mut Vec<Warning>) -> Result<()> {
        let Some(schema) = self.spec.request.as_ref() else {
            return Err(Error::validation(
                "Request body should've been validated, but wasn't because the method doesn't accept a JSON body",
            ));
        };
        validate_collecting(body, schema, &self.doc.schemas, warnings)?;
        Ok(())
    }

    fn media_download(&self, file_path: PathBuf, qualified_url: &str, validate: bool) -> Result<MediaDownload> {
        if validate && !self.spec.supports_media_download {
            return Err(Error::validation(
                "download_file was provided while method doesn't support media download",
            ));
        }
        let download_url = if self.spec.use_media_download_service && self.spec.supports_media_download {
            let download_base = format!(
                "{}download/{}",
                self.doc.root_url.as_deref().unwrap_or_default(),
                self.doc.service_path.as_deref().unwrap_or_default()
            );
            qualified_url.replacen(&self.doc.method_base_url(), &download_base, 1)
        } else {
            qualified_url.to_string()
        };
        Ok(MediaDownload {
            file_path,
            download_url,
            chunk_size: DEFAULT_DOWNLOAD_CHUNK_SIZE,
        })
    }

    fn media_upload(
        &self,
        source: UploadSource,
        qualified_url: &str,
        fallback_url: &str,
        validate: bool,
    ) -> Result<MediaUpload> {
        if !self.spec.supports_media_upload {
            if validate {
                return Err(Error::validation(
                    "upload_file was provided while method doesn't support media upload",
                ));
            }
            let mut upload = MediaUpload::new(source, fallback_url);
            upload.validate = false;
            return Ok(upload);
        }

        let root_url = self.doc.root_url.as_deref().unwrap_or_default();
        let service_path = self.doc.service_path.as_deref().unwrap_or_default();
        let base_url = self.doc.method_base_url();
        let spec = self.spec.media_upload.clone().unwrap_or_default();

        let resumable = spec.protocols.resumable.as_ref().map(|protocol| ResumableUpload {
            upload_path: qualified_url.replacen(
                &base_url,
                &format!("{root_url}resumable/upload/{service_path}"),
                1,
            ),
            multipart: protocol.multipart.unwrap_or(true),
            chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
        });

        let upload_path = qualified_url.replacen(&base_url, &format!("{root_url}upload/{service_path}"), 1);
        let mut upload = MediaUpload::new(source, upload_path);
        upload.mime_range = spec.accept;
        upload.max_size = spec.max_size.as_deref().and_then(parse_media_size);
        upload.multipart = spec
            .protocols
            .simple
            .as_ref()
            .and_then(|p| p.multipart)
            .unwrap_or(true);
        upload.resumable = resumable;
        upload.validate = validate;
        Ok(upload)
    }
}

impl std::fmt::Display for Method<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} method @ {}", self.id(), self.doc.method_base_url())
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn encode_path_value(value: &str, reserved: bool) -> String {
    if reserved {
        urlencoding::encode(value).replace("%2F", "/")
    } else {
        url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
    }
}

/// Fill `{name}` / `{+name}` placeholders positionally.
///
/// Placeholder names may differ from parameter names, so they are ignored.
fn expand_template(template: &str, values: &[String]) -> Result<String> {
    let mut expanded = String::with_capacity(template.len());
    let mut values = values.iter();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let placeholder = &rest[start + 1..start + len];
        let value = values.next().ok_or_else(|| {
            Error::Document(format!(
                "Path template {template:?} has more placeholders than path parameters"
            ))
        })?;
        expanded.push_str(&rest[..start]);
        expanded.push_str(&encode_path_value(value, placeholder.starts_with('+')));
        rest = &rest[start + len + 1..];
    }
    expanded.push_str(rest);
    Ok(expanded)
}

fn append_query(url: &str, query: &[(String, Value)]) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in query {
        match value {
            Value::Array(items) => {
                for item in items {
                    serializer.append_pair(name, &value_to_string(item));
                }
            },
            other => {
                serializer.append_pair(name, &value_to_string(other));
            },
        }
    }
    format!("{url}?{}", serializer.finish())
}
