use crate::constants::content_types;
use crate::errors::ClientError;
use crate::services::binder::{BoundArguments, BoundBody};
use crate::services::descriptor::MethodDescriptor;
use crate::services::serializer::Serializer;
use crate::utils::encoding::{is_scalar, scalar_to_string};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    pub name: String,
    pub content: Bytes,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl MultipartPart {
    fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: Bytes::from(value.into()),
            file_name: None,
            content_type: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestBody {
    #[default]
    Empty,
    Bytes {
        content: Bytes,
        content_type: String,
    },
    Multipart(Vec<MultipartPart>),
}

impl RequestBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }

    pub fn content_type(&self) -> Option<&str> {
        match self {
            RequestBody::Bytes { content_type, .. } => Some(content_type),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            RequestBody::Bytes { content, .. } => Some(content),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl OutgoingRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), ClientError> {
        let (name, value) = header_pair(name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), ClientError> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ClientError::configuration(format!("Invalid header name '{}'", name)))?;
    let header_value = HeaderValue::from_str(value).map_err(|_| {
        ClientError::configuration(format!("Invalid value for header '{}'", name))
    })?;
    Ok((header_name, header_value))
}

pub fn join_base_url(base: &Url, route: &str) -> Result<Url, ClientError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(route.trim_start_matches('/')).map_err(|err| {
        ClientError::configuration(format!("Invalid route '{}': {}", route, err))
    })
}

pub fn build_request(
    base_url: &Url,
    descriptor: &MethodDescriptor,
    bound: &BoundArguments,
    serializer: &dyn Serializer,
    default_headers: &[(String, String)],
) -> Result<OutgoingRequest, ClientError> {
    let route = descriptor.route.render(&bound.path)?;
    let mut url = join_base_url(base_url, &route)?;
    if !bound.query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &bound.query {
            pairs.append_pair(key, value);
        }
    }

    let mut request = OutgoingRequest::new(descriptor.verb.clone(), url);
    for (name, value) in default_headers {
        request.set_header(name, value)?;
    }
    for (name, value) in &bound.headers {
        let (name, value) = header_pair(name, value)?;
        request.headers.append(name, value);
    }

    request.body = build_body(descriptor, bound, serializer)?;
    if let Some(content_type) = request.body.content_type().map(str::to_string) {
        if !request.headers.contains_key(CONTENT_TYPE) {
            request.set_header(CONTENT_TYPE.as_str(), &content_type)?;
        }
    }
    Ok(request)
}

fn build_body(
    descriptor: &MethodDescriptor,
    bound: &BoundArguments,
    serializer: &dyn Serializer,
) -> Result<RequestBody, ClientError> {
    if descriptor.multipart || !bound.files.is_empty() {
        return build_multipart(bound, serializer).map(RequestBody::Multipart);
    }
    if bound.body.is_some() && !bound.form.is_empty() {
        return Err(ClientError::configuration(format!(
            "{}: body and form fields cannot be combined without multipart",
            descriptor.id
        ))
        .with_hint("Mark the method as multipart or bind the fields to a single body."));
    }
    match &bound.body {
        Some(BoundBody::Json { value, .. }) => Ok(json_body(value, serializer)?),
        Some(BoundBody::Binary { part, .. }) => Ok(RequestBody::Bytes {
            content: part.bytes.clone(),
            content_type: part
                .content_type
                .clone()
                .unwrap_or_else(|| content_types::OCTET_STREAM.to_string()),
        }),
        None if !bound.form.is_empty() => {
            let encoded = serde_urlencoded::to_string(&bound.form)
                .map_err(|err| ClientError::serialization(err.to_string()))?;
            Ok(RequestBody::Bytes {
                content: Bytes::from(encoded),
                content_type: content_types::FORM.to_string(),
            })
        }
        None => Ok(RequestBody::Empty),
    }
}

fn json_body(value: &Value, serializer: &dyn Serializer) -> Result<RequestBody, ClientError> {
    match value {
        Value::String(text) => Ok(RequestBody::Bytes {
            content: Bytes::from(text.clone()),
            content_type: content_types::TEXT.to_string(),
        }),
        Value::Number(_) | Value::Bool(_) => Ok(RequestBody::Bytes {
            content: Bytes::from(scalar_to_string(value).unwrap_or_default()),
            content_type: content_types::TEXT.to_string(),
        }),
        structured => Ok(RequestBody::Bytes {
            content: serializer.serialize(structured)?,
            content_type: serializer.content_type().to_string(),
        }),
    }
}

fn build_multipart(
    bound: &BoundArguments,
    serializer: &dyn Serializer,
) -> Result<Vec<MultipartPart>, ClientError> {
    let mut parts: Vec<MultipartPart> = bound
        .form
        .iter()
        .map(|(name, value)| MultipartPart::text(name.clone(), value.clone()))
        .collect();

    for (name, file) in &bound.files {
        parts.push(MultipartPart {
            name: name.clone(),
            content: file.bytes.clone(),
            file_name: file.file_name.clone(),
            content_type: file.content_type.clone(),
        });
    }

    match &bound.body {
        Some(BoundBody::Json {
            value: Value::Object(fields),
            ..
        }) => {
            for (name, value) in fields.iter().filter(|(_, v)| !v.is_null()) {
                parts.push(value_part(name, value, serializer)?);
            }
        }
        Some(BoundBody::Json { name, value }) => parts.push(value_part(name, value, serializer)?),
        Some(BoundBody::Binary { name, part }) => parts.push(MultipartPart {
            name: name.clone(),
            content: part.bytes.clone(),
            file_name: part.file_name.clone(),
            content_type: part.content_type.clone(),
        }),
        None => {}
    }
    Ok(parts)
}

fn value_part(
    name: &str,
    value: &Value,
    serializer: &dyn Serializer,
) -> Result<MultipartPart, ClientError> {
    if is_scalar(value) {
        return Ok(MultipartPart::text(name, scalar_to_string(value).unwrap_or_default()));
    }
    Ok(MultipartPart {
        name: name.to_string(),
        content: serializer.serialize(value)?,
        file_name: None,
        content_type: Some(serializer.content_type().to_string()),
    })
}
