//! Minimal request and response values for the synchronized surface.
//!
//! Requests travel one per line as `METHOD /path[?query] [body]`, and
//! responses as `STATUS content-type body`. Bodies are single-line JSON or
//! HTML fragments, so a line never needs escaping.

use std::fmt;

use serde::Serialize;

use super::request::RequestError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other(String),
}

impl Method {
    pub fn from_name(s: &str) -> Method {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Other(name) => name,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    pub fn get(target: &str) -> Self {
        let (path, query) = split_target(target);
        HttpRequest {
            method: Method::Get,
            path,
            query,
            body: String::new(),
        }
    }

    pub fn post(path: &str, body: impl Into<String>) -> Self {
        HttpRequest {
            method: Method::Post,
            path: path.to_string(),
            query: Vec::new(),
            body: body.into(),
        }
    }

    /// Builds a POST whose body is `payload` encoded as JSON.
    pub fn post_json<T: Serialize>(path: &str, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::post(path, serde_json::to_string(payload)?))
    }

    /// First value of query parameter `name`.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Parses `METHOD /path[?query] [body]`.
    pub fn parse_line(line: &str) -> Result<Self, RequestError> {
        let trimmed = line.trim();
        let (method, rest) = trimmed
            .split_once(char::is_whitespace)
            .ok_or_else(|| RequestError::MalformedLine(trimmed.to_string()))?;
        let rest = rest.trim_start();
        let (target, body) = match rest.split_once(char::is_whitespace) {
            Some((target, body)) => (target, body.trim()),
            None => (rest, ""),
        };
        if !target.starts_with('/') {
            return Err(RequestError::MalformedLine(trimmed.to_string()));
        }
        let (path, query) = split_target(target);
        Ok(HttpRequest {
            method: Method::from_name(method),
            path,
            query,
            body: body.to_string(),
        })
    }
}

fn split_target(target: &str) -> (String, Vec<(String, String)>) {
    match target.split_once('?') {
        Some((path, query)) => (path.to_string(), parse_query(query)),
        None => (target.to_string(), Vec::new()),
    }
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (decode_component(k), decode_component(v)),
            None => (decode_component(pair), String::new()),
        })
        .collect()
}

/// Form-style decoding: `+` is a space and `%XX` a byte. Invalid escapes
/// pass through literally.
fn decode_component(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                match hex {
                    Some(b) => {
                        out.push(b);
                        i += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Html,
    Json,
    Text,
}

impl ContentType {
    pub const fn as_str(self) -> &'static str {
        match self {
            ContentType::Html => "text/html",
            ContentType::Json => "application/json",
            ContentType::Text => "text/plain",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: ContentType,
    pub body: String,
}

impl HttpResponse {
    pub fn html(body: String) -> Self {
        HttpResponse {
            status: 200,
            content_type: ContentType::Html,
            body,
        }
    }

    pub fn json(value: &serde_json::Value) -> Self {
        HttpResponse {
            status: 200,
            content_type: ContentType::Json,
            body: value.to_string(),
        }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        HttpResponse {
            status,
            content_type: ContentType::Text,
            body: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Single-line wire form: `STATUS content-type body`.
    pub fn to_line(&self) -> String {
        let body = self.body.replace(['\r', '\n'], " ");
        format!("{} {} {}", self.status, self.content_type.as_str(), body)
    }
}
