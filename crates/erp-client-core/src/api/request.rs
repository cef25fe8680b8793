use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

use super::ApiError;

/// What the caller wants sent, before credentials and defaults are applied.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Path relative to the configured base URL, with a leading slash
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    /// Run the refresh protocol when the server answers 401
    pub refresh_on_unauthorized: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            refresh_on_unauthorized: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to serialize body: {}", e)))?;
        self.body = Some(bytes);
        Ok(self)
    }

    /// Treat a 401 as a final answer instead of an expired token
    pub fn without_refresh(mut self) -> Self {
        self.refresh_on_unauthorized = false;
        self
    }
}

/// A fully built request handed to a transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// URL path without the query string
    pub fn path(&self) -> &str {
        let without_scheme = self.url.split_once("://").map(|(_, rest)| rest).unwrap_or(&self.url);
        let path = without_scheme.find('/').map(|i| &without_scheme[i..]).unwrap_or("/");
        path.split('?').next().unwrap_or(path)
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ApiError::InvalidResponse(format!(
                "{} (body: {})",
                e,
                ApiError::truncate_body(&self.text())
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::AUTHORIZATION;

    #[test]
    fn test_descriptor_defaults() {
        let descriptor = RequestDescriptor::get("/api/v1/users/profile");
        assert_eq!(descriptor.method, Method::GET);
        assert!(descriptor.refresh_on_unauthorized);
        assert!(descriptor.body.is_none());
        assert!(!descriptor.without_refresh().refresh_on_unauthorized);
    }

    #[test]
    fn test_descriptor_json_body_and_header() {
        let descriptor = RequestDescriptor::post("/api/v1/auth/login")
            .header(AUTHORIZATION, HeaderValue::from_static("Basic abc"))
            .json(&serde_json::json!({"email": "a@x.com"}))
            .unwrap();
        assert_eq!(descriptor.body.as_deref(), Some(br#"{"email":"a@x.com"}"#.as_slice()));
        assert_eq!(descriptor.headers.get(AUTHORIZATION).unwrap(), "Basic abc");
    }

    #[test]
    fn test_request_path() {
        let request = HttpRequest {
            method: Method::GET,
            url: "http://localhost:8080/api/v1/users?limit=10&offset=0".to_string(),
            headers: HeaderMap::new(),
            body: None,
        };
        assert_eq!(request.path(), "/api/v1/users");
    }

    #[test]
    fn test_response_json_error_is_invalid_response() {
        let response = HttpResponse::new(StatusCode::OK, b"not json".to_vec());
        let result: Result<serde_json::Value, _> = response.json();
        assert!(matches!(result, Err(ApiError::InvalidResponse(_))));
    }
}
