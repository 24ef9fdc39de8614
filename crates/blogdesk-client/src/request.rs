use reqwest::Method;
use serde_json::Value;

/// One call through the dispatcher: HTTP verb, relative URL, query and body.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub url: String,
    pub method: Method,
    pub params: Vec<(String, String)>,
    pub data: Option<Value>,
    /// Page the call is made from, sent as `X-URL-PATH`.
    pub page_path: Option<String>,
}

impl RequestOptions {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            params: Vec::new(),
            data: None,
            page_path: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_page_path(mut self, path: impl Into<String>) -> Self {
        self.page_path = Some(path.into());
        self
    }
}
