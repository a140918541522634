use std::{collections::HashMap, io::Read};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::Serialize;

use crate::{Body, RequestsError, Result, Value};

pub(crate) const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Mutable set of options describing one request.
///
/// Options are merged with the session defaults right before execution
/// (see [`RequestOptions::merge`]); values set here always win.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestOptions {
    /// HTTP verb token. Empty means `GET`.
    pub method: String,
    /// Absolute target URL.
    pub url: String,
    /// Query parameters appended to the URL.
    pub params: HashMap<String, Value>,
    /// Headers keyed by lowercase name; set authoritatively when the request
    /// is built.
    pub headers: HashMap<String, String>,
    /// Cookies, each sent as its own `Cookie` header entry.
    pub cookies: HashMap<String, String>,
    /// URL-encoded form fields, used only while `body` is empty.
    pub form: Vec<(String, String)>,
    /// Raw body bytes.
    pub body: Bytes,
    /// Additional attempts after the first one.
    pub retry: usize,
}

impl RequestOptions {
    /// Creates options for `method` and `url` with everything else empty.
    pub fn new(method: impl AsRef<str>, url: impl Into<String>) -> Self {
        Self {
            method: method.as_ref().to_owned(),
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new("POST", url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new("PUT", url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new("DELETE", url)
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self::new("HEAD", url)
    }

    pub fn set_method(&mut self, method: impl AsRef<str>) -> &mut Self {
        self.method = method.as_ref().to_owned();
        self
    }

    pub fn set_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.url = url.into();
        self
    }

    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn set_params<I, K, V>(&mut self, params: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in params {
            self.set_param(key, value);
        }
        self
    }

    /// Sets a header. Names are stored lowercased, as they go on the wire.
    pub fn set_header(&mut self, key: impl AsRef<str>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(key.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn set_headers<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in headers {
            self.set_header(key, value);
        }
        self
    }

    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn set_cookies<I, K, V>(&mut self, cookies: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in cookies {
            self.set_cookie(name, value);
        }
        self
    }

    /// Appends a form field and marks the request as form-encoded.
    ///
    /// A raw body set earlier is kept and takes precedence at build time.
    pub fn set_form(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.set_header("content-type", FORM_CONTENT_TYPE);
        self.form.push((key.into(), value.into()));
        self
    }

    /// Sets `Authorization: Basic <base64(user:pass)>`.
    pub fn set_auth(&mut self, user: &str, pass: &str) -> &mut Self {
        let credentials = STANDARD.encode(format!("{user}:{pass}"));
        self.set_header("authorization", format!("Basic {credentials}"))
    }

    pub fn set_retry(&mut self, retry: usize) -> &mut Self {
        self.retry = retry;
        self
    }

    /// Sets the raw body from any [`Body`] source.
    ///
    /// `Body::Empty` is a no-op. Streams are drained here, not at send time.
    pub fn set_body<'a>(&mut self, body: impl Into<Body<'a>>) -> Result<&mut Self> {
        match body.into() {
            Body::Empty => {}
            Body::Raw(bytes) => self.body = Bytes::from(bytes),
            Body::Text(text) => self.body = Bytes::from(text),
            Body::Stream(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                self.body = Bytes::from(buf);
            }
            Body::Structured(value) => {
                let encoded = value.to_json().map_err(RequestsError::Serialize)?;
                self.body = Bytes::from(encoded);
            }
        }
        Ok(self)
    }

    /// Shorthand for `set_body(Body::json(value))`.
    pub fn set_json<T: Serialize + Sync>(&mut self, value: &T) -> Result<&mut Self> {
        self.set_body(Body::json(value))
    }

    /// Fills gaps in `self` from `other`.
    ///
    /// Params, headers and cookies missing from `self` are copied over;
    /// existing entries are kept. `retry` is taken from `other` only while
    /// `self.retry` is zero. `other` is never modified.
    pub fn merge(&mut self, other: &RequestOptions) -> &mut Self {
        fill_missing(&mut self.params, &other.params);
        fill_missing(&mut self.headers, &other.headers);
        fill_missing(&mut self.cookies, &other.cookies);
        if self.retry == 0 {
            self.retry = other.retry;
        }
        self
    }
}

fn fill_missing<V: Clone>(target: &mut HashMap<String, V>, source: &HashMap<String, V>) {
    for (key, value) in source {
        if !target.contains_key(key) {
            target.insert(key.clone(), value.clone());
        }
    }
}
