use std::fmt::Write as _;

use reqwest::{
    cookie::CookieStore,
    header::{HeaderName, HeaderValue, COOKIE},
    Method, Request,
};
use url::Url;

use crate::{RequestOptions, RequestsError, Result};

/// Builds a transport request from `options`.
///
/// Form fields become the body only while the raw body is empty. Query
/// parameters are appended to whatever query the URL already has, headers
/// are set (replacing same-named entries) and every cookie is appended as
/// its own `Cookie` header.
///
/// The client only loads jar cookies into requests without a `Cookie`
/// header, so once `options` carries cookies the entries stored in `jar`
/// for the target URL are appended here as well.
pub(crate) fn build_request(
    options: &RequestOptions,
    jar: Option<&dyn CookieStore>,
) -> Result<Request> {
    let body = if !options.form.is_empty() && options.body.is_empty() {
        serde_urlencoded::to_string(&options.form)
            .map_err(RequestsError::FormEncode)?
            .into_bytes()
            .into()
    } else {
        options.body.clone()
    };

    let method = parse_method(&options.method)?;
    let mut url =
        Url::parse(&options.url).map_err(|err| RequestsError::url_parse(&options.url, err))?;

    if !options.params.is_empty() {
        let mut query = url.query_pairs_mut();
        for (key, value) in &options.params {
            query.append_pair(key, &value.to_string());
        }
    }

    let stored = match jar {
        Some(jar) if !options.cookies.is_empty() => jar.cookies(&url),
        _ => None,
    };

    let mut request = Request::new(method, url);
    let headers = request.headers_mut();
    for (key, value) in &options.headers {
        headers.insert(
            HeaderName::from_bytes(key.as_bytes())?,
            HeaderValue::from_str(value)?,
        );
    }
    for (name, value) in &options.cookies {
        headers.append(COOKIE, HeaderValue::from_str(&format!("{name}={value}"))?);
    }
    if let Some(stored) = stored {
        headers.append(COOKIE, stored);
    }

    if !body.is_empty() {
        *request.body_mut() = Some(body.into());
    }
    Ok(request)
}

fn parse_method(method: &str) -> Result<Method> {
    if method.is_empty() {
        return Ok(Method::GET);
    }
    Ok(Method::from_bytes(method.as_bytes())?)
}

/// Renders `request` in its HTTP/1.x wire form.
///
/// Streaming bodies cannot be replayed and are left out.
pub fn dump_request(request: &Request) -> Vec<u8> {
    let url = request.url();
    let mut target = url.path().to_owned();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut head = format!("{} {} HTTP/1.1\r\n", request.method(), target);
    if let Some(host) = url.host_str() {
        match url.port() {
            Some(port) => {
                let _ = write!(head, "Host: {host}:{port}\r\n");
            }
            None => {
                let _ = write!(head, "Host: {host}\r\n");
            }
        }
    }
    for (name, value) in request.headers() {
        let _ = write!(head, "{}: {}\r\n", name, String::from_utf8_lossy(value.as_bytes()));
    }
    head.push_str("\r\n");

    let mut dump = head.into_bytes();
    if let Some(body) = request.body().and_then(|body| body.as_bytes()) {
        dump.extend_from_slice(body);
    }
    dump
}

/// [`dump_request`] with every line prefixed by `"> "`.
pub fn dump_request_indent(request: &Request) -> String {
    indent(&dump_request(request), "> ")
}

pub(crate) fn indent(dump: &[u8], prefix: &str) -> String {
    let text = String::from_utf8_lossy(dump);
    let mut out = String::with_capacity(text.len() + prefix.len() * 8);
    for line in text.split('\n') {
        out.push_str(prefix);
        out.push_str(line);
        out.push('\n');
    }
    out
}
