//! One-shot helpers that run on a fresh default [`Session`].
//!
//! Each call builds its own session, so nothing (cookies, defaults,
//! pooled connections) is shared between calls. Use a [`Session`] directly
//! to keep state.

use std::path::Path;

use serde::Serialize;

use crate::{Body, Response, Result, Session};

pub async fn get(url: &str) -> Result<Response> {
    Session::new()?.get(url).await
}

pub async fn head(url: &str) -> Result<Response> {
    Session::new()?.head(url).await
}

pub async fn post<'a>(
    url: &str,
    content_type: &str,
    body: impl Into<Body<'a>>,
) -> Result<Response> {
    Session::new()?.post(url, content_type, body).await
}

pub async fn post_form<F>(url: &str, form: &F) -> Result<Response>
where
    F: Serialize + Sync + ?Sized,
{
    Session::new()?.post_form(url, form).await
}

/// `PUT` without a content type.
pub async fn put<'a>(url: &str, body: impl Into<Body<'a>>) -> Result<Response> {
    Session::new()?.put(url, "", body).await
}

/// `DELETE` without a content type.
pub async fn delete<'a>(url: &str, body: impl Into<Body<'a>>) -> Result<Response> {
    Session::new()?.delete(url, "", body).await
}

/// Downloads `url` into `path` and returns the number of bytes written.
///
/// The body is saved whatever the status code.
pub async fn wget(url: &str, path: impl AsRef<Path>) -> Result<usize> {
    let mut response = get(url).await?;
    response.download(path).await
}
