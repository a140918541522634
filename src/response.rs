use std::{fmt::Write as _, path::Path, sync::Arc};

use bytes::Bytes;
use reqwest::{header::HeaderMap, StatusCode, Version};
use serde::de::DeserializeOwned;
use tokio::{fs::File, io::AsyncWriteExt};
use url::Url;

use crate::{request::indent, RequestsError, Result};

/// Wraps a transport response and drains its body at most once.
///
/// `text`, `bytes`, `json`, `download` and `dump` all share the same drain:
/// the first call reads and closes the stream, later calls are served from
/// the cached bytes (or the cached error). A response that is absent,
/// because every attempt failed, behaves as an empty body.
#[derive(Debug, Default)]
pub struct Response {
    head: Option<Head>,
    stream: Option<reqwest::Response>,
    body: Option<std::result::Result<Bytes, Arc<reqwest::Error>>>,
}

#[derive(Clone, Debug)]
struct Head {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    url: Url,
}

impl Response {
    /// A response with nothing behind it.
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn is_absent(&self) -> bool {
        self.head.is_none()
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.head.as_ref().map(|head| head.status)
    }

    pub fn version(&self) -> Option<Version> {
        self.head.as_ref().map(|head| head.version)
    }

    pub fn headers(&self) -> Option<&HeaderMap> {
        self.head.as_ref().map(|head| &head.headers)
    }

    pub fn url(&self) -> Option<&Url> {
        self.head.as_ref().map(|head| &head.url)
    }

    /// Returns the raw `reqwest` response if its body has not been drained.
    pub fn into_inner(self) -> Option<reqwest::Response> {
        self.stream
    }

    async fn drain(&mut self) -> Result<&Bytes> {
        let body = match self.body.take() {
            Some(cached) => cached,
            None => match self.stream.take() {
                Some(stream) => stream.bytes().await.map_err(Arc::new),
                None => Ok(Bytes::new()),
            },
        };
        match self.body.insert(body) {
            Ok(bytes) => Ok(bytes),
            Err(err) => Err(RequestsError::ReadBody(Arc::clone(err))),
        }
    }

    /// Drains the body and returns it as raw bytes.
    pub async fn bytes(&mut self) -> Result<Bytes> {
        self.drain().await.cloned()
    }

    /// Drains the body and returns it as text, replacing invalid UTF-8.
    pub async fn text(&mut self) -> Result<String> {
        let body = self.drain().await?;
        Ok(String::from_utf8_lossy(body).into_owned())
    }

    /// Drains the body and decodes it as JSON.
    pub async fn json<T: DeserializeOwned>(&mut self) -> Result<T> {
        let body = self.drain().await?;
        serde_json::from_slice(body).map_err(RequestsError::Deserialize)
    }

    /// Drains the body into a newly created (or truncated) file at `path`.
    ///
    /// Returns the number of bytes written.
    pub async fn download(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let body = self.drain().await?.clone();
        let mut file = File::create(path.as_ref()).await?;
        file.write_all(&body).await?;
        file.flush().await?;
        Ok(body.len())
    }

    /// Renders the response in its HTTP/1.x wire form: status line,
    /// headers, blank line, body.
    pub async fn dump(&mut self) -> Result<Vec<u8>> {
        let Some(head) = self.head.clone() else {
            return Ok(Vec::new());
        };
        let body = self.drain().await?;

        let mut text = format!(
            "{:?} {} {}\r\n",
            head.version,
            head.status.as_u16(),
            head.status.canonical_reason().unwrap_or("Unknown")
        );
        for (name, value) in &head.headers {
            let _ = write!(
                text,
                "{}: {}\r\n",
                name,
                String::from_utf8_lossy(value.as_bytes())
            );
        }
        text.push_str("\r\n");

        let mut dump = text.into_bytes();
        dump.extend_from_slice(body);
        Ok(dump)
    }

    /// [`Response::dump`] with every line prefixed by `"< "`.
    ///
    /// Dump errors are rendered in place of the dump.
    pub async fn dump_indent(&mut self) -> String {
        match self.dump().await {
            Ok(dump) => indent(&dump, "< "),
            Err(err) => indent(err.to_string().as_bytes(), "< "),
        }
    }
}

impl From<reqwest::Response> for Response {
    fn from(response: reqwest::Response) -> Self {
        let head = Head {
            status: response.status(),
            version: response.version(),
            headers: response.headers().clone(),
            url: response.url().clone(),
        };
        Self {
            head: Some(head),
            stream: Some(response),
            body: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    use bytes::Bytes;
    use futures_util::stream;
    use serde::Deserialize;

    use super::Response;
    use crate::RequestsError;

    fn response_with_body(status: u16, body: &'static str) -> Response {
        let raw = http::Response::builder()
            .status(status)
            .header("content-type", "text/plain")
            .body(body)
            .expect("valid response");
        Response::from(reqwest::Response::from(raw))
    }

    /// Body stream that counts how many times it is polled for data.
    fn counted_response(
        reads: Arc<AtomicUsize>,
        chunk: io::Result<&'static str>,
    ) -> Response {
        let once = stream::once(async move {
            reads.fetch_add(1, Ordering::SeqCst);
            chunk.map(|text| Bytes::from_static(text.as_bytes()))
        });
        let raw = http::Response::builder()
            .status(200)
            .body(reqwest::Body::wrap_stream(once))
            .expect("valid response");
        Response::from(reqwest::Response::from(raw))
    }

    #[tokio::test]
    async fn text_drains_the_stream_once() {
        let reads = Arc::new(AtomicUsize::new(0));
        let mut response = counted_response(Arc::clone(&reads), Ok("hello"));

        assert_eq!(response.text().await.expect("first read"), "hello");
        assert_eq!(response.text().await.expect("second read"), "hello");
        assert_eq!(response.bytes().await.expect("bytes"), "hello");
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn drain_errors_are_cached() {
        let reads = Arc::new(AtomicUsize::new(0));
        let mut response = counted_response(
            Arc::clone(&reads),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        );

        let first = response.text().await.expect_err("first read must fail");
        let second = response.text().await.expect_err("second read must fail");
        assert!(matches!(first, RequestsError::ReadBody(_)));
        assert!(matches!(second, RequestsError::ReadBody(_)));
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn absent_response_reads_as_empty() {
        let mut response = Response::absent();
        assert!(response.is_absent());
        assert_eq!(response.status(), None);
        assert_eq!(response.text().await.expect("empty text"), "");
        assert!(response.dump().await.expect("empty dump").is_empty());
    }

    #[tokio::test]
    async fn json_decodes_and_reports_malformed_content() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Echo {
            a: String,
        }

        let mut ok = response_with_body(200, r#"{"a":"b"}"#);
        let echo: Echo = ok.json().await.expect("valid json");
        assert_eq!(echo.a, "b");

        let mut bad = response_with_body(200, "not json");
        let err = bad.json::<Echo>().await.expect_err("must fail");
        assert!(matches!(err, RequestsError::Deserialize(_)));
    }

    #[tokio::test]
    async fn error_statuses_are_plain_responses() {
        let mut response = response_with_body(503, "busy");
        assert_eq!(response.status(), Some(reqwest::StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(response.text().await.expect("text"), "busy");
    }

    #[tokio::test]
    async fn download_writes_the_whole_body() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "previous much longer content").expect("seed file");

        let mut response = response_with_body(200, "payload");
        let written = response.download(&path).await.expect("download");

        assert_eq!(written, 7);
        assert_eq!(std::fs::read_to_string(&path).expect("read back"), "payload");
    }

    #[tokio::test]
    async fn download_into_missing_directory_fails_with_io() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("missing").join("out.txt");

        let mut response = response_with_body(200, "payload");
        let err = response.download(&path).await.expect_err("must fail");
        assert!(matches!(err, RequestsError::Io(_)));
    }

    #[tokio::test]
    async fn dump_indent_prefixes_every_line() {
        let mut response = response_with_body(404, "gone");
        let dump = response.dump_indent().await;

        assert!(dump.starts_with("< HTTP/1.1 404 Not Found\r\n"));
        assert!(dump.contains("< content-type: text/plain\r\n"));
        assert!(dump.ends_with("< gone\n"));
        assert_eq!(response.text().await.expect("cached"), "gone");
    }
}
