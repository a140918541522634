use std::{fmt, sync::Arc};

use reqwest::cookie::{CookieStore, Jar};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{
    config::build_client,
    options::FORM_CONTENT_TYPE,
    request::{build_request, dump_request_indent},
    retry::execute_with_retry,
    Body, LogSink, ProxyConfig, RequestOptions, RequestsError, Response, Result, SessionConfig,
    StderrSink, Transport, Value,
};

/// Long-lived HTTP session.
///
/// Holds the transport configuration, a cookie jar and a set of default
/// [`RequestOptions`] merged into every request (per-call values win).
/// Configure it through the `&mut self` setters, then share it (`&Session`
/// or `Arc<Session>`) across tasks; requests only read the defaults.
pub struct Session {
    client: reqwest::Client,
    transport: Option<Arc<dyn Transport>>,
    jar: Arc<Jar>,
    config: SessionConfig,
    defaults: RequestOptions,
    log: Arc<dyn LogSink>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut defaults = self.defaults.clone();
        if defaults.headers.contains_key("authorization") {
            defaults
                .headers
                .insert("authorization".to_owned(), "<redacted>".to_owned());
        }
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("defaults", &defaults)
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

impl Session {
    /// Creates a session with [`SessionConfig::default`].
    pub fn new() -> Result<Self> {
        Self::with_config(SessionConfig::default())
    }

    /// Creates a session backed by a `reqwest` client built from `config`.
    pub fn with_config(config: SessionConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let client = build_client(&config, Arc::clone(&jar))?;
        let mut defaults = RequestOptions::default();
        defaults.set_retry(config.retry);
        Ok(Self {
            client,
            transport: None,
            jar,
            config,
            defaults,
            log: Arc::new(StderrSink),
        })
    }

    /// Creates a session configured from `REQUESTS_*` environment variables.
    ///
    /// See [`SessionConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::with_config(SessionConfig::from_env()?)
    }

    /// Creates a session whose round trips go through `transport` instead of
    /// the built-in `reqwest` client.
    pub fn with_transport(config: SessionConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let mut session = Self::with_config(config)?;
        session.transport = Some(transport);
        Ok(session)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn proxy(&self) -> Option<&ProxyConfig> {
        self.config.proxy.as_ref()
    }

    /// Options merged into every request.
    pub fn defaults(&self) -> &RequestOptions {
        &self.defaults
    }

    pub fn cookie_jar(&self) -> &Arc<Jar> {
        &self.jar
    }

    fn cookie_store(&self) -> &dyn CookieStore {
        self.jar.as_ref()
    }

    fn transport(&self) -> &dyn Transport {
        match &self.transport {
            Some(transport) => transport.as_ref(),
            None => &self.client,
        }
    }

    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.defaults.set_param(key, value);
        self
    }

    pub fn set_params<I, K, V>(&mut self, params: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.defaults.set_params(params);
        self
    }

    pub fn set_header(&mut self, key: impl AsRef<str>, value: impl Into<String>) -> &mut Self {
        self.defaults.set_header(key, value);
        self
    }

    pub fn set_headers<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        self.defaults.set_headers(headers);
        self
    }

    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.defaults.set_cookie(name, value);
        self
    }

    pub fn set_cookies<I, K, V>(&mut self, cookies: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.defaults.set_cookies(cookies);
        self
    }

    /// Sends basic auth on every request that does not set its own.
    pub fn set_auth(&mut self, user: &str, pass: &str) -> &mut Self {
        self.defaults.set_auth(user, pass);
        self
    }

    /// Default retry count, used by requests that leave theirs at zero.
    pub fn set_retry(&mut self, retry: usize) -> &mut Self {
        self.config.retry = retry;
        self.defaults.set_retry(retry);
        self
    }

    pub fn set_log_sink(&mut self, sink: impl LogSink + 'static) -> &mut Self {
        self.log = Arc::new(sink);
        self
    }

    /// Routes every later request through the proxy at `addr`.
    ///
    /// `socks4://` and `socks5://` addresses are dialed as SOCKS5, anything
    /// else is used as an HTTP(S) proxy.
    pub fn set_proxy(&mut self, addr: &str) -> Result<&mut Self> {
        let proxy = ProxyConfig::parse(addr)?;
        self.reconfigure(|config| config.proxy = Some(proxy))
    }

    /// Overall per-request timeout in seconds; `0` keeps the transport default.
    pub fn set_timeout(&mut self, seconds: u64) -> Result<&mut Self> {
        self.reconfigure(|config| config.timeout_secs = seconds)
    }

    /// Enables or disables connection reuse.
    pub fn set_keep_alives(&mut self, enabled: bool) -> Result<&mut Self> {
        self.reconfigure(|config| config.keep_alive = enabled)
    }

    /// Replaces the cookie jar shared by all requests of this session.
    pub fn set_cookie_jar(&mut self, jar: Arc<Jar>) -> Result<&mut Self> {
        self.client = build_client(&self.config, Arc::clone(&jar))?;
        self.jar = jar;
        Ok(self)
    }

    /// Applies `change` and rebuilds the client. On failure the previous
    /// configuration stays in effect.
    fn reconfigure(&mut self, change: impl FnOnce(&mut SessionConfig)) -> Result<&mut Self> {
        let mut config = self.config.clone();
        change(&mut config);
        self.client = build_client(&config, Arc::clone(&self.jar))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(?config, "session transport reconfigured");

        self.config = config;
        Ok(self)
    }

    /// Merges the session defaults into `options` and executes them with retry.
    pub async fn do_request(&self, options: RequestOptions) -> Result<Response> {
        self.execute(options, None).await
    }

    /// Like [`Session::do_request`], with every attempt bound to `cancel`.
    pub async fn do_request_with_cancel(
        &self,
        options: RequestOptions,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        self.execute(options, Some(cancel)).await
    }

    async fn execute(
        &self,
        mut options: RequestOptions,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response> {
        options.merge(&self.defaults);
        execute_with_retry(
            self.transport(),
            &options,
            Some(self.cookie_store()),
            cancel,
            self.log.as_ref(),
        )
        .await?
        .into_result()
    }

    /// Sends `method` to `url`, with `content_type` set when non-empty.
    pub async fn do_with<'a>(
        &self,
        method: &str,
        url: &str,
        content_type: &str,
        body: impl Into<Body<'a>>,
    ) -> Result<Response> {
        let options = shorthand_options(method, url, content_type, body)?;
        self.execute(options, None).await
    }

    pub async fn do_with_cancel<'a>(
        &self,
        cancel: &CancellationToken,
        method: &str,
        url: &str,
        content_type: &str,
        body: impl Into<Body<'a>>,
    ) -> Result<Response> {
        let options = shorthand_options(method, url, content_type, body)?;
        self.execute(options, Some(cancel)).await
    }

    pub async fn get(&self, url: &str) -> Result<Response> {
        self.do_with("GET", url, "", Body::Empty).await
    }

    pub async fn get_with_cancel(&self, cancel: &CancellationToken, url: &str) -> Result<Response> {
        self.do_with_cancel(cancel, "GET", url, "", Body::Empty).await
    }

    pub async fn head(&self, url: &str) -> Result<Response> {
        self.do_with("HEAD", url, "", Body::Empty).await
    }

    pub async fn head_with_cancel(
        &self,
        cancel: &CancellationToken,
        url: &str,
    ) -> Result<Response> {
        self.do_with_cancel(cancel, "HEAD", url, "", Body::Empty).await
    }

    pub async fn post<'a>(
        &self,
        url: &str,
        content_type: &str,
        body: impl Into<Body<'a>>,
    ) -> Result<Response> {
        self.do_with("POST", url, content_type, body).await
    }

    pub async fn post_with_cancel<'a>(
        &self,
        cancel: &CancellationToken,
        url: &str,
        content_type: &str,
        body: impl Into<Body<'a>>,
    ) -> Result<Response> {
        self.do_with_cancel(cancel, "POST", url, content_type, body)
            .await
    }

    /// Posts `form` URL-encoded, e.g. `&[("name", "kit")]`.
    pub async fn post_form<F>(&self, url: &str, form: &F) -> Result<Response>
    where
        F: Serialize + Sync + ?Sized,
    {
        let encoded = serde_urlencoded::to_string(form).map_err(RequestsError::FormEncode)?;
        self.post(url, FORM_CONTENT_TYPE, encoded).await
    }

    pub async fn post_form_with_cancel<F>(
        &self,
        cancel: &CancellationToken,
        url: &str,
        form: &F,
    ) -> Result<Response>
    where
        F: Serialize + Sync + ?Sized,
    {
        let encoded = serde_urlencoded::to_string(form).map_err(RequestsError::FormEncode)?;
        self.post_with_cancel(cancel, url, FORM_CONTENT_TYPE, encoded)
            .await
    }

    pub async fn put<'a>(
        &self,
        url: &str,
        content_type: &str,
        body: impl Into<Body<'a>>,
    ) -> Result<Response> {
        self.do_with("PUT", url, content_type, body).await
    }

    pub async fn put_with_cancel<'a>(
        &self,
        cancel: &CancellationToken,
        url: &str,
        content_type: &str,
        body: impl Into<Body<'a>>,
    ) -> Result<Response> {
        self.do_with_cancel(cancel, "PUT", url, content_type, body)
            .await
    }

    pub async fn delete<'a>(
        &self,
        url: &str,
        content_type: &str,
        body: impl Into<Body<'a>>,
    ) -> Result<Response> {
        self.do_with("DELETE", url, content_type, body).await
    }

    pub async fn delete_with_cancel<'a>(
        &self,
        cancel: &CancellationToken,
        url: &str,
        content_type: &str,
        body: impl Into<Body<'a>>,
    ) -> Result<Response> {
        self.do_with_cancel(cancel, "DELETE", url, content_type, body)
            .await
    }

    /// Sends `options` once (no retry) and writes the request and response
    /// dumps to the log sink, `>` and `<` prefixed.
    pub async fn debug_trace(&self, mut options: RequestOptions) -> Result<Response> {
        options.merge(&self.defaults);
        let request = build_request(&options, Some(self.cookie_store()))?;
        self.log
            .log(format_args!("{}", dump_request_indent(&request).trim_end()));

        match self.transport().round_trip(request).await {
            Ok(response) => {
                let mut response = Response::from(response);
                let dump = response.dump_indent().await;
                self.log.log(format_args!("{}", dump.trim_end()));
                Ok(response)
            }
            Err(err) => {
                self.log.log(format_args!("response error: {err}"));
                Err(err)
            }
        }
    }
}

fn shorthand_options<'a>(
    method: &str,
    url: &str,
    content_type: &str,
    body: impl Into<Body<'a>>,
) -> Result<RequestOptions> {
    let mut options = RequestOptions::new(method, url);
    if !content_type.is_empty() {
        options.set_header("content-type", content_type);
    }
    options.set_body(body)?;
    Ok(options)
}
