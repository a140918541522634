use std::{sync::Arc, time::Duration};

use reqwest::{cookie::Jar, Client, ClientBuilder, Proxy};
use url::Url;

use crate::{RequestsError, Result};

/// Proxy the session routes its requests through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProxyConfig {
    /// `socks4://` or `socks5://` address, dialed as SOCKS5.
    Socks(Url),
    /// Any other scheme, used as an HTTP(S) proxy.
    Http(Url),
}

impl ProxyConfig {
    /// Parses a proxy address.
    ///
    /// Fails with [`RequestsError::EmptyProxy`] for an empty string and
    /// [`RequestsError::UrlParse`] for anything that is not a URL.
    pub fn parse(addr: &str) -> Result<Self> {
        if addr.is_empty() {
            return Err(RequestsError::EmptyProxy);
        }
        let url = Url::parse(addr).map_err(|err| RequestsError::url_parse(addr, err))?;
        match url.scheme() {
            "socks4" | "socks5" => Ok(Self::Socks(url)),
            _ => Ok(Self::Http(url)),
        }
    }

    pub fn url(&self) -> &Url {
        match self {
            Self::Socks(url) | Self::Http(url) => url,
        }
    }

    pub fn is_socks(&self) -> bool {
        matches!(self, Self::Socks(_))
    }

    fn to_proxy(&self) -> Result<Proxy> {
        let target = match self {
            Self::Socks(url) => {
                let mut socks = url.clone();
                socks
                    .set_scheme("socks5")
                    .map_err(|()| RequestsError::Config(format!("invalid socks proxy '{url}'")))?;
                socks
            }
            Self::Http(url) => url.clone(),
        };
        Proxy::all(target.as_str()).map_err(RequestsError::ClientBuild)
    }
}

/// Transport configuration for a [`Session`](crate::Session).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Overall per-request timeout in seconds. `0` leaves it to the transport.
    pub timeout_secs: u64,
    /// Reuse connections between requests.
    pub keep_alive: bool,
    /// Maximum idle connections kept per host.
    pub pool_max_idle_per_host: usize,
    /// How long an idle connection is kept, in seconds.
    pub pool_idle_timeout_secs: u64,
    /// Optional proxy for every request.
    pub proxy: Option<ProxyConfig>,
    /// Default number of retries after the first attempt.
    pub retry: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            keep_alive: true,
            pool_max_idle_per_host: 10,
            pool_idle_timeout_secs: 120,
            proxy: None,
            retry: 0,
        }
    }
}

impl SessionConfig {
    /// Loads configuration from environment variables on top of the defaults.
    ///
    /// Reads (all optional):
    /// - `REQUESTS_TIMEOUT_SECS`: per-request timeout in seconds
    /// - `REQUESTS_RETRY`: retries after the first attempt
    /// - `REQUESTS_PROXY`: proxy address (`http://`, `socks5://`, ...)
    /// - `REQUESTS_KEEP_ALIVE`: `true`/`false`
    ///
    /// Returns an error if a variable is set but malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(value) = lookup("REQUESTS_TIMEOUT_SECS") {
            config.timeout_secs = parse_var("REQUESTS_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = lookup("REQUESTS_RETRY") {
            config.retry = parse_var("REQUESTS_RETRY", &value)?;
        }
        if let Some(value) = lookup("REQUESTS_KEEP_ALIVE") {
            config.keep_alive = parse_var("REQUESTS_KEEP_ALIVE", &value)?;
        }
        if let Some(value) = lookup("REQUESTS_PROXY") {
            if !value.trim().is_empty() {
                config.proxy = Some(ProxyConfig::parse(value.trim())?);
            }
        }
        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RequestsError::Config(format!("{key} has invalid value '{value}'")))
}

/// Builds the `reqwest` client backing a session.
pub(crate) fn build_client(config: &SessionConfig, jar: Arc<Jar>) -> Result<Client> {
    let mut builder = ClientBuilder::new()
        .cookie_provider(jar)
        .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs));

    builder = if config.keep_alive {
        builder.pool_max_idle_per_host(config.pool_max_idle_per_host)
    } else {
        builder.pool_max_idle_per_host(0)
    };

    if config.timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(config.timeout_secs));
    }

    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(proxy.to_proxy()?);
    }

    builder.build().map_err(RequestsError::ClientBuild)
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use super::{build_client, ProxyConfig, SessionConfig};
    use crate::RequestsError;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.timeout_secs, 10);
        assert!(config.keep_alive);
        assert_eq!(config.pool_max_idle_per_host, 10);
        assert_eq!(config.pool_idle_timeout_secs, 120);
        assert_eq!(config.proxy, None);
        assert_eq!(config.retry, 0);
    }

    #[test]
    fn empty_proxy_is_rejected() {
        assert!(matches!(
            ProxyConfig::parse(""),
            Err(RequestsError::EmptyProxy)
        ));
    }

    #[test]
    fn malformed_proxy_is_a_url_error() {
        assert!(matches!(
            ProxyConfig::parse("not a url://??"),
            Err(RequestsError::UrlParse { .. })
        ));
    }

    #[test]
    fn socks_schemes_select_the_socks_path() {
        let socks5 = ProxyConfig::parse("socks5://host:1080").expect("valid proxy");
        let socks4 = ProxyConfig::parse("socks4://host:1080").expect("valid proxy");
        let http = ProxyConfig::parse("http://127.0.0.1:9743").expect("valid proxy");

        assert!(socks5.is_socks());
        assert!(socks4.is_socks());
        assert!(!http.is_socks());
        assert_eq!(socks5.url().port(), Some(1080));
    }

    #[test]
    fn env_overrides_defaults() {
        let config = SessionConfig::from_lookup(lookup(&[
            ("REQUESTS_TIMEOUT_SECS", "3"),
            ("REQUESTS_RETRY", "2"),
            ("REQUESTS_KEEP_ALIVE", "false"),
            ("REQUESTS_PROXY", "socks5://127.0.0.1:1080"),
        ]))
        .expect("valid env");

        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.retry, 2);
        assert!(!config.keep_alive);
        assert!(config.proxy.as_ref().is_some_and(ProxyConfig::is_socks));
    }

    #[test]
    fn env_rejects_malformed_values() {
        let err = SessionConfig::from_lookup(lookup(&[("REQUESTS_RETRY", "many")]))
            .expect_err("must fail");
        assert!(matches!(err, RequestsError::Config(message) if message.contains("REQUESTS_RETRY")));
    }

    #[test]
    fn client_builds_with_socks_and_http_proxies() {
        for addr in ["socks4://127.0.0.1:1080", "http://127.0.0.1:9743"] {
            let config = SessionConfig {
                proxy: Some(ProxyConfig::parse(addr).expect("valid proxy")),
                ..SessionConfig::default()
            };
            assert!(build_client(&config, Arc::default()).is_ok());
        }
    }
}
