use crate::config::ProxyConfig;
use crate::error::ClientError;
use reqwest::{Client, Proxy};
use std::sync::{Arc, Mutex, PoisonError};

/// Supplies HTTP clients for direct or proxied traffic.
pub trait ClientProvider: Send + Sync {
    /// Client routed through the forward proxy when `should_proxy` is set.
    fn client(&self, should_proxy: bool) -> Result<Client, ClientError>;
}

impl<P: ClientProvider + ?Sized> ClientProvider for Arc<P> {
    fn client(&self, should_proxy: bool) -> Result<Client, ClientError> {
        (**self).client(should_proxy)
    }
}

/// Builds clients from a [`ProxyConfig`] and caches one per proxy mode.
///
/// The lock for a mode is held only while its client is created; callers get
/// cheap clones of the cached client.
#[derive(Debug)]
pub struct ProxiedClientProvider {
    config: ProxyConfig,
    direct: Mutex<Option<Client>>,
    proxied: Mutex<Option<Client>>,
}

impl ProxiedClientProvider {
    /// Create a provider with empty client caches.
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config,
            direct: Mutex::new(None),
            proxied: Mutex::new(None),
        }
    }

    fn build(&self, should_proxy: bool) -> Result<Client, ClientError> {
        let mut builder = Client::builder().connect_timeout(self.config.connect_timeout());
        if let Some(timeout) = self.config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = &self.config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }

        builder = if should_proxy {
            let address = self
                .config
                .address
                .as_deref()
                .ok_or(ClientError::ProxyNotConfigured)?;
            let mut proxy = Proxy::all(address).map_err(|source| ClientError::InvalidProxy {
                address: address.to_string(),
                source,
            })?;
            match (&self.config.username, &self.config.password) {
                (Some(username), Some(password)) => proxy = proxy.basic_auth(username, password),
                (None, None) => {}
                _ => return Err(ClientError::IncompleteCredentials),
            }
            builder.proxy(proxy)
        } else {
            // Ignore proxies picked up from the environment.
            builder.no_proxy()
        };

        tracing::debug!(should_proxy, "building HTTP client");
        builder.build().map_err(ClientError::Build)
    }
}

impl ClientProvider for ProxiedClientProvider {
    fn client(&self, should_proxy: bool) -> Result<Client, ClientError> {
        let slot = if should_proxy {
            &self.proxied
        } else {
            &self.direct
        };

        let mut cached = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = cached.as_ref() {
            return Ok(client.clone());
        }

        let client = self.build(should_proxy)?;
        *cached = Some(client.clone());
        Ok(client)
    }
}
