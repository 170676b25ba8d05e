//! Outbound HTTP client construction.

use reqwest::{Client, Proxy};
use std::time::Duration;

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the shared outbound client, routed through `proxy` when one is set.
pub fn build_http_client(proxy: Option<&str>) -> reqwest::Result<Client> {
    let mut builder = Client::builder().pool_idle_timeout(POOL_IDLE_TIMEOUT);
    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_and_without_proxy() {
        assert!(build_http_client(None).is_ok());
        assert!(build_http_client(Some("http://proxy.internal:3128")).is_ok());
    }
}
