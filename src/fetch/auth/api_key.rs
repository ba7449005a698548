use crate::fetch::client::HttpClient;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects an API key as an HTTP header.
///
/// The MTA feed endpoints expect the key in `x-api-key`.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    key: HeaderValue,
}

impl<C> ApiKey<C> {
    /// Validates the header up front so sending a request cannot fail on it.
    pub fn new(inner: C, header_name: &str, key: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes())?;
        let mut key = HeaderValue::from_str(key)?;
        key.set_sensitive(true);
        Ok(Self {
            inner,
            header_name,
            key,
        })
    }

    pub fn x_api_key(inner: C, key: &str) -> Result<Self> {
        Self::new(inner, "x-api-key", key)
    }

    fn apply(&self, req: &mut reqwest::Request) {
        req.headers_mut()
            .insert(self.header_name.clone(), self.key.clone());
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.apply(&mut req);
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_header_is_injected() {
        let client = ApiKey::x_api_key((), "secret").unwrap();
        let mut req = reqwest::Request::new(
            reqwest::Method::GET,
            "http://localhost/feed".parse().unwrap(),
        );

        client.apply(&mut req);

        let value = req.headers().get("x-api-key").unwrap();
        assert_eq!(value, "secret");
        assert!(value.is_sensitive());
    }

    #[test]
    fn test_invalid_header_name_is_rejected() {
        assert!(ApiKey::new((), "bad header", "k").is_err());
    }

    #[test]
    fn test_invalid_header_value_is_rejected() {
        assert!(ApiKey::x_api_key((), "line\nbreak").is_err());
    }
}
