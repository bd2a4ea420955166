use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::trace;

use crate::{BoxFuture, ObjectStore, StorageError, validate_key};

/// Bucket behind a plain HTTP gateway: `PUT`/`GET {endpoint}/{bucket}/{key}`.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: Client,
    endpoint: String,
    bucket: String,
    token: Option<String>,
}

impl HttpObjectStore {
    pub fn new(
        endpoint: &str,
        bucket: &str,
        token: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, StorageError> {
        let endpoint = endpoint.trim_end_matches('/');
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(StorageError::Config(format!(
                "object store endpoint must start with http:// or https://, got {endpoint:?}"
            )));
        }
        if bucket.trim().is_empty() || bucket.contains('/') {
            return Err(StorageError::Config(format!("invalid bucket name {bucket:?}")));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            bucket: bucket.to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    fn url_for(&self, key: &str) -> Result<String, StorageError> {
        validate_key(key)?;
        Ok(format!("{}/{}/{}", self.endpoint, self.bucket, key))
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

impl ObjectStore for HttpObjectStore {
    fn describe(&self) -> String {
        format!("{}/{}", self.endpoint, self.bucket)
    }

    fn put<'a>(&'a self, key: &'a str, body: Vec<u8>) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            let url = self.url_for(key)?;
            let resp = self.authorize(self.client.put(&url)).body(body).send().await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(StorageError::HttpStatus {
                    status: status.as_u16(),
                    url,
                });
            }
            trace!(%url, "object stored");
            Ok(())
        })
    }

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>, StorageError>> {
        Box::pin(async move {
            let url = self.url_for(key)?;
            let resp = self.authorize(self.client.get(&url)).send().await?;
            match resp.status() {
                StatusCode::NOT_FOUND => Ok(None),
                s if s.is_success() => Ok(Some(resp.bytes().await?.to_vec())),
                s => Err(StorageError::HttpStatus {
                    status: s.as_u16(),
                    url,
                }),
            }
        })
    }
}
