//! S3-compatible blob store backend speaking the REST API directly.
//!
//! Requests are signed with [`sigv4`](crate::sigv4) when both an access key
//! and a secret key are configured, otherwise they are sent unauthenticated
//! (useful against permissive self-hosted servers).

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header::CONTENT_TYPE, RequestBuilder, StatusCode};
use tracing::debug;
use url::Url;

use crate::{
    region::detect_region,
    sigv4::{self, Credentials, SigningRequest},
    BlobError,
    BlobResult,
    BlobStore,
    S3Config,
};

/// Where an object lives, in the two forms that must agree: the URL the
/// request is sent to and the host/path pair that gets signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub url: String,
    pub host: String,
    pub canonical_path: String,
}

/// S3 blob store backend.
#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: reqwest::Client,

    /// `http` or `https`.
    scheme: String,

    /// Endpoint host, with the port when it is not the scheme default.
    host: String,

    /// Path prefix of the endpoint without trailing slash, usually empty.
    base_path: String,

    bucket: String,
    region: String,
    credentials: Option<Credentials>,
    virtual_host: bool,
}

impl S3BlobStore {
    /// Create a new S3 blob store from configuration.
    ///
    /// No network I/O happens here.
    pub fn new(config: &S3Config) -> BlobResult<Self> {
        let endpoint = config
            .endpoint()
            .ok_or_else(|| BlobError::invalid_config("s3 endpoint is required"))?;
        let bucket = config
            .bucket()
            .ok_or_else(|| BlobError::invalid_config("s3 bucket is required"))?;

        let url = Url::parse(endpoint)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(BlobError::invalid_config(format!(
                "s3 endpoint must be an http(s) URL, got {}",
                endpoint
            )));
        }
        let host_name = url
            .host_str()
            .ok_or_else(|| BlobError::invalid_config(format!("s3 endpoint {} has no host", endpoint)))?;
        let host = match url.port() {
            Some(port) => format!("{}:{}", host_name, port),
            None => host_name.to_string(),
        };

        let region = config
            .region()
            .map(str::to_string)
            .unwrap_or_else(|| detect_region(host_name));

        let credentials = match (config.access_key(), config.secret_key()) {
            (Some(access_key), Some(secret_key)) => Some(Credentials {
                access_key: access_key.to_string(),
                secret_key: secret_key.to_string(),
            }),
            _ => None,
        };

        let client = reqwest::Client::builder().build()?;

        debug!(
            host = %host,
            bucket = %bucket,
            region = %region,
            virtual_host = config.virtual_host,
            signed = credentials.is_some(),
            "Created S3 blob store"
        );

        Ok(Self {
            client,
            scheme: url.scheme().to_string(),
            host,
            base_path: url.path().trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            region,
            credentials,
            virtual_host: config.virtual_host,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Build the request URL and the signed host/path for `id`.
    ///
    /// - path-style:   `scheme://host/bucket/id`, canonical path `/bucket/id`
    /// - virtual-host: `scheme://bucket.host/id`, canonical path `/id`
    pub fn location(&self, id: &str) -> BlobResult<ObjectLocation> {
        let key = encode_key(id)?;
        let (host, canonical_path) = if self.virtual_host {
            (
                format!("{}.{}", self.bucket, self.host),
                format!("{}/{}", self.base_path, key),
            )
        } else {
            (
                self.host.clone(),
                format!("{}/{}/{}", self.base_path, self.bucket, key),
            )
        };
        Ok(ObjectLocation {
            url: format!("{}://{}{}", self.scheme, host, canonical_path),
            host,
            canonical_path,
        })
    }

    fn authorize(
        &self,
        request: RequestBuilder,
        method: &str,
        location: &ObjectLocation,
        payload: &[u8],
    ) -> RequestBuilder {
        let Some(credentials) = &self.credentials else {
            return request;
        };
        let signed = sigv4::sign(
            credentials,
            &self.region,
            &SigningRequest {
                method,
                host: &location.host,
                canonical_path: &location.canonical_path,
                payload,
            },
            Utc::now(),
        );
        request
            .header("authorization", signed.authorization)
            .header("x-amz-date", signed.amz_date)
            .header("x-amz-content-sha256", signed.content_sha256)
    }
}

/// Percent-encode every path segment of `id` with the AWS unreserved set,
/// keeping `/` as the separator.
///
/// Dot segments are rejected because URL parsing would collapse them and the
/// path on the wire would no longer match the signed one.
fn encode_key(id: &str) -> BlobResult<String> {
    if id.is_empty() {
        return Err(BlobError::invalid_key(id, "id must not be empty"));
    }
    let mut segments = Vec::new();
    for segment in id.split('/') {
        if segment == "." || segment == ".." {
            return Err(BlobError::invalid_key(
                id,
                "id must not contain '.' or '..' segments",
            ));
        }
        segments.push(urlencoding::encode(segment));
    }
    Ok(segments.join("/"))
}

async fn error_body(response: reqwest::Response) -> String {
    response.text().await.unwrap_or_default()
}

#[async_trait]
impl BlobStore for S3BlobStore {
    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    async fn put(&self, id: &str, data: Vec<u8>) -> BlobResult<()> {
        let location = self.location(id)?;
        let request = self
            .client
            .put(&location.url)
            .header(CONTENT_TYPE, "application/octet-stream");
        let request = self.authorize(request, "PUT", &location, &data);

        let response = request.body(data).send().await?;
        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::CREATED {
            return Ok(());
        }
        Err(BlobError::UnexpectedStatus {
            method: "PUT",
            status: status.as_u16(),
            body: error_body(response).await,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: &str) -> BlobResult<Option<Vec<u8>>> {
        let location = self.location(id)?;
        let request = self.client.get(&location.url);
        let request = self.authorize(request, "GET", &location, b"");

        let response = request.send().await?;
        match response.status() {
            StatusCode::OK => Ok(Some(response.bytes().await?.to_vec())),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(BlobError::UnexpectedStatus {
                method: "GET",
                status: status.as_u16(),
                body: error_body(response).await,
            }),
        }
    }
}
