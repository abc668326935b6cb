//! AWS Signature Version 4 for single-chunk S3 requests.
//!
//! Only the subset needed by [`S3BlobStore`](crate::S3BlobStore) is
//! implemented: header based signing of `host`, `x-amz-content-sha256` and
//! `x-amz-date`, with an empty query string and the full payload hashed up
//! front.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";
pub const SIGNED_HEADERS: &str = "host;x-amz-content-sha256;x-amz-date";
const SERVICE: &str = "s3";
const TERMINATOR: &str = "aws4_request";

/// Access key pair used to sign requests.
#[derive(Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Headers to attach to a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub authorization: String,
    pub amz_date: String,
    pub content_sha256: String,
}

/// One request to be signed.
#[derive(Debug, Clone, Copy)]
pub struct SigningRequest<'a> {
    pub method: &'a str,
    /// Value of the `host` header as sent on the wire.
    pub host: &'a str,
    /// Already URI-encoded absolute path.
    pub canonical_path: &'a str,
    pub payload: &'a [u8],
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], msg: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(msg);
    mac.finalize().into_bytes().to_vec()
}

/// Derive the per-day signing key.
pub fn signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, TERMINATOR.as_bytes())
}

pub fn canonical_request(
    request: &SigningRequest<'_>,
    payload_hash: &str,
    amz_date: &str,
) -> String {
    let canonical_headers = format!(
        "host:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n",
        request.host, payload_hash, amz_date
    );
    // the empty line is the (always empty) canonical query string
    format!(
        "{}\n{}\n\n{}\n{}\n{}",
        request.method, request.canonical_path, canonical_headers, SIGNED_HEADERS, payload_hash
    )
}

pub fn credential_scope(date_stamp: &str, region: &str) -> String {
    format!("{}/{}/{}/{}", date_stamp, region, SERVICE, TERMINATOR)
}

pub fn string_to_sign(amz_date: &str, scope: &str, canonical_request: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        sha256_hex(canonical_request.as_bytes())
    )
}

/// Sign `request` as of `now`.
pub fn sign(
    credentials: &Credentials,
    region: &str,
    request: &SigningRequest<'_>,
    now: DateTime<Utc>,
) -> SignedHeaders {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = now.format("%Y%m%d").to_string();
    let payload_hash = sha256_hex(request.payload);

    let canonical = canonical_request(request, &payload_hash, &amz_date);
    let scope = credential_scope(&date_stamp, region);
    let to_sign = string_to_sign(&amz_date, &scope, &canonical);

    let key = signing_key(&credentials.secret_key, &date_stamp, region, SERVICE);
    let signature = hex::encode(hmac_sha256(&key, to_sign.as_bytes()));

    let authorization = format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM, credentials.access_key, scope, SIGNED_HEADERS, signature
    );

    SignedHeaders {
        authorization,
        amz_date,
        content_sha256: payload_hash,
    }
}
