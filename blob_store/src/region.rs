//! Region detection for S3-compatible endpoints.

use once_cell::sync::Lazy;
use regex::Regex;

/// Region used when the endpoint matches no known provider. MinIO and most
/// self-hosted S3 servers accept it.
pub const DEFAULT_REGION: &str = "us-east-1";

static PROVIDER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"s3[.-]([a-z0-9-]+)\.amazonaws\.com",
        r"([a-z0-9-]+)\.digitaloceanspaces\.com",
        r"([a-z0-9-]+)\.linodeobjects\.com",
        r"s3\.([a-z0-9-]+)\.backblazeb2\.com",
        r"s3\.([a-z0-9-]+)\.wasabisys\.com",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Derive the signing region from an endpoint host name.
pub fn detect_region(host: &str) -> String {
    let host = host.to_ascii_lowercase();
    PROVIDER_PATTERNS
        .iter()
        .find_map(|re| re.captures(&host))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_REGION.to_string())
}
