use serde::Serialize;

use crate::errors::ReportError;

/// A `scheme://bucket/prefix` storage URI split into its parts.
///
/// The prefix is normalized to end in `/` unless it is empty, so keys can be
/// built by plain concatenation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageLocation {
    pub scheme: String,
    pub bucket: String,
    pub prefix: String,
}

impl StorageLocation {
    pub fn parse(uri: &str) -> Result<Self, ReportError> {
        let (scheme, bucket, key) = split_uri(uri)?;

        let trimmed = key.trim_matches('/');
        let prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("{}/", trimmed)
        };

        Ok(Self {
            scheme: scheme.to_string(),
            bucket: bucket.to_string(),
            prefix,
        })
    }

    /// Key of an object directly under this location.
    pub fn key_for(&self, file_name: &str) -> String {
        format!("{}{}", self.prefix, file_name)
    }

    /// Parse a full object URI into bucket and key. The key is taken
    /// verbatim; malformed keys are left for the object store to reject.
    pub fn parse_object(uri: &str) -> Result<(String, String), ReportError> {
        let (_, bucket, key) = split_uri(uri)?;
        if key.is_empty() {
            return Err(ReportError::Validation(format!(
                "Invalid object location '{}': missing key",
                uri
            )));
        }
        Ok((bucket.to_string(), key.to_string()))
    }
}

/// Split `scheme://bucket/rest` into its three parts.
fn split_uri(uri: &str) -> Result<(&str, &str, &str), ReportError> {
    let (scheme, rest) = uri.split_once("://").ok_or_else(|| {
        ReportError::Validation(format!(
            "Invalid storage location '{}': expected scheme://bucket/prefix",
            uri
        ))
    })?;

    if scheme.is_empty() {
        return Err(ReportError::Validation(format!(
            "Invalid storage location '{}': missing scheme",
            uri
        )));
    }

    let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
    if bucket.is_empty() {
        return Err(ReportError::Validation(format!(
            "Invalid storage location '{}': missing bucket",
            uri
        )));
    }
    Ok((scheme, bucket, key))
}

impl std::fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_prefix() {
        let loc = StorageLocation::parse("s3://hospital-patient-data-bucket/athena-query-results/")
            .expect("parse");
        assert_eq!(loc.scheme, "s3");
        assert_eq!(loc.bucket, "hospital-patient-data-bucket");
        assert_eq!(loc.prefix, "athena-query-results/");
    }

    #[test]
    fn test_parse_adds_trailing_slash() {
        let loc = StorageLocation::parse("s3://bucket/results").expect("parse");
        assert_eq!(loc.prefix, "results/");
        assert_eq!(loc.key_for("exec-123.csv"), "results/exec-123.csv");
    }

    #[test]
    fn test_parse_nested_prefix() {
        let loc = StorageLocation::parse("gs://bucket/a/b/c/").expect("parse");
        assert_eq!(loc.prefix, "a/b/c/");
    }

    #[test]
    fn test_parse_bucket_only() {
        let loc = StorageLocation::parse("s3://bucket").expect("parse");
        assert_eq!(loc.prefix, "");
        assert_eq!(loc.key_for("x.csv"), "x.csv");
        let loc = StorageLocation::parse("s3://bucket/").expect("parse");
        assert_eq!(loc.prefix, "");
    }

    #[test]
    fn test_parse_rejects_missing_scheme() {
        assert!(StorageLocation::parse("bucket/prefix").is_err());
        assert!(StorageLocation::parse("://bucket/prefix").is_err());
    }

    #[test]
    fn test_parse_rejects_missing_bucket() {
        assert!(StorageLocation::parse("s3:///prefix").is_err());
    }

    #[test]
    fn test_parse_object() {
        let (bucket, key) =
            StorageLocation::parse_object("s3://bucket/results/abc.csv").expect("parse");
        assert_eq!(bucket, "bucket");
        assert_eq!(key, "results/abc.csv");
        assert!(StorageLocation::parse_object("s3://bucket/").is_err());
        assert!(StorageLocation::parse_object("s3://bucket").is_err());
    }

    #[test]
    fn test_parse_object_keeps_key_verbatim() {
        let (_, key) = StorageLocation::parse_object("s3://bucket//x.csv").expect("parse");
        assert_eq!(key, "/x.csv");
        let (_, key) = StorageLocation::parse_object("s3://bucket/a//b.csv").expect("parse");
        assert_eq!(key, "a//b.csv");
        let (_, key) = StorageLocation::parse_object("s3://bucket/results/").expect("parse");
        assert_eq!(key, "results/");
    }

    #[test]
    fn test_display_roundtrip() {
        let loc = StorageLocation::parse("s3://bucket/results").expect("parse");
        assert_eq!(loc.to_string(), "s3://bucket/results/");
    }
}
