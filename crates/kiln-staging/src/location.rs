use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Scheme prefix accepted for object-storage location references.
const SCHEME: &str = "s3://";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationParseError {
    #[error("location reference must start with {SCHEME}: {0}")]
    MissingScheme(String),

    #[error("location reference has an empty bucket: {0}")]
    EmptyBucket(String),
}

/// A parsed object-storage location reference.
///
/// Replaces positional string slicing of `s3://bucket/key` references with
/// a structured parse that rejects malformed input. The key is kept
/// verbatim, trailing slash included; callers that build per-file keys by
/// concatenation rely on that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocation {
    pub bucket: String,
    pub key: String,
}

impl StorageLocation {
    #[must_use]
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self { bucket: bucket.into(), key: key.into() }
    }

    /// Appends `suffix` to the key prefix with no separator inserted.
    ///
    /// A location of `s3://b/models/` joined with `a.ckpt` yields
    /// `models/a.ckpt`; without the trailing slash it yields `modelsa.ckpt`.
    #[must_use]
    pub fn join_key(&self, suffix: &str) -> String {
        format!("{}{}", self.key, suffix)
    }
}

impl FromStr for StorageLocation {
    type Err = LocationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(SCHEME)
            .ok_or_else(|| LocationParseError::MissingScheme(s.to_string()))?;

        let (bucket, key) = match rest.split_once('/') {
            Some((bucket, key)) => (bucket, key),
            None => (rest, ""),
        };

        if bucket.is_empty() {
            return Err(LocationParseError::EmptyBucket(s.to_string()));
        }

        Ok(Self { bucket: bucket.to_string(), key: key.to_string() })
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}{}/{}", self.bucket, self.key)
    }
}
