//! Composite storage keys for digest records.
//!
//! Digest records are stored under a partition key built from the registry
//! host and repository, and a row key built from the tag. Repository names
//! routinely contain `/`, which key-value stores reserve or treat as a path
//! separator, so every segment is percent-escaped before it is joined. The
//! escape set includes the segment delimiter `+` itself, which makes the
//! join unambiguous and the encoding reversible.

use crate::error::{Error, Result};

/// Delimiter between the registry and repository segments of a partition key.
pub const SEGMENT_DELIMITER: char = '+';

const fn needs_escape(c: char) -> bool {
    matches!(c, '%' | '/' | '\\' | '#' | '?' | SEGMENT_DELIMITER) || c.is_ascii_control()
}

/// Escapes one key segment.
///
/// # Examples
///
/// ```
/// use tagwatch_core::encode_segment;
///
/// assert_eq!(encode_segment("library/nginx"), "library%2Fnginx");
/// assert_eq!(encode_segment("a+b"), "a%2Bb");
/// assert_eq!(encode_segment("100%"), "100%25");
/// ```
#[must_use]
pub fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        if needs_escape(c) {
            // escaped characters are all ASCII
            out.push_str(&format!("%{:02X}", u32::from(c)));
        } else {
            out.push(c);
        }
    }
    out
}

/// Reverses [`encode_segment`].
///
/// # Errors
///
/// Returns [`Error::InvalidKey`] if an escape sequence is truncated or not
/// valid hex, or the decoded bytes are not UTF-8.
///
/// # Examples
///
/// ```
/// use tagwatch_core::{decode_segment, encode_segment};
///
/// let original = "team/app+beta";
/// assert_eq!(decode_segment(&encode_segment(original)).unwrap(), original);
/// ```
pub fn decode_segment(segment: &str) -> Result<String> {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .ok_or_else(|| invalid(segment, "truncated escape sequence"))?;
            let byte =
                u8::from_str_radix(hex, 16).map_err(|_| invalid(segment, "invalid escape sequence"))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).map_err(|_| invalid(segment, "decoded key is not UTF-8"))
}

fn invalid(key: &str, reason: &str) -> Error {
    Error::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Storage key of one digest record.
///
/// At most one record exists per `(registry, repository, tag)` triple, and
/// distinct triples always produce distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DigestKey {
    /// Encoded `registry+repository`.
    pub partition_key: String,

    /// Encoded tag.
    pub row_key: String,
}

impl DigestKey {
    /// Builds the key for a `(registry, repository, tag)` triple.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagwatch_core::DigestKey;
    ///
    /// let key = DigestKey::new("docker.io", "library/nginx", "latest");
    /// assert_eq!(key.partition_key, "docker.io+library%2Fnginx");
    /// assert_eq!(key.row_key, "latest");
    /// ```
    #[must_use]
    pub fn new(registry: &str, repository: &str, tag: &str) -> Self {
        Self {
            partition_key: format!(
                "{}{SEGMENT_DELIMITER}{}",
                encode_segment(registry),
                encode_segment(repository)
            ),
            row_key: encode_segment(tag),
        }
    }

    /// Rebuilds a key from its stored parts, validating both.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the partition key does not contain
    /// exactly one delimiter or any segment fails to decode.
    pub fn from_parts(partition_key: impl Into<String>, row_key: impl Into<String>) -> Result<Self> {
        let key = Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
        };
        key.decode()?;
        Ok(key)
    }

    /// Decodes the key back into `(registry, repository, tag)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the key is malformed.
    pub fn decode(&self) -> Result<(String, String, String)> {
        let mut parts = self.partition_key.split(SEGMENT_DELIMITER);
        let (Some(registry), Some(repository), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid(
                &self.partition_key,
                "partition key must contain exactly one delimiter",
            ));
        };

        Ok((
            decode_segment(registry)?,
            decode_segment(repository)?,
            decode_segment(&self.row_key)?,
        ))
    }
}

impl std::fmt::Display for DigestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.partition_key, self.row_key)
    }
}
