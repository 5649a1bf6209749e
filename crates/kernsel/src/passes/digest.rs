use std::fmt::{self, Write as _};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::canonical_json::to_canonical_string;
use super::{IdentityResult, PassIdentityError};

/// Hex length of a SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Content digest identifying a pass for compiler-cache purposes.
///
/// Always 64 lowercase hex characters (SHA-256).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PassDigest(String);

impl PassDigest {
    /// Hashes `bytes` directly.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self::from_hasher(hasher)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_hasher(hasher: Sha256) -> Self {
        let bytes = hasher.finalize();
        let mut hex = String::with_capacity(DIGEST_HEX_LEN);
        for byte in bytes {
            let _ = write!(hex, "{byte:02x}");
        }
        PassDigest(hex)
    }
}

impl fmt::Display for PassDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PassDigest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for PassDigest {
    type Err = PassIdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.len() == DIGEST_HEX_LEN
            && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if valid {
            Ok(PassDigest(s.to_string()))
        } else {
            Err(PassIdentityError::invalid_digest(s))
        }
    }
}

impl TryFrom<String> for PassDigest {
    type Error = PassIdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PassDigest> for String {
    fn from(digest: PassDigest) -> Self {
        digest.0
    }
}

/// One contribution to [`digest_of_source`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceArg<'a> {
    /// Literal text, hashed as given.
    Text(&'a str),
    /// A pass or function whose captured source is hashed; `source` is `None` when nothing was
    /// captured for it.
    Object {
        name: &'a str,
        source: Option<&'a str>,
    },
}

impl<'a> SourceArg<'a> {
    pub fn object(name: &'a str, source: Option<&'a str>) -> Self {
        SourceArg::Object { name, source }
    }

    fn text(self) -> IdentityResult<&'a str> {
        match self {
            SourceArg::Text(text) => Ok(text),
            SourceArg::Object {
                source: Some(source),
                ..
            } => Ok(source),
            SourceArg::Object { name, source: None } => {
                Err(PassIdentityError::source_unavailable(name))
            }
        }
    }
}

impl<'a> From<&'a str> for SourceArg<'a> {
    fn from(text: &'a str) -> Self {
        SourceArg::Text(text)
    }
}

impl<'a> From<&'a String> for SourceArg<'a> {
    fn from(text: &'a String) -> Self {
        SourceArg::Text(text.as_str())
    }
}

/// SHA-256 over the UTF-8 source of every argument, concatenated in order.
///
/// Fails with [`PassIdentityError::SourceUnavailable`] as soon as an object without captured
/// source is encountered; nothing is hashed for partial input.
pub fn digest_of_source<'a, I, S>(sources: I) -> IdentityResult<PassDigest>
where
    I: IntoIterator<Item = S>,
    S: Into<SourceArg<'a>>,
{
    let mut hasher = Sha256::new();
    for source in sources {
        hasher.update(source.into().text()?.as_bytes());
    }
    Ok(PassDigest::from_hasher(hasher))
}

/// SHA-256 of the canonical, key-sorted serialization of `mapping`.
///
/// Values that cannot be represented (e.g. maps with non-string keys) fail with
/// [`PassIdentityError::Serialization`].
pub fn digest_of_mapping<T>(mapping: &T) -> IdentityResult<PassDigest>
where
    T: Serialize + ?Sized,
{
    let canonical = to_canonical_string(mapping)?;
    Ok(PassDigest::of_bytes(canonical.as_bytes()))
}
