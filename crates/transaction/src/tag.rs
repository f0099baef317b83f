//! Name/value metadata attached to a transaction.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A transaction tag.
///
/// Names and values are arbitrary bytes; by convention both are UTF-8.
/// They are signed as-is and carried base64url-encoded on the wire.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name
    #[serde(with = "weft_primitives::encoding::b64")]
    pub name: Bytes,
    /// Tag value
    #[serde(with = "weft_primitives::encoding::b64")]
    pub value: Bytes,
}

impl Tag {
    /// Create a tag from a name and value
    pub fn new(name: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        Self {
            name: Bytes::copy_from_slice(name.as_ref()),
            value: Bytes::copy_from_slice(value.as_ref()),
        }
    }

    /// The name as UTF-8, if it is valid UTF-8
    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.name).ok()
    }

    /// The value as UTF-8, if it is valid UTF-8
    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut t = f.debug_tuple("Tag");
        match self.name_str() {
            Some(name) => t.field(&name),
            None => t.field(&self.name),
        };
        match self.value_str() {
            Some(value) => t.field(&value),
            None => t.field(&self.value),
        };
        t.finish()
    }
}

impl<N: AsRef<[u8]>, V: AsRef<[u8]>> From<(N, V)> for Tag {
    fn from((name, value): (N, V)) -> Self {
        Self::new(name, value)
    }
}
