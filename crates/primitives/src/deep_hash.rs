//! Recursive hashing of nested byte lists.
//!
//! The deep hash folds a tree of blobs and lists into one SHA-384 digest. Every
//! node is prefixed with a tag carrying its kind and size (`"blob" + len` or
//! `"list" + count`), so neither a field's length nor the number of fields can
//! be changed without changing the digest:
//!
//! ```text
//! blob(b)  = H( H("blob" ++ len(b)) ++ H(b) )
//! list(xs) = fold(H("list" ++ len(xs)), |acc, x| H(acc ++ deep(x)))
//! ```
//!
//! Lengths and counts are written as ASCII decimal.

use alloy_primitives::FixedBytes;

use crate::hash::{sha384, sha384_concat};

/// A 48-byte SHA-384 digest.
pub type B384 = FixedBytes<48>;

/// A node in the structure being deep-hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepHashItem<'a> {
    /// Raw bytes
    Blob(&'a [u8]),
    /// An ordered list of nested items
    List(Vec<DeepHashItem<'a>>),
}

impl<'a> DeepHashItem<'a> {
    /// Wrap a byte slice.
    #[inline]
    pub const fn blob(bytes: &'a [u8]) -> Self {
        Self::Blob(bytes)
    }

    /// Collect items into a list.
    pub fn list(items: impl IntoIterator<Item = Self>) -> Self {
        Self::List(items.into_iter().collect())
    }
}

/// Compute the deep hash of `item`.
pub fn deep_hash(item: &DeepHashItem<'_>) -> B384 {
    match item {
        DeepHashItem::Blob(bytes) => {
            let tag = sha384(format!("blob{}", bytes.len()).as_bytes());
            sha384_concat(&[tag.as_slice(), sha384(bytes).as_slice()])
        }
        DeepHashItem::List(items) => {
            let tag = sha384(format!("list{}", items.len()).as_bytes());
            items.iter().fold(tag, |acc, item| {
                sha384_concat(&[acc.as_slice(), deep_hash(item).as_slice()])
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_binds_length_tag() {
        let expected = sha384_concat(&[sha384(b"blob3").as_slice(), sha384(b"abc").as_slice()]);
        assert_eq!(deep_hash(&DeepHashItem::blob(b"abc")), expected);
    }

    #[test]
    fn test_empty_list_is_tag_hash() {
        assert_eq!(deep_hash(&DeepHashItem::list([])), sha384(b"list0"));
    }

    #[test]
    fn test_deterministic() {
        let item = DeepHashItem::list([
            DeepHashItem::blob(b"2"),
            DeepHashItem::list([DeepHashItem::blob(b"name"), DeepHashItem::blob(b"value")]),
        ]);
        assert_eq!(deep_hash(&item), deep_hash(&item.clone()));
    }

    #[test]
    fn test_structure_changes_digest() {
        let flat = DeepHashItem::list([DeepHashItem::blob(b"a"), DeepHashItem::blob(b"b")]);
        let nested = DeepHashItem::list([DeepHashItem::list([
            DeepHashItem::blob(b"a"),
            DeepHashItem::blob(b"b"),
        ])]);
        let joined = DeepHashItem::list([DeepHashItem::blob(b"ab")]);

        assert_ne!(deep_hash(&flat), deep_hash(&nested));
        assert_ne!(deep_hash(&flat), deep_hash(&joined));
    }

    #[test]
    fn test_order_matters() {
        let ab = DeepHashItem::list([DeepHashItem::blob(b"a"), DeepHashItem::blob(b"b")]);
        let ba = DeepHashItem::list([DeepHashItem::blob(b"b"), DeepHashItem::blob(b"a")]);
        assert_ne!(deep_hash(&ab), deep_hash(&ba));
    }
}
