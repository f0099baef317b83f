//! Tag queries for finding transactions.

use serde::{Deserialize, Serialize};

/// A boolean expression over transaction tags, in the node's `arql` JSON
/// form.
///
/// ```
/// use weft_uploader::TagQuery;
///
/// let query = TagQuery::equals("App-Name", "weft").and(TagQuery::equals("Type", "post"));
/// let json = serde_json::to_value(&query).unwrap();
/// assert_eq!(json["op"], "and");
/// assert_eq!(json["expr1"]["expr2"], "weft");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum TagQuery {
    /// Tag `expr1` has value `expr2`
    Equals {
        /// Tag name
        expr1: String,
        /// Tag value
        expr2: String,
    },
    /// Both sides match
    And {
        /// Left side
        expr1: Box<TagQuery>,
        /// Right side
        expr2: Box<TagQuery>,
    },
    /// Either side matches
    Or {
        /// Left side
        expr1: Box<TagQuery>,
        /// Right side
        expr2: Box<TagQuery>,
    },
}

impl TagQuery {
    /// Match transactions tagged `name: value`.
    pub fn equals(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equals {
            expr1: name.into(),
            expr2: value.into(),
        }
    }

    /// Match when both `self` and `other` match.
    pub fn and(self, other: Self) -> Self {
        Self::And {
            expr1: Box::new(self),
            expr2: Box::new(other),
        }
    }

    /// Match when either `self` or `other` matches.
    pub fn or(self, other: Self) -> Self {
        Self::Or {
            expr1: Box::new(self),
            expr2: Box::new(other),
        }
    }

    /// Match every `name: value` pair. `None` if there are none.
    pub fn all<N, V>(tags: impl IntoIterator<Item = (N, V)>) -> Option<Self>
    where
        N: Into<String>,
        V: Into<String>,
    {
        tags.into_iter()
            .map(|(name, value)| Self::equals(name, value))
            .reduce(Self::and)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let query = TagQuery::equals("a", "1").or(TagQuery::equals("b", "2"));
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({
                "op": "or",
                "expr1": {"op": "equals", "expr1": "a", "expr2": "1"},
                "expr2": {"op": "equals", "expr1": "b", "expr2": "2"},
            })
        );

        let back: TagQuery = serde_json::from_value(serde_json::to_value(&query).unwrap()).unwrap();
        assert_eq!(back, query);
    }

    #[test]
    fn test_all_folds_left() {
        assert_eq!(TagQuery::all(Vec::<(String, String)>::new()), None);
        assert_eq!(TagQuery::all([("a", "1")]), Some(TagQuery::equals("a", "1")));

        let query = TagQuery::all([("a", "1"), ("b", "2"), ("c", "3")]).unwrap();
        assert_eq!(
            query,
            TagQuery::equals("a", "1")
                .and(TagQuery::equals("b", "2"))
                .and(TagQuery::equals("c", "3"))
        );
    }
}
