//! Call-tree positions

use std::{fmt, str::FromStr};

use crate::{Canonical, EncodingError, EncodingPolicy, StorageValue};

/// Position of a call within a transaction's call tree.
///
/// `[]` is the top-level call, `[0, 1, 2]` the third sub-call of the second sub-call of the
/// first sub-call. The canonical text form is the bracketed, comma separated list without
/// whitespace. It is text under both encoding policies.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceAddress(Vec<u64>);

impl TraceAddress {
    /// The top-level call.
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(path: Vec<u64>) -> Self {
        Self(path)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// The address of the `index`-th sub-call of this call.
    pub fn child(&self, index: u64) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }

    /// The address of the calling frame, `None` for the top-level call.
    pub fn parent(&self) -> Option<Self> {
        let (_, parent) = self.0.split_last()?;
        Some(Self(parent.to_vec()))
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<u64> {
        self.0
    }
}

impl From<Vec<u64>> for TraceAddress {
    fn from(path: Vec<u64>) -> Self {
        Self(path)
    }
}

impl std::ops::Deref for TraceAddress {
    type Target = [u64];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for TraceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{index}")?;
        }
        f.write_str("]")
    }
}

impl FromStr for TraceAddress {
    type Err = EncodingError;

    /// Parses the bracketed form. Whitespace around elements is tolerated so that lists
    /// rendered as `[0, 1, 2]` are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| EncodingError::InvalidTraceAddress {
            input: s.to_string(),
            reason,
        };

        let inner = s
            .trim()
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| invalid("expected a bracketed list"))?;

        if inner.trim().is_empty() {
            return Ok(Self::root());
        }

        inner
            .split(',')
            .map(|element| {
                let element = element.trim();
                if element.is_empty() {
                    return Err(invalid("empty element"));
                }
                if !element.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid("elements must be non-negative integers"));
                }
                element
                    .parse::<u64>()
                    .map_err(|_| invalid("element out of range"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl Canonical for TraceAddress {
    const PRIMITIVE: &'static str = "trace_address";

    fn encode(&self, _policy: EncodingPolicy) -> StorageValue {
        StorageValue::Text(self.to_string())
    }

    fn decode(value: &StorageValue) -> Result<Self, EncodingError> {
        match value {
            StorageValue::Text(s) => s.parse(),
            StorageValue::Binary(b) => std::str::from_utf8(b)
                .map_err(|_| EncodingError::InvalidUtf8 {
                    primitive: Self::PRIMITIVE,
                })?
                .parse(),
        }
    }
}

impl serde::Serialize for TraceAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for TraceAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = <String as serde::Deserialize>::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn root_roundtrips_as_empty_brackets() {
        //* Given
        let root = TraceAddress::root();

        //* When
        let encoded = root.encode(EncodingPolicy::Textual);

        //* Then
        assert_eq!(encoded, StorageValue::Text("[]".to_string()));
        assert_eq!(TraceAddress::decode(&encoded).expect("decode"), root);
    }

    #[test]
    fn nested_path_roundtrips_exactly() {
        //* Given
        let path = TraceAddress::new(vec![0, 1, 2]);

        //* When
        let encoded = path.encode(EncodingPolicy::Binary);

        //* Then
        assert_eq!(encoded, StorageValue::Text("[0,1,2]".to_string()));
        assert_eq!(TraceAddress::decode(&encoded).expect("decode"), path);
    }

    #[test]
    fn spaced_form_parses_to_the_same_path() {
        //* When
        let parsed: TraceAddress = "[0, 1, 2]".parse().expect("spaced list should parse");

        //* Then
        assert_eq!(parsed, TraceAddress::new(vec![0, 1, 2]));
        assert_eq!(parsed.to_string(), "[0,1,2]");
    }

    #[test]
    fn equality_includes_length() {
        //* Then
        assert_ne!(TraceAddress::new(vec![0]), TraceAddress::new(vec![0, 0]));
        assert_ne!(TraceAddress::root(), TraceAddress::new(vec![0]));
    }

    #[test]
    fn malformed_input_is_rejected() {
        //* Then
        for input in ["0,1", "[0,,1]", "[-1]", "[a]", "[0,1", "[1.5]"] {
            assert!(
                matches!(
                    input.parse::<TraceAddress>(),
                    Err(EncodingError::InvalidTraceAddress { .. })
                ),
                "expected {input:?} to be rejected"
            );
        }
    }

    #[test]
    fn parent_and_child_navigate_the_call_tree() {
        //* Given
        let call = TraceAddress::root().child(1).child(3);

        //* Then
        assert_eq!(call.to_string(), "[1,3]");
        assert_eq!(call.parent(), Some(TraceAddress::new(vec![1])));
        assert_eq!(TraceAddress::root().parent(), None);
    }

    #[test]
    fn serde_uses_canonical_string() {
        //* Given
        let path = TraceAddress::new(vec![4, 2]);

        //* When
        let json = serde_json::to_string(&path).expect("serialize");
        let back: TraceAddress = serde_json::from_str(&json).expect("deserialize");

        //* Then
        assert_eq!(json, "\"[4,2]\"");
        assert_eq!(back, path);
    }
}
