//! Physical storage layout selection

/// How byte-oriented primitives are physically laid out in storage.
///
/// This is chosen once when the system is initialized (see the ingestion config) and applies
/// to every encoded value. It is a physical-layout decision only: both layouts decode to the
/// same primitives.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingPolicy {
    /// Lowercase `0x`-prefixed hex strings (portable to any text column).
    #[default]
    Textual,
    /// Raw byte arrays (`BYTEA`, fixed-size binary columns).
    Binary,
}

impl EncodingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Textual => "textual",
            Self::Binary => "binary",
        }
    }
}

impl std::fmt::Display for EncodingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
