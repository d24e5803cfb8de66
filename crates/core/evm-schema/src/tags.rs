//! Closed enumerations stored as canonical text tags
//!
//! Tags are parsed case-insensitively. A stored tag that names no variant is a hard error
//! ([`UnknownEnumValueError`]), never mapped to a fallback.

use crate::UnknownEnumValueError;

macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident, kind = $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $tag:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Stored tag of this variant
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $tag ),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownEnumValueError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( s if s.eq_ignore_ascii_case($tag) => Ok(Self::$variant), )+
                    _ => Err(UnknownEnumValueError {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

closed_enum! {
    /// Virtual machine a contract ABI targets.
    VmTag, kind = "vm tag" {
        Evm => "EVM",
        Cairo => "Cairo",
    }
}

closed_enum! {
    /// Kind of chain data a backfill produced.
    BackfillDataType, kind = "backfill data type" {
        Blocks => "blocks",
        /// Blocks together with their transactions.
        FullBlocks => "full_blocks",
        Transactions => "transactions",
        Traces => "traces",
        Events => "events",
        Erc20Transfers => "erc20_transfers",
    }
}

closed_enum! {
    /// Chains the pipeline can ingest.
    SupportedNetwork, kind = "network" {
        Ethereum => "ethereum",
        Starknet => "starknet",
        ZkSyncEra => "zk_sync_era",
    }
}

impl BackfillDataType {
    /// Entity tables a backfill of this type writes to.
    pub fn entity_names(&self) -> &'static [&'static str] {
        match self {
            Self::Blocks => &["blocks"],
            Self::FullBlocks => &["blocks", "transactions"],
            Self::Transactions => &["transactions"],
            Self::Traces => &["traces"],
            Self::Events => &["default_events"],
            Self::Erc20Transfers => &["erc20_transfers"],
        }
    }
}

impl Default for VmTag {
    fn default() -> Self {
        Self::Evm
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn tags_parse_case_insensitively() {
        //* Then
        assert_eq!("evm".parse::<VmTag>(), Ok(VmTag::Evm));
        assert_eq!("CAIRO".parse::<VmTag>(), Ok(VmTag::Cairo));
        assert_eq!(
            "Full_Blocks".parse::<BackfillDataType>(),
            Ok(BackfillDataType::FullBlocks)
        );
    }

    #[test]
    fn every_variant_roundtrips_through_its_tag() {
        //* Then
        for network in SupportedNetwork::ALL {
            assert_eq!(network.as_str().parse::<SupportedNetwork>(), Ok(*network));
        }
        for data_type in BackfillDataType::ALL {
            assert_eq!(data_type.to_string().parse::<BackfillDataType>(), Ok(*data_type));
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        //* When
        let result = "solana".parse::<SupportedNetwork>();

        //* Then
        assert_eq!(
            result,
            Err(UnknownEnumValueError {
                kind: "network",
                value: "solana".to_string(),
            })
        );
    }

    #[test]
    fn serde_uses_canonical_tag() {
        //* When
        let json = serde_json::to_string(&VmTag::Evm).expect("serialize");
        let unknown = serde_json::from_str::<VmTag>("\"wasm\"");

        //* Then
        assert_eq!(json, "\"EVM\"");
        assert!(unknown.is_err());
    }
}
