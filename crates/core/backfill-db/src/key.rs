use std::fmt;

use evm_schema::{BackfillDataType, SupportedNetwork, entities::BackfillFilter};

/// Identity of an independently tracked coverage set.
///
/// Ranges recorded under different keys never merge. An empty filter is the same key as no
/// filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RangeKey {
    network: SupportedNetwork,
    data_type: BackfillDataType,
    filter: Option<BackfillFilter>,
}

impl RangeKey {
    pub fn new(
        network: SupportedNetwork,
        data_type: BackfillDataType,
        filter: Option<BackfillFilter>,
    ) -> Self {
        Self {
            network,
            data_type,
            filter: filter.filter(|f| !f.is_empty()),
        }
    }

    /// Key without a filter.
    pub fn unfiltered(network: SupportedNetwork, data_type: BackfillDataType) -> Self {
        Self::new(network, data_type, None)
    }

    pub fn network(&self) -> SupportedNetwork {
        self.network
    }

    pub fn data_type(&self) -> BackfillDataType {
        self.data_type
    }

    pub fn filter(&self) -> Option<&BackfillFilter> {
        self.filter.as_ref()
    }

    /// Stored filter discriminator.
    pub fn filter_key(&self) -> String {
        BackfillFilter::key_of(self.filter.as_ref())
    }
}

impl fmt::Display for RangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.data_type)?;
        if let Some(filter) = &self.filter {
            write!(f, "/{}", filter.canonical_key())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use evm_schema::entities::FilterValue;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_filter_is_the_unfiltered_key() {
        //* Given
        let unfiltered = RangeKey::unfiltered(SupportedNetwork::Ethereum, BackfillDataType::Blocks);

        //* When
        let empty = RangeKey::new(
            SupportedNetwork::Ethereum,
            BackfillDataType::Blocks,
            Some(BackfillFilter::new()),
        );

        //* Then
        assert_eq!(empty, unfiltered);
        assert_eq!(empty.filter_key(), "");
    }

    #[test]
    fn display_includes_canonical_filter() {
        //* Given
        let key = RangeKey::new(
            SupportedNetwork::Ethereum,
            BackfillDataType::Events,
            Some(BackfillFilter::new().with("abi_name", FilterValue::Text("ERC20".into()))),
        );

        //* Then
        assert_eq!(key.to_string(), r#"ethereum/events/{"abi_name":"ERC20"}"#);
    }
}
