use std::{collections::BTreeMap, sync::LazyLock};

use evm_codec::CanonicalEncoder;

use super::INTERNAL_NAMESPACE;
use crate::{
    BackfillDataType, Entity, EntitySchema, FieldDef, FieldType, Row, RowReader, RowWriter,
    SchemaValidationError, SupportedNetwork,
};

static SCHEMA: LazyLock<EntitySchema> = LazyLock::new(schema);

pub const TABLE_NAME: &str = "backfilled_ranges";

fn schema() -> EntitySchema {
    EntitySchema::new(
        INTERNAL_NAMESPACE,
        TABLE_NAME,
        vec![
            FieldDef::new("backfill_id", FieldType::Text, false),
            FieldDef::new("data_type", FieldType::Text, false),
            FieldDef::new("network", FieldType::Text, false),
            FieldDef::new("filter_key", FieldType::Text, false),
            FieldDef::new("start_block", FieldType::BlockNumber, false),
            FieldDef::new("end_block", FieldType::BlockNumber, false),
            FieldDef::new("filter_data", FieldType::Json, true),
            FieldDef::new("metadata", FieldType::Json, true),
            FieldDef::new("decoded_abis", FieldType::Json, true),
        ],
        vec![
            "data_type",
            "network",
            "filter_key",
            "start_block",
            "end_block",
        ],
    )
}

/// A single filter value: backfill filters only ever hold strings and integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Int(i64),
    Text(String),
}

impl From<FilterValue> for serde_json::Value {
    fn from(value: FilterValue) -> Self {
        match value {
            FilterValue::Int(v) => v.into(),
            FilterValue::Text(s) => s.into(),
        }
    }
}

/// Parameters that narrowed a backfill, e.g. a contract address or an ABI name.
///
/// Ranges recorded under different filters are tracked independently.
#[derive(
    Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct BackfillFilter(BTreeMap<String, FilterValue>);

impl BackfillFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: FilterValue) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.clone().into()))
                .collect(),
        )
    }

    /// Stable discriminator: compact JSON with keys in ascending order.
    pub fn canonical_key(&self) -> String {
        self.to_json().to_string()
    }

    /// Discriminator of an optional filter; the unfiltered key is the empty string.
    pub fn key_of(filter: Option<&Self>) -> String {
        filter.map(Self::canonical_key).unwrap_or_default()
    }
}

impl FromIterator<(String, FilterValue)> for BackfillFilter {
    fn from_iter<I: IntoIterator<Item = (String, FilterValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Bookkeeping attached to a completed range.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RangeMetadata {
    /// Free-form key/value pairs supplied by the backfill job.
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    /// Names of the ABIs the range was decoded with.
    pub decoded_abis: Option<Vec<String>>,
}

impl RangeMetadata {
    pub fn is_empty(&self) -> bool {
        self.metadata.as_ref().is_none_or(|m| m.is_empty())
            && self.decoded_abis.as_ref().is_none_or(|a| a.is_empty())
    }
}

/// Persisted form of one tracked interval `[start_block, end_block)`.
#[derive(Debug, Clone, PartialEq)]
pub struct BackfilledRangeRecord {
    pub backfill_id: String,
    pub data_type: BackfillDataType,
    pub network: SupportedNetwork,
    pub filter: Option<BackfillFilter>,
    pub start_block: u64,
    pub end_block: u64,
    pub metadata: RangeMetadata,
}

impl BackfilledRangeRecord {
    /// Deterministic id for a range, so that merged ranges are re-keyed reproducibly.
    pub fn derive_id(
        network: SupportedNetwork,
        data_type: BackfillDataType,
        start_block: u64,
        end_block: u64,
    ) -> String {
        format!("{network}_{data_type}_{start_block}_{end_block}")
    }

    pub fn filter_key(&self) -> String {
        BackfillFilter::key_of(self.filter.as_ref())
    }
}

impl Entity for BackfilledRangeRecord {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }

    fn to_row(&self, encoder: &CanonicalEncoder) -> Result<Row, SchemaValidationError> {
        let mut w = RowWriter::new(&SCHEMA, encoder);
        w.text(&self.backfill_id);
        w.text(self.data_type.as_str());
        w.text(self.network.as_str());
        w.text(self.filter_key());
        w.u64(self.start_block)?;
        w.u64(self.end_block)?;
        w.json_opt(self.filter.as_ref().map(BackfillFilter::to_json));
        w.json_opt(self.metadata.metadata.clone().map(serde_json::Value::Object));
        w.json_opt(
            self.metadata
                .decoded_abis
                .as_ref()
                .map(|abis| abis.iter().cloned().map(serde_json::Value::from).collect()),
        );
        w.finish()
    }

    fn from_row(row: &Row) -> Result<Self, SchemaValidationError> {
        let r = RowReader::new(&SCHEMA, row)?;
        let data_type = r.text("data_type")?;
        let network = r.text("network")?;

        Ok(Self {
            backfill_id: r.text("backfill_id")?,
            data_type: data_type
                .parse()
                .map_err(|source| SchemaValidationError::UnknownEnumValue {
                    entity: TABLE_NAME,
                    field: "data_type",
                    source,
                })?,
            network: network
                .parse()
                .map_err(|source| SchemaValidationError::UnknownEnumValue {
                    entity: TABLE_NAME,
                    field: "network",
                    source,
                })?,
            filter: r.json_as("filter_data")?,
            start_block: r.u64("start_block")?,
            end_block: r.u64("end_block")?,
            metadata: RangeMetadata {
                metadata: r.json_as("metadata")?,
                decoded_abis: r.json_as("decoded_abis")?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn canonical_key_is_independent_of_insertion_order() {
        //* Given
        let a = BackfillFilter::new()
            .with("contract_address", FilterValue::Text("0xabc".to_string()))
            .with("from_block", FilterValue::Int(10));
        let b = BackfillFilter::new()
            .with("from_block", FilterValue::Int(10))
            .with("contract_address", FilterValue::Text("0xabc".to_string()));

        //* Then
        assert_eq!(a.canonical_key(), b.canonical_key());
        assert_eq!(
            a.canonical_key(),
            r#"{"contract_address":"0xabc","from_block":10}"#
        );
        assert_eq!(BackfillFilter::key_of(None), "");
    }

    #[test]
    fn record_row_roundtrips_filter_and_metadata() {
        //* Given
        let record = BackfilledRangeRecord {
            backfill_id: "ethereum_events_0_100".to_string(),
            data_type: BackfillDataType::Events,
            network: SupportedNetwork::Ethereum,
            filter: Some(BackfillFilter::new().with("abi", FilterValue::Text("ERC20".into()))),
            start_block: 0,
            end_block: 100,
            metadata: RangeMetadata {
                metadata: Some(serde_json::Map::from_iter([(
                    "source".to_string(),
                    serde_json::json!("archive"),
                )])),
                decoded_abis: Some(vec!["ERC20".to_string()]),
            },
        };
        let encoder = CanonicalEncoder::default();

        //* When
        let row = record.to_row(&encoder).expect("row should build");
        let back = BackfilledRangeRecord::from_row(&row).expect("row should read back");

        //* Then
        assert_eq!(back, record);
        BackfilledRangeRecord::schema()
            .validate(&row, &encoder)
            .expect("row should validate");
    }
}
