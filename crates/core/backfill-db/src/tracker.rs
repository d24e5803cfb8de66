//! Coverage tracking contract and the merge planning shared by its implementations

use std::future::Future;

use evm_schema::entities::{BackfilledRangeRecord, RangeMetadata};

use crate::{
    BlockInterval, CoverageSet, Error, InvalidRangeError, RangeConflictError, RangeKey, metadata,
    ranges::absorb_span,
};

/// Persistent record of which block ranges have been ingested.
///
/// For every [`RangeKey`] the stored intervals are ascending, disjoint and non-adjacent.
/// `record_completed` is atomic per key: concurrent calls for overlapping or adjacent intervals
/// never lose an update.
pub trait RangeStore: Send + Sync {
    /// Marks `interval` as ingested, merging it with every stored interval it overlaps or
    /// touches.
    ///
    /// Idempotent. Fails with [`Error::RangeConflict`] if the metadata of an absorbed interval
    /// is incompatible with `metadata` or with another absorbed interval; nothing is written in
    /// that case.
    fn record_completed(
        &self,
        key: &RangeKey,
        interval: BlockInterval,
        metadata: RangeMetadata,
    ) -> impl Future<Output = Result<RecordOutcome, Error>> + Send;

    /// Gaps of `window` that are not yet covered, ascending.
    fn missing_ranges(
        &self,
        key: &RangeKey,
        window: BlockInterval,
    ) -> impl Future<Output = Result<Vec<BlockInterval>, Error>> + Send;

    /// Every stored range of `key`, ascending.
    fn list_ranges(
        &self,
        key: &RangeKey,
    ) -> impl Future<Output = Result<Vec<BackfilledRangeRecord>, Error>> + Send;
}

/// Result of a successful `record_completed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    /// The stored interval that now covers the recorded one.
    pub covering: BlockInterval,
    /// Previously stored intervals merged into `covering`.
    pub absorbed: Vec<BlockInterval>,
    pub coverage_changed: bool,
    pub metadata_changed: bool,
}

/// Storage changes needed to record an interval.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordPlan {
    /// Already covered with the same metadata.
    Unchanged { covering: BackfilledRangeRecord },
    /// Already covered by `record`, whose metadata gains new entries.
    Refresh { record: BackfilledRangeRecord },
    /// `absorbed` are deleted and `record` is inserted in their place.
    Replace {
        absorbed: Vec<BackfilledRangeRecord>,
        record: BackfilledRangeRecord,
    },
}

impl RecordPlan {
    pub fn outcome(&self) -> Result<RecordOutcome, InvalidRangeError> {
        Ok(match self {
            Self::Unchanged { covering } => RecordOutcome {
                covering: record_interval(covering)?,
                absorbed: Vec::new(),
                coverage_changed: false,
                metadata_changed: false,
            },
            Self::Refresh { record } => RecordOutcome {
                covering: record_interval(record)?,
                absorbed: Vec::new(),
                coverage_changed: false,
                metadata_changed: true,
            },
            Self::Replace { absorbed, record } => RecordOutcome {
                covering: record_interval(record)?,
                absorbed: absorbed
                    .iter()
                    .map(record_interval)
                    .collect::<Result<_, _>>()?,
                coverage_changed: true,
                metadata_changed: true,
            },
        })
    }
}

pub fn record_interval(record: &BackfilledRangeRecord) -> Result<BlockInterval, InvalidRangeError> {
    BlockInterval::new(record.start_block, record.end_block)
}

/// Plans recording `interval` for `key` against the stored ranges of that key.
///
/// `stored` must be ascending and may be limited to the ranges touching `interval`.
pub fn plan_record(
    key: &RangeKey,
    stored: &[BackfilledRangeRecord],
    interval: BlockInterval,
    metadata: RangeMetadata,
) -> Result<RecordPlan, Error> {
    let intervals = stored
        .iter()
        .map(record_interval)
        .collect::<Result<Vec<_>, _>>()?;
    let span = absorb_span(&intervals, &interval);
    let absorbed = &stored[span.clone()];

    let covered_by = match absorbed {
        [container] if intervals[span.start].contains_interval(&interval) => Some(container),
        _ => None,
    };

    // Absorbed ranges are checked against each other as well as against the request.
    let mut merged_metadata = RangeMetadata::default();
    for (record, existing) in absorbed.iter().zip(&intervals[span.clone()]) {
        let reason = metadata::conflict(&merged_metadata, &record.metadata)
            .or_else(|| metadata::conflict(&record.metadata, &metadata))
            .or_else(|| {
                covered_by
                    .is_none()
                    .then(|| metadata::extension_conflict(&record.metadata, &metadata))
                    .flatten()
            });
        if let Some(reason) = reason {
            tracing::warn!(%key, %existing, requested = %interval, %reason, "backfill range conflict");
            return Err(RangeConflictError {
                key: key.to_string(),
                existing: *existing,
                requested: interval,
                reason,
            }
            .into());
        }
        merged_metadata = metadata::merge(&merged_metadata, &record.metadata);
    }
    let merged_metadata = metadata::merge(&merged_metadata, &metadata);

    if let Some(container) = covered_by {
        if merged_metadata == container.metadata {
            tracing::debug!(%key, %interval, "range already covered");
            return Ok(RecordPlan::Unchanged {
                covering: container.clone(),
            });
        }
        tracing::debug!(%key, %interval, "range already covered, refreshing metadata");
        return Ok(RecordPlan::Refresh {
            record: BackfilledRangeRecord {
                metadata: merged_metadata,
                ..container.clone()
            },
        });
    }

    let covering = intervals[span].iter().fold(interval, |acc, iv| acc.span(iv));
    tracing::debug!(%key, %interval, %covering, absorbed = absorbed.len(), "merging backfill range");

    Ok(RecordPlan::Replace {
        absorbed: absorbed.to_vec(),
        record: BackfilledRangeRecord {
            backfill_id: BackfilledRangeRecord::derive_id(
                key.network(),
                key.data_type(),
                covering.start(),
                covering.end(),
            ),
            data_type: key.data_type(),
            network: key.network(),
            filter: key.filter().cloned(),
            start_block: covering.start(),
            end_block: covering.end(),
            metadata: merged_metadata,
        },
    })
}

/// Gaps of `window` not covered by `stored`.
pub fn missing_in(
    stored: &[BackfilledRangeRecord],
    window: BlockInterval,
) -> Result<Vec<BlockInterval>, InvalidRangeError> {
    let set = stored
        .iter()
        .map(record_interval)
        .collect::<Result<CoverageSet, _>>()?;
    Ok(set.missing(window))
}

#[cfg(test)]
mod tests {
    use evm_schema::{BackfillDataType, SupportedNetwork};
    use pretty_assertions::assert_eq;

    use super::*;

    fn iv(start: u64, end: u64) -> BlockInterval {
        BlockInterval::new(start, end).expect("valid interval")
    }

    fn key() -> RangeKey {
        RangeKey::unfiltered(SupportedNetwork::Ethereum, BackfillDataType::Events)
    }

    fn record(start: u64, end: u64, abis: &[&str]) -> BackfilledRangeRecord {
        BackfilledRangeRecord {
            backfill_id: BackfilledRangeRecord::derive_id(
                SupportedNetwork::Ethereum,
                BackfillDataType::Events,
                start,
                end,
            ),
            data_type: BackfillDataType::Events,
            network: SupportedNetwork::Ethereum,
            filter: None,
            start_block: start,
            end_block: end,
            metadata: RangeMetadata {
                metadata: None,
                decoded_abis: (!abis.is_empty())
                    .then(|| abis.iter().map(|s| s.to_string()).collect()),
            },
        }
    }

    fn sourced(mut record: BackfilledRangeRecord, source: &str) -> BackfilledRangeRecord {
        record.metadata.metadata = serde_json::json!({ "source": source }).as_object().cloned();
        record
    }

    #[test]
    fn bridging_interval_absorbs_both_neighbours() {
        //* Given
        let stored = vec![record(0, 100, &[]), record(200, 300, &[])];

        //* When
        let plan = plan_record(&key(), &stored, iv(100, 200), RangeMetadata::default())
            .expect("plan should succeed");

        //* Then
        let outcome = plan.outcome().expect("outcome should build");
        assert_eq!(outcome.covering, iv(0, 300));
        assert_eq!(outcome.absorbed, vec![iv(0, 100), iv(200, 300)]);
        let RecordPlan::Replace { record: merged, .. } = plan else {
            panic!("expected a replacement");
        };
        assert_eq!(merged.backfill_id, "ethereum_events_0_300");
    }

    #[test]
    fn disjoint_interval_absorbs_nothing() {
        //* Given
        let stored = vec![record(0, 100, &[])];

        //* When
        let plan = plan_record(&key(), &stored, iv(101, 150), RangeMetadata::default())
            .expect("plan should succeed");

        //* Then
        let outcome = plan.outcome().expect("outcome should build");
        assert_eq!(outcome.covering, iv(101, 150));
        assert!(outcome.absorbed.is_empty());
        assert!(outcome.coverage_changed);
    }

    #[test]
    fn covered_interval_with_new_abis_refreshes_metadata() {
        //* Given
        let stored = vec![record(0, 100, &[])];
        let metadata = record(0, 1, &["erc20"]).metadata;

        //* When
        let plan = plan_record(&key(), &stored, iv(10, 20), metadata.clone())
            .expect("plan should succeed");

        //* Then
        assert_eq!(
            plan,
            RecordPlan::Refresh {
                record: BackfilledRangeRecord {
                    metadata,
                    ..record(0, 100, &[])
                }
            }
        );
    }

    #[test]
    fn touching_interval_with_other_abis_conflicts() {
        //* Given
        let stored = vec![record(0, 100, &["erc20"])];
        let requested = record(100, 200, &["erc721"]).metadata;

        //* When
        let result = plan_record(&key(), &stored, iv(100, 200), requested);

        //* Then
        assert!(matches!(result, Err(Error::RangeConflict(_))));
    }

    #[test]
    fn bridging_interval_between_incompatible_neighbours_conflicts() {
        //* Given
        let stored = vec![
            sourced(record(0, 100, &[]), "archive"),
            sourced(record(200, 300, &[]), "full"),
        ];

        //* When
        let result = plan_record(&key(), &stored, iv(100, 200), RangeMetadata::default());

        //* Then
        let conflict = match result {
            Err(Error::RangeConflict(conflict)) => conflict,
            other => panic!("expected a range conflict, got {other:?}"),
        };
        assert_eq!(conflict.existing, iv(200, 300));
        assert_eq!(conflict.requested, iv(100, 200));
    }

    #[test]
    fn undecoded_interval_cannot_extend_a_decoded_range() {
        //* Given
        let stored = vec![record(0, 100, &["erc20"])];

        //* When
        let result = plan_record(&key(), &stored, iv(50, 200), RangeMetadata::default());

        //* Then
        assert!(matches!(result, Err(Error::RangeConflict(_))));
    }

    #[test]
    fn decoded_interval_cannot_extend_an_undecoded_range() {
        //* Given
        let stored = vec![record(0, 100, &[])];
        let requested = record(100, 200, &["erc20"]).metadata;

        //* When
        let result = plan_record(&key(), &stored, iv(100, 200), requested);

        //* Then
        assert!(matches!(result, Err(Error::RangeConflict(_))));
    }

    #[test]
    fn covered_undecoded_interval_leaves_the_abis_alone() {
        //* Given
        let stored = vec![record(0, 100, &["erc20"])];

        //* When
        let plan = plan_record(&key(), &stored, iv(10, 20), RangeMetadata::default())
            .expect("plan should succeed");

        //* Then
        assert_eq!(
            plan,
            RecordPlan::Unchanged {
                covering: record(0, 100, &["erc20"])
            }
        );
    }

    #[test]
    fn missing_in_clips_to_the_window() {
        //* Given
        let stored = vec![record(0, 100, &[]), record(150, 200, &[])];

        //* When
        let missing = missing_in(&stored, iv(50, 175)).expect("stored ranges are valid");

        //* Then
        assert_eq!(missing, vec![iv(100, 150)]);
    }
}
