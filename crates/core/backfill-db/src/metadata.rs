//! Compatibility and merging of range metadata

use std::collections::BTreeSet;

use evm_schema::entities::RangeMetadata;

/// Why two metadata values cannot describe one merged range.
pub fn conflict(existing: &RangeMetadata, requested: &RangeMetadata) -> Option<String> {
    if let (Some(stored), Some(new)) = (&existing.decoded_abis, &requested.decoded_abis) {
        let stored = stored.iter().collect::<BTreeSet<_>>();
        let new = new.iter().collect::<BTreeSet<_>>();
        if stored != new {
            return Some(format!(
                "decoded with ABIs {stored:?}, requested {new:?}"
            ));
        }
    }

    if let (Some(stored), Some(new)) = (&existing.metadata, &requested.metadata) {
        let differing = new
            .iter()
            .filter_map(|(key, value)| Some((key, stored.get(key)?, value)))
            .find(|(_, stored_value, value)| stored_value != value);
        if let Some((key, stored_value, value)) = differing {
            return Some(format!(
                "metadata key {key:?} is {stored_value}, requested {value}"
            ));
        }
    }

    None
}

/// Why `existing` and `requested` cannot be joined into a range wider than either.
///
/// A merged range claims its ABI list for every block, so the list must be present on both
/// sides or on neither.
pub fn extension_conflict(existing: &RangeMetadata, requested: &RangeMetadata) -> Option<String> {
    match (&existing.decoded_abis, &requested.decoded_abis) {
        (Some(stored), None) => Some(format!(
            "decoded with ABIs {stored:?}, requested blocks are not decoded"
        )),
        (None, Some(new)) => Some(format!(
            "blocks are not decoded, requested ABIs {new:?}"
        )),
        _ => None,
    }
}

/// Union of two compatible metadata values. Keys present in `newer` take its values.
pub fn merge(older: &RangeMetadata, newer: &RangeMetadata) -> RangeMetadata {
    let metadata = match (&older.metadata, &newer.metadata) {
        (Some(old), Some(new)) => {
            let mut merged = old.clone();
            merged.extend(new.iter().map(|(k, v)| (k.clone(), v.clone())));
            Some(merged)
        }
        (old, new) => new.clone().or_else(|| old.clone()),
    };

    let decoded_abis = match (&older.decoded_abis, &newer.decoded_abis) {
        (Some(old), Some(new)) => {
            let mut abis = old.clone();
            abis.extend(new.iter().filter(|abi| !old.contains(abi)).cloned());
            Some(abis)
        }
        (old, new) => new.clone().or_else(|| old.clone()),
    };

    RangeMetadata {
        metadata,
        decoded_abis,
    }
}
