//! Coverage tracking against the in-memory store

use std::sync::Arc;

use backfill_db::{
    AbiRegistry, BlockInterval, Error, MemoryAbiRegistry, MemoryRangeStore, RangeKey,
    RangeStore,
};
use evm_schema::{
    BackfillDataType, SupportedNetwork, VmTag,
    entities::{ContractAbi, RangeMetadata},
};
use pretty_assertions::assert_eq;

fn iv(start: u64, end: u64) -> BlockInterval {
    BlockInterval::new(start, end).expect("valid interval")
}

fn eth_blocks() -> RangeKey {
    RangeKey::unfiltered(SupportedNetwork::Ethereum, BackfillDataType::Blocks)
}

fn with_meta(pairs: serde_json::Value) -> RangeMetadata {
    RangeMetadata {
        metadata: pairs.as_object().cloned(),
        decoded_abis: None,
    }
}

async fn intervals(store: &MemoryRangeStore, key: &RangeKey) -> Vec<BlockInterval> {
    store
        .list_ranges(key)
        .await
        .expect("Failed to list ranges")
        .iter()
        .map(|r| iv(r.start_block, r.end_block))
        .collect()
}

#[tokio::test]
async fn two_workers_complete_a_window_without_redoing_blocks() {
    //* Given
    let store = MemoryRangeStore::new();
    let key = eth_blocks();
    let window = iv(0, 1_000);

    //* When
    let first_view = store
        .missing_ranges(&key, window)
        .await
        .expect("Failed to query missing ranges");
    store
        .record_completed(&key, iv(0, 500), RangeMetadata::default())
        .await
        .expect("Failed to record range");
    let second_view = store
        .missing_ranges(&key, window)
        .await
        .expect("Failed to query missing ranges");
    store
        .record_completed(&key, iv(500, 1_000), RangeMetadata::default())
        .await
        .expect("Failed to record range");
    let final_view = store
        .missing_ranges(&key, window)
        .await
        .expect("Failed to query missing ranges");

    //* Then
    assert_eq!(first_view, vec![iv(0, 1_000)]);
    assert_eq!(second_view, vec![iv(500, 1_000)]);
    assert!(final_view.is_empty());
    assert_eq!(intervals(&store, &key).await, vec![iv(0, 1_000)]);
}

#[tokio::test]
async fn overlapping_and_adjacent_records_coalesce() {
    //* Given
    let store = MemoryRangeStore::new();
    let key = eth_blocks();

    //* When
    store
        .record_completed(&key, iv(0, 100), RangeMetadata::default())
        .await
        .expect("Failed to record range");
    store
        .record_completed(&key, iv(100, 200), RangeMetadata::default())
        .await
        .expect("Failed to record range");
    let outcome = store
        .record_completed(&key, iv(50, 150), RangeMetadata::default())
        .await
        .expect("Failed to record range");

    //* Then
    assert_eq!(intervals(&store, &key).await, vec![iv(0, 200)]);
    assert!(!outcome.coverage_changed);
    assert_eq!(outcome.covering, iv(0, 200));
}

#[tokio::test]
async fn gap_between_ranges_is_reported_missing() {
    //* Given
    let store = MemoryRangeStore::new();
    let key = eth_blocks();
    for interval in [iv(0, 100), iv(150, 200)] {
        store
            .record_completed(&key, interval, RangeMetadata::default())
            .await
            .expect("Failed to record range");
    }

    //* When
    let missing = store
        .missing_ranges(&key, iv(0, 200))
        .await
        .expect("Failed to query missing ranges");

    //* Then
    assert_eq!(missing, vec![iv(100, 150)]);
}

#[tokio::test]
async fn recording_twice_is_idempotent() {
    //* Given
    let store = MemoryRangeStore::new();
    let key = eth_blocks();
    let meta = with_meta(serde_json::json!({"job": "nightly"}));
    store
        .record_completed(&key, iv(10, 20), meta.clone())
        .await
        .expect("Failed to record range");
    let before = store.list_ranges(&key).await.expect("Failed to list ranges");

    //* When
    let outcome = store
        .record_completed(&key, iv(10, 20), meta)
        .await
        .expect("Failed to record range");

    //* Then
    assert!(!outcome.coverage_changed);
    assert!(!outcome.metadata_changed);
    assert_eq!(
        store.list_ranges(&key).await.expect("Failed to list ranges"),
        before
    );
}

#[tokio::test]
async fn conflicting_metadata_fails_and_keeps_coverage() {
    monitoring::logging::init();

    //* Given
    let store = MemoryRangeStore::new();
    let key = eth_blocks();
    store
        .record_completed(&key, iv(0, 100), with_meta(serde_json::json!({"source": "archive"})))
        .await
        .expect("Failed to record range");

    //* When
    let result = store
        .record_completed(&key, iv(50, 150), with_meta(serde_json::json!({"source": "light"})))
        .await;

    //* Then
    let conflict = match result {
        Err(Error::RangeConflict(conflict)) => conflict,
        other => panic!("expected a range conflict, got {other:?}"),
    };
    assert_eq!(conflict.existing, iv(0, 100));
    assert_eq!(conflict.requested, iv(50, 150));
    assert_eq!(intervals(&store, &key).await, vec![iv(0, 100)]);
}

#[tokio::test]
async fn bridging_incompatible_neighbours_fails_and_keeps_them_apart() {
    //* Given
    let store = MemoryRangeStore::new();
    let key = eth_blocks();
    let archive = RangeMetadata {
        decoded_abis: Some(vec!["ERC20".to_string()]),
        ..with_meta(serde_json::json!({"source": "archive"}))
    };
    let full = RangeMetadata {
        decoded_abis: Some(vec!["ERC721".to_string()]),
        ..with_meta(serde_json::json!({"source": "full"}))
    };
    for (interval, metadata) in [(iv(0, 100), archive), (iv(200, 300), full)] {
        store
            .record_completed(&key, interval, metadata)
            .await
            .expect("Failed to record range");
    }

    //* When
    let result = store
        .record_completed(&key, iv(100, 200), RangeMetadata::default())
        .await;

    //* Then
    assert!(matches!(result, Err(Error::RangeConflict(_))));
    assert_eq!(
        intervals(&store, &key).await,
        vec![iv(0, 100), iv(200, 300)]
    );
}

#[tokio::test]
async fn undecoded_blocks_never_extend_a_decoded_range() {
    //* Given
    let store = MemoryRangeStore::new();
    let key = eth_blocks();
    let decoded = RangeMetadata {
        metadata: None,
        decoded_abis: Some(vec!["ERC20".to_string()]),
    };
    store
        .record_completed(&key, iv(0, 100), decoded.clone())
        .await
        .expect("Failed to record range");

    //* When
    let result = store
        .record_completed(&key, iv(50, 200), RangeMetadata::default())
        .await;

    //* Then
    assert!(matches!(result, Err(Error::RangeConflict(_))));
    let ranges = store.list_ranges(&key).await.expect("Failed to list ranges");
    assert_eq!(ranges.len(), 1);
    assert_eq!((ranges[0].start_block, ranges[0].end_block), (0, 100));
    assert_eq!(ranges[0].metadata, decoded);
}

#[tokio::test]
async fn keys_never_share_coverage() {
    //* Given
    let store = MemoryRangeStore::new();
    let blocks = eth_blocks();
    let traces = RangeKey::unfiltered(SupportedNetwork::Ethereum, BackfillDataType::Traces);
    let starknet = RangeKey::unfiltered(SupportedNetwork::Starknet, BackfillDataType::Blocks);

    //* When
    store
        .record_completed(&blocks, iv(0, 100), RangeMetadata::default())
        .await
        .expect("Failed to record range");

    //* Then
    for other in [&traces, &starknet] {
        let missing = store
            .missing_ranges(other, iv(0, 100))
            .await
            .expect("Failed to query missing ranges");
        assert_eq!(missing, vec![iv(0, 100)]);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_workers_leave_disjoint_merged_coverage() {
    monitoring::logging::init();

    //* Given
    let store = Arc::new(MemoryRangeStore::new());
    let key = eth_blocks();

    //* When
    let tasks = (0..64u64)
        .rev()
        .map(|i| {
            let store = Arc::clone(&store);
            let key = key.clone();
            tokio::spawn(async move {
                // Every other chunk overlaps its neighbour by 5 blocks
                let start = (i * 50).saturating_sub(if i % 2 == 0 { 5 } else { 0 });
                store
                    .record_completed(&key, iv(start, (i + 1) * 50), RangeMetadata::default())
                    .await
            })
        })
        .collect::<Vec<_>>();
    for task in tasks {
        task.await
            .expect("Task panicked")
            .expect("Failed to record range");
    }

    //* Then
    assert_eq!(intervals(&store, &key).await, vec![iv(0, 3_200)]);
}

#[tokio::test]
async fn abi_registry_lists_by_priority_then_name() {
    //* Given
    let registry = MemoryAbiRegistry::new();
    let abi = |name: &str, priority: i64| ContractAbi {
        abi_name: name.to_string(),
        abi_json: vec![serde_json::json!({"type": "function", "name": "transfer"})],
        priority,
        vm_tag: VmTag::Evm,
    };
    for (name, priority) in [("weth", 0), ("usdc", 20), ("erc20", 20), ("erc721", 10)] {
        registry
            .upsert_abi(&abi(name, priority))
            .await
            .expect("Failed to upsert abi");
    }

    //* When
    let removed = registry
        .delete_abi("erc721")
        .await
        .expect("Failed to delete abi");
    let names = registry
        .list_abis()
        .await
        .expect("Failed to list abis")
        .into_iter()
        .map(|abi| abi.abi_name)
        .collect::<Vec<_>>();

    //* Then
    assert!(removed);
    assert_eq!(names, ["erc20", "usdc", "weth"]);
}
