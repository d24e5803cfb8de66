//! In-tree DB integration tests for the contract ABI registry

use evm_codec::EncodingPolicy;
use evm_schema::{VmTag, entities::ContractAbi};
use pgtemp::PgTempDB;
use pretty_assertions::assert_eq;

use crate::{AbiRegistry, BackfillDb, DEFAULT_POOL_SIZE};

fn abi(name: &str, priority: i64) -> ContractAbi {
    ContractAbi {
        abi_name: name.to_string(),
        abi_json: vec![serde_json::json!({
            "type": "event",
            "name": "Transfer",
            "inputs": [
                {"name": "from", "type": "address", "indexed": true},
                {"name": "to", "type": "address", "indexed": true},
                {"name": "value", "type": "uint256", "indexed": false},
            ],
        })],
        priority,
        vm_tag: VmTag::Evm,
    }
}

#[tokio::test]
async fn upsert_then_get_returns_the_stored_abi() {
    //* Given
    let temp_db = PgTempDB::new();
    let db = BackfillDb::connect_with_retry(
        &temp_db.connection_uri(),
        DEFAULT_POOL_SIZE,
        EncodingPolicy::Textual,
    )
    .await
    .expect("Failed to connect to backfill db");

    //* When
    db.upsert_abi(&abi("erc20", 10))
        .await
        .expect("Failed to upsert abi");

    //* Then
    let stored = db
        .get_abi("erc20")
        .await
        .expect("Failed to get abi")
        .expect("ABI not found");
    assert_eq!(stored, abi("erc20", 10));
    assert_eq!(db.get_abi("erc721").await.expect("Failed to get abi"), None);
}

#[tokio::test]
async fn upsert_replaces_an_existing_abi() {
    //* Given
    let temp_db = PgTempDB::new();
    let db = BackfillDb::connect_with_retry(
        &temp_db.connection_uri(),
        DEFAULT_POOL_SIZE,
        EncodingPolicy::Textual,
    )
    .await
    .expect("Failed to connect to backfill db");
    db.upsert_abi(&abi("erc20", 10))
        .await
        .expect("Failed to upsert abi");

    //* When
    let replacement = ContractAbi {
        vm_tag: VmTag::Cairo,
        ..abi("erc20", 99)
    };
    db.upsert_abi(&replacement)
        .await
        .expect("Failed to upsert abi");

    //* Then
    let all = db.list_abis().await.expect("Failed to list abis");
    assert_eq!(all, vec![replacement]);
}

#[tokio::test]
async fn list_orders_by_priority_then_name() {
    //* Given
    let temp_db = PgTempDB::new();
    let db = BackfillDb::connect_with_retry(
        &temp_db.connection_uri(),
        DEFAULT_POOL_SIZE,
        EncodingPolicy::Textual,
    )
    .await
    .expect("Failed to connect to backfill db");
    for (name, priority) in [("weth", 0), ("erc20", 10), ("uniswap_v2_pair", 10), ("erc721", 5)] {
        db.upsert_abi(&abi(name, priority))
            .await
            .expect("Failed to upsert abi");
    }

    //* When
    let names = db
        .list_abis()
        .await
        .expect("Failed to list abis")
        .into_iter()
        .map(|abi| abi.abi_name)
        .collect::<Vec<_>>();

    //* Then
    assert_eq!(names, ["erc20", "uniswap_v2_pair", "erc721", "weth"]);
}

#[tokio::test]
async fn delete_reports_whether_an_abi_was_removed() {
    //* Given
    let temp_db = PgTempDB::new();
    let db = BackfillDb::connect_with_retry(
        &temp_db.connection_uri(),
        DEFAULT_POOL_SIZE,
        EncodingPolicy::Textual,
    )
    .await
    .expect("Failed to connect to backfill db");
    db.upsert_abi(&abi("erc20", 10))
        .await
        .expect("Failed to upsert abi");

    //* When
    let first = db.delete_abi("erc20").await.expect("Failed to delete abi");
    let second = db.delete_abi("erc20").await.expect("Failed to delete abi");

    //* Then
    assert!(first);
    assert!(!second);
    assert_eq!(db.get_abi("erc20").await.expect("Failed to get abi"), None);
}
