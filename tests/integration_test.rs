//! Integration tests for the relayer state store
//!
//! Run with: cargo test --test integration_test -- --ignored --nocapture
//!
//! Prerequisites:
//! - DATABASE_URL set, pointing at a Postgres the tests may write to
//!
//! These tests exercise the persisted state machines the way the trackers
//! and executors do: the unconditional error requeue, the idempotent
//! QUERIED→PENDING promotion, terminal-state protection on replay, and
//! watermark persistence.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::{SystemTime, UNIX_EPOCH};

mod helpers {
    use super::*;

    /// Test configuration loaded from environment variables
    pub struct TestConfig {
        pub database_url: String,
    }

    impl TestConfig {
        pub fn from_env() -> Option<Self> {
            Some(TestConfig {
                database_url: std::env::var("DATABASE_URL").ok()?,
            })
        }
    }

    pub async fn connect(config: &TestConfig) -> PgPool {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&config.database_url)
            .await
            .expect("Failed to connect to test database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    /// Unique salt per test invocation so reruns never collide
    pub fn unique_salt(tag: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos() as u64;
        format!("0x{:016x}{:>48}", nanos, tag).replace(' ', "0")
    }

    pub async fn insert_asset(pool: &PgPool, salt: &str) -> i64 {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO asset_infos (asset_kind, name, symbol, decimals, total_supply, owner,
                salt, token_mint_chain_id, fee_payment_chain_id, total_gas_fee_wei)
            VALUES ('token', 'Test Token', 'TST', 18, '1000000000000000000000',
                '0x00000000000000000000000000000000000000aa', $1, 56, 56, '5000000000000000')
            RETURNING id
            "#,
        )
        .bind(salt)
        .fetch_one(pool)
        .await
        .expect("Failed to insert asset info");

        row.0
    }

    pub async fn insert_network(
        pool: &PgPool,
        asset_id: i64,
        chain_id: i64,
        deploy_kind: i32,
        status: &str,
    ) -> i64 {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO asset_networks (asset_info_id, asset_kind, chain_id, deploy_kind,
                status, owner)
            VALUES ($1, 'token', $2, $3, $4, '0x00000000000000000000000000000000000000aa')
            RETURNING id
            "#,
        )
        .bind(asset_id)
        .bind(chain_id)
        .bind(deploy_kind)
        .bind(status)
        .fetch_one(pool)
        .await
        .expect("Failed to insert asset network");

        row.0
    }

    pub async fn network_status(pool: &PgPool, id: i64) -> String {
        let row: (String,) = sqlx::query_as(r#"SELECT status FROM asset_networks WHERE id = $1"#)
            .bind(id)
            .fetch_one(pool)
            .await
            .expect("Failed to read network status");

        row.0
    }
}

#[tokio::test]
#[ignore]
async fn test_failed_networks_are_requeued_unconditionally() {
    let config = helpers::TestConfig::from_env().expect("DATABASE_URL not set");
    let pool = helpers::connect(&config).await;

    let salt = helpers::unique_salt("requeue");
    let asset_id = helpers::insert_asset(&pool, &salt).await;
    let network_id = helpers::insert_network(&pool, asset_id, 56, 1, "FAILED").await;

    // The executor's pass-start reset: every FAILED row goes back to
    // PENDING, with no retry-count gate.
    let reset = sqlx::query(
        r#"UPDATE asset_networks SET status = 'PENDING', updated_at = NOW()
           WHERE asset_kind = 'token' AND status = 'FAILED'"#,
    )
    .execute(&pool)
    .await
    .unwrap()
    .rows_affected();

    assert!(reset >= 1);
    assert_eq!(helpers::network_status(&pool, network_id).await, "PENDING");
}

#[tokio::test]
#[ignore]
async fn test_promotion_is_idempotent_on_replay() {
    let config = helpers::TestConfig::from_env().expect("DATABASE_URL not set");
    let pool = helpers::connect(&config).await;

    let salt = helpers::unique_salt("promote");
    let asset_id = helpers::insert_asset(&pool, &salt).await;
    let network_id = helpers::insert_network(&pool, asset_id, 137, 1, "QUERIED").await;

    let promote = || async {
        sqlx::query(
            r#"UPDATE asset_networks
               SET status = 'PENDING', fee_paid_by_user = '42', updated_at = NOW()
               WHERE asset_info_id = $1 AND chain_id = 137 AND status = 'QUERIED'"#,
        )
        .bind(asset_id)
        .execute(&pool)
        .await
        .unwrap()
        .rows_affected()
    };

    // First observation of the initiation event flips the record
    assert_eq!(promote().await, 1);
    assert_eq!(helpers::network_status(&pool, network_id).await, "PENDING");

    // A replayed scan window sees the same event again: no-op
    assert_eq!(promote().await, 0);
    assert_eq!(helpers::network_status(&pool, network_id).await, "PENDING");
}

#[tokio::test]
#[ignore]
async fn test_deployed_network_is_terminal() {
    let config = helpers::TestConfig::from_env().expect("DATABASE_URL not set");
    let pool = helpers::connect(&config).await;

    let salt = helpers::unique_salt("terminal");
    let asset_id = helpers::insert_asset(&pool, &salt).await;
    let network_id = helpers::insert_network(&pool, asset_id, 56, 0, "DEPLOYED").await;
    sqlx::query(
        r#"UPDATE asset_networks SET address = '0x00000000000000000000000000000000000000bb'
           WHERE id = $1"#,
    )
    .bind(network_id)
    .execute(&pool)
    .await
    .unwrap();

    // Neither the requeue (FAILED only) nor the candidate query (PENDING
    // with no address) touches a DEPLOYED record.
    sqlx::query(
        r#"UPDATE asset_networks SET status = 'PENDING', updated_at = NOW()
           WHERE asset_kind = 'token' AND status = 'FAILED'"#,
    )
    .execute(&pool)
    .await
    .unwrap();

    let candidates: Vec<(i64,)> = sqlx::query_as(
        r#"SELECT id FROM asset_networks
           WHERE asset_kind = 'token' AND status = 'PENDING' AND address IS NULL AND id = $1"#,
    )
    .bind(network_id)
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(candidates.is_empty());
    assert_eq!(helpers::network_status(&pool, network_id).await, "DEPLOYED");
}

#[tokio::test]
#[ignore]
async fn test_proxy_sorts_before_native_in_candidate_order() {
    let config = helpers::TestConfig::from_env().expect("DATABASE_URL not set");
    let pool = helpers::connect(&config).await;

    let salt = helpers::unique_salt("order");
    let asset_id = helpers::insert_asset(&pool, &salt).await;
    // Insert native first so insertion order cannot mask the sort
    let native_id = helpers::insert_network(&pool, asset_id, 137, 1, "PENDING").await;
    let proxy_id = helpers::insert_network(&pool, asset_id, 56, 0, "PENDING").await;

    let ordered: Vec<(i64,)> = sqlx::query_as(
        r#"SELECT id FROM asset_networks
           WHERE asset_info_id = $1 AND status = 'PENDING' AND address IS NULL
           ORDER BY deploy_kind ASC, id ASC"#,
    )
    .bind(asset_id)
    .fetch_all(&pool)
    .await
    .unwrap();

    assert_eq!(
        ordered.iter().map(|r| r.0).collect::<Vec<_>>(),
        vec![proxy_id, native_id]
    );
}

#[tokio::test]
#[ignore]
async fn test_watermark_upsert_round_trip() {
    let config = helpers::TestConfig::from_env().expect("DATABASE_URL not set");
    let pool = helpers::connect(&config).await;

    let scan = helpers::unique_salt("scan");
    let scan = &scan[..scan.len().min(64)];

    let upsert = |block: i64| {
        let scan = scan.to_string();
        let pool = pool.clone();
        async move {
            sqlx::query(
                r#"
                INSERT INTO block_watermarks (chain_id, scan_name, block_no)
                VALUES (56, $1, $2)
                ON CONFLICT (chain_id, scan_name) DO UPDATE
                    SET block_no = EXCLUDED.block_no, updated_at = NOW()
                "#,
            )
            .bind(scan)
            .bind(block)
            .execute(&pool)
            .await
            .unwrap();
        }
    };

    upsert(1000).await;
    upsert(1999).await;

    let row: (i64,) = sqlx::query_as(
        r#"SELECT block_no FROM block_watermarks WHERE chain_id = 56 AND scan_name = $1"#,
    )
    .bind(scan)
    .fetch_one(&pool)
    .await
    .unwrap();

    assert_eq!(row.0, 1999);
}

#[tokio::test]
#[ignore]
async fn test_bridge_error_requeue_keeps_retry_counter() {
    let config = helpers::TestConfig::from_env().expect("DATABASE_URL not set");
    let pool = helpers::connect(&config).await;

    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO bridge_records (asset_kind, from_chain_id, to_chain_id, from_token,
            to_token, from_address, to_address, amount, fee_wei, status, error_retry_count)
        VALUES ('token', 56, 137, '0x00000000000000000000000000000000000000cc',
            '0x00000000000000000000000000000000000000dd',
            '0x00000000000000000000000000000000000000ee',
            '0x00000000000000000000000000000000000000ff',
            '1000', '5000', 'BRIDGE_ERROR', 7)
        RETURNING id
        "#,
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    // Pass-start reset: error records go straight back to BRIDGE_INITIATED
    // regardless of how often they failed; the counter is advisory.
    sqlx::query(
        r#"UPDATE bridge_records SET status = 'BRIDGE_INITIATED', updated_at = NOW()
           WHERE asset_kind = 'token' AND status = 'BRIDGE_ERROR'"#,
    )
    .execute(&pool)
    .await
    .unwrap();

    let record: (String, i32) = sqlx::query_as(
        r#"SELECT status, error_retry_count FROM bridge_records WHERE id = $1"#,
    )
    .bind(row.0)
    .fetch_one(&pool)
    .await
    .unwrap();

    assert_eq!(record.0, "BRIDGE_INITIATED");
    assert_eq!(record.1, 7);
}
