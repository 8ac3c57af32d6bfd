#![allow(dead_code)]

use eyre::{Result, WrapErr};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::error;

use crate::types::{AssetKind, BridgeStatus, DeployStatus, RegistrationStatus};

pub mod models;

pub use models::*;

/// Create a database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .wrap_err("Failed to connect to database")
}

/// Run pending migrations (uses the migration files in migrations/)
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .wrap_err("Failed to run database migrations")?;
    Ok(())
}

// ============================================================================
// Asset infos
// ============================================================================

/// Look up an asset by its cross-chain correlation key
pub async fn find_asset_info_by_salt(
    pool: &PgPool,
    kind: AssetKind,
    salt: &str,
) -> Result<Option<AssetInfo>> {
    let row = sqlx::query_as::<_, AssetInfo>(
        r#"SELECT * FROM asset_infos WHERE asset_kind = $1 AND salt = $2"#,
    )
    .bind(kind.as_str())
    .bind(salt)
    .fetch_optional(pool)
    .await
    .wrap_err("Failed to find asset info by salt")?;

    Ok(row)
}

/// Insert a new asset info
pub async fn insert_asset_info(pool: &PgPool, info: &NewAssetInfo) -> Result<i64> {
    let row = sqlx::query(
        r#"
        INSERT INTO asset_infos (asset_kind, name, symbol, decimals, base_uri, total_supply,
            owner, salt, token_mint_chain_id, fee_payment_chain_id, gas_values, gas_prices,
            total_gas_fee_usd, total_gas_fee_native, total_gas_fee_wei)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING id
        "#,
    )
    .bind(&info.asset_kind)
    .bind(&info.name)
    .bind(&info.symbol)
    .bind(info.decimals)
    .bind(&info.base_uri)
    .bind(&info.total_supply)
    .bind(&info.owner)
    .bind(&info.salt)
    .bind(info.token_mint_chain_id)
    .bind(info.fee_payment_chain_id)
    .bind(&info.gas_values)
    .bind(&info.gas_prices)
    .bind(info.total_gas_fee_usd)
    .bind(info.total_gas_fee_native)
    .bind(&info.total_gas_fee_wei)
    .fetch_one(pool)
    .await
    .wrap_err("Failed to insert asset info")?;

    Ok(row.get("id"))
}

/// Record the user's initiation transaction on the asset
pub async fn update_asset_initiation(pool: &PgPool, id: i64, tx_hash: &str) -> Result<()> {
    sqlx::query(
        r#"UPDATE asset_infos SET initiate_tx_hash = $1, updated_at = NOW() WHERE id = $2"#,
    )
    .bind(tx_hash)
    .bind(id)
    .execute(pool)
    .await
    .wrap_err("Failed to update asset initiation tx")?;

    Ok(())
}

/// Attach a display thumbnail (NFT collections, cosmetic)
pub async fn set_asset_image_url(pool: &PgPool, id: i64, url: &str) -> Result<()> {
    sqlx::query(r#"UPDATE asset_infos SET image_url = $1, updated_at = NOW() WHERE id = $2"#)
        .bind(url)
        .bind(id)
        .execute(pool)
        .await
        .wrap_err("Failed to set asset image url")?;

    Ok(())
}

// ============================================================================
// Asset networks
// ============================================================================

/// Unconditionally requeue FAILED networks for another deployment attempt.
/// Runs at the start of every executor pass; retries are unbounded by design.
pub async fn requeue_failed_networks(pool: &PgPool, kind: AssetKind) -> Result<u64> {
    let result = sqlx::query(
        r#"UPDATE asset_networks SET status = $1, updated_at = NOW()
           WHERE asset_kind = $2 AND status = $3"#,
    )
    .bind(DeployStatus::Pending.as_str())
    .bind(kind.as_str())
    .bind(DeployStatus::Failed.as_str())
    .execute(pool)
    .await
    .wrap_err("Failed to requeue failed networks")?;

    Ok(result.rows_affected())
}

/// PENDING networks without an address yet, joined with their asset info.
/// Proxy-kind rows sort first so the hub deploys before its spokes.
pub async fn get_deployment_candidates(
    pool: &PgPool,
    kind: AssetKind,
) -> Result<Vec<DeploymentCandidate>> {
    let rows = sqlx::query_as::<_, DeploymentCandidate>(
        r#"SELECT an.id AS network_id, an.asset_info_id, an.chain_id, an.deploy_kind,
                  an.owner AS network_owner, an.generic_token_address, an.address,
                  ai.name, ai.symbol, ai.decimals, ai.base_uri, ai.total_supply, ai.salt,
                  ai.owner, ai.token_mint_chain_id
           FROM asset_networks an
           JOIN asset_infos ai ON ai.id = an.asset_info_id
           WHERE an.asset_kind = $1 AND an.status = $2 AND an.address IS NULL
           ORDER BY an.deploy_kind ASC, an.id ASC"#,
    )
    .bind(kind.as_str())
    .bind(DeployStatus::Pending.as_str())
    .fetch_all(pool)
    .await
    .map_err(|e| {
        error!("SQL error getting deployment candidates: {:?}", e);
        e
    })
    .wrap_err("Failed to get deployment candidates")?;

    Ok(rows)
}

/// DEPLOYED networks whose cross-chain registration previously failed,
/// joined with their asset info for the best-effort retry.
pub async fn get_failed_registrations(
    pool: &PgPool,
    kind: AssetKind,
) -> Result<Vec<DeploymentCandidate>> {
    let rows = sqlx::query_as::<_, DeploymentCandidate>(
        r#"SELECT an.id AS network_id, an.asset_info_id, an.chain_id, an.deploy_kind,
                  an.owner AS network_owner, an.generic_token_address, an.address,
                  ai.name, ai.symbol, ai.decimals, ai.base_uri, ai.total_supply, ai.salt,
                  ai.owner, ai.token_mint_chain_id
           FROM asset_networks an
           JOIN asset_infos ai ON ai.id = an.asset_info_id
           WHERE an.asset_kind = $1 AND an.status = $2 AND an.registration = $3
                 AND an.address IS NOT NULL
           ORDER BY an.id ASC"#,
    )
    .bind(kind.as_str())
    .bind(DeployStatus::Deployed.as_str())
    .bind(RegistrationStatus::Failed.as_str())
    .fetch_all(pool)
    .await
    .wrap_err("Failed to get failed registrations")?;

    Ok(rows)
}

pub async fn mark_network_in_progress(pool: &PgPool, id: i64) -> Result<()> {
    sqlx::query(r#"UPDATE asset_networks SET status = $1, updated_at = NOW() WHERE id = $2"#)
        .bind(DeployStatus::InProgress.as_str())
        .bind(id)
        .execute(pool)
        .await
        .wrap_err_with(|| format!("Failed to mark network {} in progress", id))?;

    Ok(())
}

/// Persist the deployed address. This is the durable half of the two-phase
/// deployment result; registration is tracked separately.
pub async fn mark_network_deployed(
    pool: &PgPool,
    id: i64,
    address: &str,
    owner: &str,
    tx_hash: &str,
) -> Result<()> {
    sqlx::query(
        r#"UPDATE asset_networks
           SET status = $1, address = $2, owner = $3, deployment_tx_hash = $4,
               error = NULL, updated_at = NOW()
           WHERE id = $5"#,
    )
    .bind(DeployStatus::Deployed.as_str())
    .bind(address)
    .bind(owner)
    .bind(tx_hash)
    .bind(id)
    .execute(pool)
    .await
    .wrap_err_with(|| format!("Failed to mark network {} deployed", id))?;

    Ok(())
}

pub async fn mark_network_failed(pool: &PgPool, id: i64, error_text: &str) -> Result<()> {
    sqlx::query(
        r#"UPDATE asset_networks SET status = $1, error = $2, updated_at = NOW() WHERE id = $3"#,
    )
    .bind(DeployStatus::Failed.as_str())
    .bind(error_text)
    .bind(id)
    .execute(pool)
    .await
    .wrap_err_with(|| format!("Failed to mark network {} failed", id))?;

    Ok(())
}

pub async fn set_network_registration(
    pool: &PgPool,
    id: i64,
    registration: RegistrationStatus,
) -> Result<()> {
    sqlx::query(
        r#"UPDATE asset_networks SET registration = $1, updated_at = NOW() WHERE id = $2"#,
    )
    .bind(registration.as_str())
    .bind(id)
    .execute(pool)
    .await
    .wrap_err_with(|| format!("Failed to set network {} registration", id))?;

    Ok(())
}

/// Atomically flip a QUERIED network to PENDING, recording the fee the user
/// actually paid on-chain. Returns the number of rows flipped (0 when the
/// network already advanced — replayed events are no-ops).
pub async fn promote_network_to_pending(
    pool: &PgPool,
    asset_info_id: i64,
    chain_id: i64,
    fee_paid: &str,
) -> Result<u64> {
    let result = sqlx::query(
        r#"UPDATE asset_networks
           SET status = $1, fee_paid_by_user = $2, updated_at = NOW()
           WHERE asset_info_id = $3 AND chain_id = $4 AND status = $5"#,
    )
    .bind(DeployStatus::Pending.as_str())
    .bind(fee_paid)
    .bind(asset_info_id)
    .bind(chain_id)
    .bind(DeployStatus::Queried.as_str())
    .execute(pool)
    .await
    .wrap_err("Failed to promote network to pending")?;

    Ok(result.rows_affected())
}

/// The asset's proxy network once it has a deployed address — the hub a
/// freshly deployed native copy links back to.
pub async fn get_proxy_network_with_address(
    pool: &PgPool,
    asset_info_id: i64,
) -> Result<Option<AssetNetwork>> {
    let row = sqlx::query_as::<_, AssetNetwork>(
        r#"SELECT * FROM asset_networks
           WHERE asset_info_id = $1 AND deploy_kind = 0 AND address IS NOT NULL"#,
    )
    .bind(asset_info_id)
    .fetch_optional(pool)
    .await
    .wrap_err("Failed to get proxy network")?;

    Ok(row)
}

/// Find the proxy network wrapping `token` on `chain_id`, if any. Used to
/// redirect the VAA emitter from a generic token to its wrapping proxy.
pub async fn find_wrapping_proxy(
    pool: &PgPool,
    kind: AssetKind,
    chain_id: i64,
    token: &str,
) -> Result<Option<AssetNetwork>> {
    let row = sqlx::query_as::<_, AssetNetwork>(
        r#"SELECT * FROM asset_networks
           WHERE asset_kind = $1 AND chain_id = $2
                 AND LOWER(generic_token_address) = LOWER($3)
                 AND address IS NOT NULL"#,
    )
    .bind(kind.as_str())
    .bind(chain_id)
    .bind(token)
    .fetch_optional(pool)
    .await
    .wrap_err("Failed to find wrapping proxy")?;

    Ok(row)
}

/// Upsert one network row keyed by (asset, chain)
pub async fn upsert_asset_network(pool: &PgPool, network: &NewAssetNetwork) -> Result<i64> {
    let row = sqlx::query(
        r#"
        INSERT INTO asset_networks (asset_info_id, asset_kind, chain_id, deploy_kind,
            status, owner, generic_token_address)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (asset_info_id, chain_id) DO UPDATE
            SET deploy_kind = EXCLUDED.deploy_kind,
                owner = EXCLUDED.owner,
                generic_token_address = EXCLUDED.generic_token_address,
                updated_at = NOW()
        RETURNING id
        "#,
    )
    .bind(network.asset_info_id)
    .bind(&network.asset_kind)
    .bind(network.chain_id)
    .bind(network.deploy_kind)
    .bind(&network.status)
    .bind(&network.owner)
    .bind(&network.generic_token_address)
    .fetch_one(pool)
    .await
    .wrap_err("Failed to upsert asset network")?;

    Ok(row.get("id"))
}

/// Bulk-upsert networks for every destination chain of a deploy request
pub async fn bulk_upsert_asset_networks(
    pool: &PgPool,
    networks: &[NewAssetNetwork],
) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(networks.len());
    for network in networks {
        ids.push(upsert_asset_network(pool, network).await?);
    }
    Ok(ids)
}

pub async fn get_asset_network(pool: &PgPool, id: i64) -> Result<Option<AssetNetwork>> {
    let row = sqlx::query_as::<_, AssetNetwork>(r#"SELECT * FROM asset_networks WHERE id = $1"#)
        .bind(id)
        .fetch_optional(pool)
        .await
        .wrap_err("Failed to get asset network")?;

    Ok(row)
}

pub async fn count_networks_by_status(
    pool: &PgPool,
    kind: AssetKind,
    status: DeployStatus,
) -> Result<i64> {
    let row: (i64,) = sqlx::query_as(
        r#"SELECT COUNT(*) FROM asset_networks WHERE asset_kind = $1 AND status = $2"#,
    )
    .bind(kind.as_str())
    .bind(status.as_str())
    .fetch_one(pool)
    .await
    .wrap_err("Failed to count networks by status")?;

    Ok(row.0)
}

// ============================================================================
// Bridge records
// ============================================================================

/// Unconditionally requeue BRIDGE_ERROR records. The retry counter is kept
/// for observability only.
pub async fn requeue_errored_bridges(pool: &PgPool, kind: AssetKind) -> Result<u64> {
    let result = sqlx::query(
        r#"UPDATE bridge_records SET status = $1, updated_at = NOW()
           WHERE asset_kind = $2 AND status = $3"#,
    )
    .bind(BridgeStatus::BridgeInitiated.as_str())
    .bind(kind.as_str())
    .bind(BridgeStatus::BridgeError.as_str())
    .execute(pool)
    .await
    .wrap_err("Failed to requeue errored bridges")?;

    Ok(result.rows_affected())
}

/// Records the bridge executor should drive forward this pass
pub async fn get_active_bridges(pool: &PgPool, kind: AssetKind) -> Result<Vec<BridgeRecord>> {
    let rows = sqlx::query_as::<_, BridgeRecord>(
        r#"SELECT * FROM bridge_records
           WHERE asset_kind = $1 AND status IN ($2, $3)
           ORDER BY id ASC"#,
    )
    .bind(kind.as_str())
    .bind(BridgeStatus::BridgeInitiated.as_str())
    .bind(BridgeStatus::BlockConfirmation.as_str())
    .fetch_all(pool)
    .await
    .map_err(|e| {
        error!("SQL error getting active bridges: {:?}", e);
        e
    })
    .wrap_err("Failed to get active bridges")?;

    Ok(rows)
}

pub async fn get_bridge_record(
    pool: &PgPool,
    kind: AssetKind,
    id: i64,
) -> Result<Option<BridgeRecord>> {
    let row = sqlx::query_as::<_, BridgeRecord>(
        r#"SELECT * FROM bridge_records WHERE asset_kind = $1 AND id = $2"#,
    )
    .bind(kind.as_str())
    .bind(id)
    .fetch_optional(pool)
    .await
    .wrap_err("Failed to get bridge record")?;

    Ok(row)
}

pub async fn insert_bridge_record(pool: &PgPool, record: &NewBridgeRecord) -> Result<i64> {
    let row = sqlx::query(
        r#"
        INSERT INTO bridge_records (asset_kind, from_chain_id, to_chain_id, from_token,
            to_token, from_address, to_address, amount, fee_native, fee_usd, fee_wei)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING id
        "#,
    )
    .bind(&record.asset_kind)
    .bind(record.from_chain_id)
    .bind(record.to_chain_id)
    .bind(&record.from_token)
    .bind(&record.to_token)
    .bind(&record.from_address)
    .bind(&record.to_address)
    .bind(&record.amount)
    .bind(record.fee_native)
    .bind(record.fee_usd)
    .bind(&record.fee_wei)
    .fetch_one(pool)
    .await
    .wrap_err("Failed to insert bridge record")?;

    Ok(row.get("id"))
}

/// Tracker observed the on-chain initiation for this record
pub async fn mark_bridge_initiated(pool: &PgPool, id: i64, tx_hash: &str) -> Result<()> {
    sqlx::query(
        r#"UPDATE bridge_records
           SET status = $1, initiate_tx_hash = $2, updated_at = NOW()
           WHERE id = $3"#,
    )
    .bind(BridgeStatus::BridgeInitiated.as_str())
    .bind(tx_hash)
    .bind(id)
    .execute(pool)
    .await
    .wrap_err_with(|| format!("Failed to mark bridge {} initiated", id))?;

    Ok(())
}

/// Source chain has not accrued enough confirmations yet; progress counters
/// let the status endpoint show how far along the wait is.
pub async fn set_bridge_confirmation_progress(
    pool: &PgPool,
    id: i64,
    done: i64,
    total: i64,
) -> Result<()> {
    sqlx::query(
        r#"UPDATE bridge_records
           SET status = $1, block_confirmation_done = $2, total_block_confirmation = $3,
               updated_at = NOW()
           WHERE id = $4"#,
    )
    .bind(BridgeStatus::BlockConfirmation.as_str())
    .bind(done)
    .bind(total)
    .bind(id)
    .execute(pool)
    .await
    .wrap_err_with(|| format!("Failed to set bridge {} confirmation progress", id))?;

    Ok(())
}

pub async fn mark_bridge_in_queue(
    pool: &PgPool,
    id: i64,
    sequence: i64,
    done: i64,
    total: i64,
) -> Result<()> {
    sqlx::query(
        r#"UPDATE bridge_records
           SET status = $1, sequence = $2, block_confirmation_done = $3,
               total_block_confirmation = $4, updated_at = NOW()
           WHERE id = $5"#,
    )
    .bind(BridgeStatus::InQueue.as_str())
    .bind(sequence)
    .bind(done)
    .bind(total)
    .bind(id)
    .execute(pool)
    .await
    .wrap_err_with(|| format!("Failed to mark bridge {} in queue", id))?;

    Ok(())
}

pub async fn mark_bridge_completed(pool: &PgPool, id: i64, relayer_tx_hash: &str) -> Result<()> {
    sqlx::query(
        r#"UPDATE bridge_records
           SET status = $1, relayer_tx_hash = $2, error = NULL, updated_at = NOW()
           WHERE id = $3"#,
    )
    .bind(BridgeStatus::BridgeCompleted.as_str())
    .bind(relayer_tx_hash)
    .bind(id)
    .execute(pool)
    .await
    .wrap_err_with(|| format!("Failed to mark bridge {} completed", id))?;

    Ok(())
}

pub async fn mark_bridge_errored(pool: &PgPool, id: i64, error_text: &str) -> Result<()> {
    sqlx::query(
        r#"UPDATE bridge_records
           SET status = $1, error = $2, error_retry_count = error_retry_count + 1,
               updated_at = NOW()
           WHERE id = $3"#,
    )
    .bind(BridgeStatus::BridgeError.as_str())
    .bind(error_text)
    .bind(id)
    .execute(pool)
    .await
    .wrap_err_with(|| format!("Failed to mark bridge {} errored", id))?;

    Ok(())
}

pub async fn count_bridges_by_status(
    pool: &PgPool,
    kind: AssetKind,
    status: BridgeStatus,
) -> Result<i64> {
    let row: (i64,) = sqlx::query_as(
        r#"SELECT COUNT(*) FROM bridge_records WHERE asset_kind = $1 AND status = $2"#,
    )
    .bind(kind.as_str())
    .bind(status.as_str())
    .fetch_one(pool)
    .await
    .wrap_err("Failed to count bridges by status")?;

    Ok(row.0)
}

// ============================================================================
// Block watermarks
// ============================================================================

/// Highest block already scanned, or None for a chain/scan never seen
pub async fn get_watermark(pool: &PgPool, chain_id: i64, scan_name: &str) -> Result<Option<i64>> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"SELECT block_no FROM block_watermarks WHERE chain_id = $1 AND scan_name = $2"#,
    )
    .bind(chain_id)
    .bind(scan_name)
    .fetch_optional(pool)
    .await
    .wrap_err("Failed to get watermark")?;

    Ok(row.map(|r| r.0))
}

/// Atomic upsert; called once per chain per pass after the window committed
pub async fn upsert_watermark(
    pool: &PgPool,
    chain_id: i64,
    scan_name: &str,
    block_no: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO block_watermarks (chain_id, scan_name, block_no)
        VALUES ($1, $2, $3)
        ON CONFLICT (chain_id, scan_name) DO UPDATE
            SET block_no = EXCLUDED.block_no, updated_at = NOW()
        "#,
    )
    .bind(chain_id)
    .bind(scan_name)
    .bind(block_no)
    .execute(pool)
    .await
    .wrap_err("Failed to upsert watermark")?;

    Ok(())
}

// ============================================================================
// Price quotes (read-only collaborator data)
// ============================================================================

pub async fn get_price_quotes(pool: &PgPool) -> Result<Vec<PriceQuote>> {
    let rows = sqlx::query_as::<_, PriceQuote>(r#"SELECT * FROM price_quotes ORDER BY symbol"#)
        .fetch_all(pool)
        .await
        .wrap_err("Failed to get price quotes")?;

    Ok(rows)
}
