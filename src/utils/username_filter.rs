//! Fast username-availability prechecks for enrollment.
//!
//! The cuckoo filter answers "definitely not taken" without touching the
//! database; only a filter hit (possible false positive) falls through
//! to MySQL.

use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures_util::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;

/// Sized for a mid-size school; the filter autoscales past this anyway.
const FILTER_CAPACITY: usize = 50_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static USERNAME_FILTER: Lazy<RwLock<CuckooFilter<String>>> = Lazy::new(|| {
    RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE))
});

#[inline]
fn normalize(username: &str) -> String {
    username.to_lowercase()
}

/// Record a newly created username.
pub fn insert(username: &str) {
    USERNAME_FILTER
        .write()
        .expect("username filter poisoned")
        .add(&normalize(username));
}

/// Forget a deleted username.
pub fn remove(username: &str) {
    USERNAME_FILTER
        .write()
        .expect("username filter poisoned")
        .remove(&normalize(username));
}

fn might_exist(username: &str) -> bool {
    USERNAME_FILTER
        .read()
        .expect("username filter poisoned")
        .contains(&normalize(username))
}

/// true  => username AVAILABLE
/// false => username TAKEN
pub async fn is_available(username: &str, pool: &MySqlPool) -> bool {
    // Filter says "definitely absent" -> no DB round trip.
    if !might_exist(username) {
        return true;
    }

    // Possible false positive; confirm against the database.
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? LIMIT 1)",
    )
    .bind(normalize(username))
    .fetch_one(pool)
    .await
    .unwrap_or(true); // fail-safe: treat DB trouble as "taken"

    !exists
}

/// Stream every username into the filter at startup, in batches.
pub async fn warmup(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT username FROM users").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (username,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(normalize(&username));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    log::info!("Username filter warmup complete: {} users", total);
    Ok(())
}

fn insert_batch(usernames: &[String]) {
    let mut filter = USERNAME_FILTER.write().expect("username filter poisoned");
    for username in usernames {
        filter.add(username);
    }
}
