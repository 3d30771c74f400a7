//! In-memory copy of the active face-encoding gallery.
//!
//! The matcher linear-scans every active vector on each attempt, so the
//! gallery is held in a short-TTL cache instead of being re-read from
//! MySQL per request. Registration and deletion invalidate it.

use crate::face::matcher::GalleryEntry;
use crate::model::face::FaceEncoding;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::Arc;
use std::time::Duration;

const GALLERY_KEY: &str = "active";
const GALLERY_TTL_SECS: u64 = 60;

static GALLERY_CACHE: Lazy<Cache<&'static str, Arc<Vec<GalleryEntry>>>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(1)
        .time_to_live(Duration::from_secs(GALLERY_TTL_SECS))
        .build()
});

/// Current active gallery, loading from the database on a cache miss.
pub async fn active_gallery(pool: &MySqlPool) -> Result<Arc<Vec<GalleryEntry>>, sqlx::Error> {
    if let Some(gallery) = GALLERY_CACHE.get(GALLERY_KEY).await {
        return Ok(gallery);
    }

    let gallery = Arc::new(load_gallery(pool).await?);
    GALLERY_CACHE
        .insert(GALLERY_KEY, Arc::clone(&gallery))
        .await;
    Ok(gallery)
}

/// Drop the cached gallery after a registration or deletion.
pub async fn invalidate() {
    GALLERY_CACHE.invalidate(GALLERY_KEY).await;
}

/// Preload the gallery at startup so the first recognition request does
/// not pay the load.
pub async fn warmup_gallery(pool: &MySqlPool) -> anyhow::Result<()> {
    let gallery = Arc::new(load_gallery(pool).await?);
    let count = gallery.len();
    GALLERY_CACHE.insert(GALLERY_KEY, gallery).await;

    log::info!("Face gallery warmup complete: {} active encodings", count);
    Ok(())
}

async fn load_gallery(pool: &MySqlPool) -> Result<Vec<GalleryEntry>, sqlx::Error> {
    let rows = sqlx::query_as::<_, FaceEncoding>(
        "SELECT * FROM face_encodings WHERE is_active = TRUE",
    )
    .fetch_all(pool)
    .await?;

    let mut gallery = Vec::with_capacity(rows.len());
    for row in rows {
        match row.encoding() {
            Ok(encoding) => gallery.push(GalleryEntry {
                user_id: row.user_id,
                encoding,
            }),
            // skip bad rows; recognition continues with the rest
            Err(e) => log::warn!("skipping malformed encoding for user {}: {}", row.user_id, e),
        }
    }
    Ok(gallery)
}
