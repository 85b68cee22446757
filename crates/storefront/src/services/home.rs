//! Home page assembly with a per-locale cache.
//!
//! Content is edited in the admin panel, a separate process, so entries
//! expire on a short TTL instead of being invalidated.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use sqlx::PgPool;

use bearing_shop_core::Locale;
use bearing_shop_core::content::FooterContent;

use crate::db::{ContentRepository, RepositoryError};
use crate::models::{BannerView, HomePage, SectionView, safe_footer};

const CACHE_TTL: Duration = Duration::from_secs(60);

/// Cached home pages keyed by locale tag.
#[derive(Clone)]
pub struct HomeCache {
    cache: Cache<String, Arc<HomePage>>,
}

impl Default for HomeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl HomeCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(32)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }

    /// The home page for `locale`, loading it on a miss.
    ///
    /// Errors are not cached.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if loading fails.
    pub async fn get(
        &self,
        pool: &PgPool,
        locale: &Locale,
        default_locale: &Locale,
    ) -> Result<Arc<HomePage>, RepositoryError> {
        if let Some(page) = self.cache.get(locale.as_str()).await {
            return Ok(page);
        }

        let page = Arc::new(load_home_page(pool, locale, default_locale).await?);
        self.cache
            .insert(locale.as_str().to_owned(), Arc::clone(&page))
            .await;
        Ok(page)
    }
}

/// Load sections, blocks, live banners and the footer for a locale.
///
/// # Errors
///
/// Returns `RepositoryError` if any query fails.
pub async fn load_home_page(
    pool: &PgPool,
    locale: &Locale,
    default_locale: &Locale,
) -> Result<HomePage, RepositoryError> {
    let repo = ContentRepository::new(pool);
    let sections = repo.sections(locale).await?;
    let blocks = repo.blocks(locale).await?;

    let now = Utc::now();
    let banners = repo
        .banners()
        .await?
        .into_iter()
        .filter(|b| b.is_live_at(now))
        .map(BannerView::from)
        .collect();

    let footer = repo
        .footer(locale, default_locale)
        .await?
        .map(|value| safe_footer(FooterContent::from_value(&value)))
        .unwrap_or_default();

    Ok(HomePage {
        sections: SectionView::build(sections, &blocks),
        banners,
        footer,
    })
}
