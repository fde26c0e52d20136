//! Home-feed page cache.
//!
//! Rendered home-feed fragments are kept for a fixed window and served
//! unchanged until they expire or an operator clears the cache.
//!
//! ```toml
//! [cache]
//! enabled = true
//! home_ttl_seconds = 20
//! max_entries = 64
//! ```

mod lock;
mod store;

pub use store::{NoopPageCache, PageCache, TtlPageCache};

use std::sync::Arc;

use crate::config::CacheSettings;

/// Build the page cache described by the validated `[cache]` settings.
pub fn build_page_cache(settings: &CacheSettings) -> Arc<dyn PageCache> {
    if settings.enabled {
        Arc::new(TtlPageCache::new(settings.max_entries))
    } else {
        Arc::new(NoopPageCache)
    }
}
