use std::sync::LockResult;

use tracing::warn;

/// Take the guard even if a previous holder panicked.
///
/// Cached pages are disposable, so a poisoned lock only costs a warning.
pub(super) fn recover<G>(result: LockResult<G>, op: &'static str) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(
            target = "inkwell::cache",
            op,
            "page cache lock was poisoned, reusing its contents"
        );
        poisoned.into_inner()
    })
}
