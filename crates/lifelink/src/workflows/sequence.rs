use std::sync::atomic::{AtomicU64, Ordering};

static SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier with a readable prefix, e.g. `appt-000042`.
pub(crate) fn next_id(prefix: &str) -> String {
    let id = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{id:06}")
}
