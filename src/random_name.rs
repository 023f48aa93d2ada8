#[cfg(not(feature = "uuid"))]
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(not(feature = "uuid"))]
use std::time::SystemTime;

/// Bumped on every generated name so that two names produced within the
/// same clock tick still differ.
#[cfg(not(feature = "uuid"))]
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Represents a randomly generated file name.
pub(crate) struct RandomName {
    name: String,
}

impl RandomName {
    #[cfg(feature = "uuid")]
    pub fn new(prefix: &str) -> Self {
        Self {
            name: format!("{}{}", prefix, uuid::Uuid::new_v4()),
        }
    }

    #[cfg(not(feature = "uuid"))]
    pub fn new(prefix: &str) -> Self {
        let pid = std::process::id();
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);

        // Using the address of a local variable for extra variation.
        let marker = &pid as *const _ as usize;

        // Current timestamp for added variation.
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or(std::time::Duration::from_secs(0));
        let (secs, subsec_nanos) = (now.as_secs(), now.subsec_nanos());

        Self {
            name: format!(
                "{}{}{:x}{:x}{:x}{:x}",
                prefix, pid, marker, secs, subsec_nanos, seq
            ),
        }
    }
}

impl AsRef<str> for RandomName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}
