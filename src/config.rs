use std::path::PathBuf;

const DEFAULT_PREFIX: &str = "ttmp_";
const DEFAULT_MAX_ATTEMPTS: u32 = 16;

/// Settings of a [`TempFileRegistry`](crate::TempFileRegistry).
///
/// The default configuration discovers the system temp directory via
/// [`std::env::temp_dir`]; the global registry always uses it.
///
/// ```
/// # use tracked_tempfile::RegistryConfig;
/// let config = RegistryConfig::default().with_prefix("upload_");
/// assert_eq!(config.prefix(), "upload_");
/// assert_eq!(config.dir(), &std::env::temp_dir());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    dir: PathBuf,
    prefix: String,
    max_attempts: u32,
}

impl RegistryConfig {
    /// Sets the directory temporary files are created in.
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    /// Sets the prefix of generated file names.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets how many generated names are tried before allocation gives up.
    /// A value of zero is treated as one.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir(),
            prefix: DEFAULT_PREFIX.to_owned(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}
