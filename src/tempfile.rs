use parking_lot::Mutex;
use std::borrow::Borrow;
use std::fmt::{Debug, Formatter};
use std::fs::Metadata;
use std::io::ErrorKind;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};

use crate::{Error, Result, Source, TempFileRegistry};

/// A temporary file tracked by a [`TempFileRegistry`].
///
/// The handle is a plain path with a small metadata cache. It does not delete
/// anything when dropped; the file lives until it is [deleted](Self::delete)
/// or its registry is purged.
///
/// The associated constructors (`new`, `with_extension`, ...) use the
/// [global](TempFileRegistry::global) registry, which is purged when the
/// process exits.
pub struct TempFile {
    path: PathBuf,

    /// Metadata as of the last query. Stale until [`TempFile::refresh`] is called.
    stat: Mutex<Stat>,
}

#[derive(Debug, Clone)]
enum Stat {
    Unknown,
    Missing,
    Present(Metadata),
}

impl TempFile {
    /// Creates a new, empty temporary file in the system temp directory.
    ///
    /// ## Example
    ///
    /// ```
    /// # use tracked_tempfile::{TempFile, Error};
    /// # let _ = tokio_test::block_on(async {
    /// let file = TempFile::new().await?;
    ///
    /// // The file exists.
    /// assert!(file.exists().await?);
    /// assert_eq!(file.size().await?, 0);
    ///
    /// // Deletes the file.
    /// file.delete().await?;
    /// assert!(!file.refresh().exists().await?);
    /// # Ok::<(), Error>(())
    /// # });
    /// ```
    pub async fn new() -> Result<Self> {
        TempFileRegistry::global().new_file().await
    }

    /// Creates a new, empty temporary file whose name ends in `.{extension}`.
    ///
    /// ## Example
    ///
    /// ```
    /// # use tracked_tempfile::{TempFile, Error};
    /// # let _ = tokio_test::block_on(async {
    /// let file = TempFile::with_extension("gif").await?;
    /// assert_eq!(file.file_path().extension().unwrap(), "gif");
    /// # Ok::<(), Error>(())
    /// # });
    /// ```
    pub async fn with_extension(extension: &str) -> Result<Self> {
        TempFileRegistry::global()
            .new_file_with_extension(extension)
            .await
    }

    /// Creates (or truncates) the file `name` directly in the system temp directory.
    ///
    /// ## Arguments
    ///
    /// * `name` - The file name. Must not contain a directory separator.
    pub async fn with_name<N: AsRef<str>>(name: N) -> Result<Self> {
        TempFileRegistry::global().new_file_with_name(name).await
    }

    /// Tracks an arbitrary path as a temporary file. The path does not need to exist yet.
    ///
    /// ## Errors
    ///
    /// [`Error::IsDirectory`] if `path` is a directory.
    pub async fn from_path<P: Into<PathBuf>>(path: P) -> Result<Self> {
        TempFileRegistry::global().from_path(path).await
    }

    /// Creates a new temporary file filled from `source`.
    ///
    /// ## Example
    ///
    /// ```
    /// # use tracked_tempfile::{Source, TempFile, Error};
    /// # let _ = tokio_test::block_on(async {
    /// let file = TempFile::for_source("file contents", Some("txt")).await?;
    /// assert_eq!(file.contents().await?, b"file contents");
    /// assert_eq!(file.size().await?, 13);
    /// # Ok::<(), Error>(())
    /// # });
    /// ```
    pub async fn for_source<'a, S: Into<Source<'a>>>(
        source: S,
        extension: Option<&str>,
    ) -> Result<Self> {
        TempFileRegistry::global()
            .new_file_for(source, extension)
            .await
    }

    /// Creates the named temporary file `name` filled from `source`.
    pub async fn with_name_for<'a, N: AsRef<str>, S: Into<Source<'a>>>(
        name: N,
        source: S,
    ) -> Result<Self> {
        TempFileRegistry::global()
            .new_file_with_name_for(name, source)
            .await
    }

    /// Deletes every file tracked by the global registry.
    ///
    /// Useful for long-running processes that want to clean up between units of work.
    pub fn purge() {
        TempFileRegistry::global().purge_all();
    }

    pub(crate) fn tracked(path: PathBuf) -> Self {
        Self {
            path,
            stat: Mutex::new(Stat::Unknown),
        }
    }

    /// Returns the path of the underlying temporary file.
    pub fn file_path(&self) -> &PathBuf {
        &self.path
    }

    /// Drops the cached metadata so that the next query reads the file system again.
    pub fn refresh(&self) -> &Self {
        *self.stat.lock() = Stat::Unknown;
        self
    }

    /// Returns the metadata of the file, as of the last refresh.
    ///
    /// Unlike [`Path::metadata`], the result is cached on the handle until
    /// [`TempFile::refresh`] is called.
    ///
    /// ## Errors
    ///
    /// [`Error::Io`] with [`ErrorKind::NotFound`] if the file did not exist.
    pub async fn metadata(&self) -> Result<Metadata> {
        match self.stat().await? {
            Stat::Present(metadata) => Ok(metadata),
            _ => Err(Error::Io(std::io::Error::new(
                ErrorKind::NotFound,
                format!("{} does not exist", self.path.display()),
            ))),
        }
    }

    /// Returns the size of the file in bytes, as of the last refresh.
    pub async fn size(&self) -> Result<u64> {
        Ok(self.metadata().await?.len())
    }

    /// Determines whether the file existed as of the last refresh.
    pub async fn exists(&self) -> Result<bool> {
        Ok(matches!(self.stat().await?, Stat::Present(_)))
    }

    /// Reads the full content of the file.
    pub async fn contents(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(&self.path).await?)
    }

    /// Deletes the file if it exists. Deleting an already deleted file does nothing.
    ///
    /// The path stays tracked; purging it later is harmless.
    pub async fn delete(&self) -> Result<&Self> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(self.refresh())
    }

    /// Opens the file in read-write mode.
    pub async fn open_rw(&self) -> Result<File> {
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .await?)
    }

    /// Opens the file in read-only mode.
    pub async fn open_ro(&self) -> Result<File> {
        Ok(OpenOptions::new().read(true).open(&self.path).await?)
    }

    async fn stat(&self) -> Result<Stat> {
        let cached = self.stat.lock().clone();
        if !matches!(cached, Stat::Unknown) {
            return Ok(cached);
        }

        let fresh = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => Stat::Present(metadata),
            Err(e) if e.kind() == ErrorKind::NotFound => Stat::Missing,
            Err(e) => return Err(e.into()),
        };
        *self.stat.lock() = fresh.clone();
        Ok(fresh)
    }
}

impl Debug for TempFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.path)
    }
}

/// Allows implicit treatment of TempFile as a Path.
impl Deref for TempFile {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.path
    }
}

impl Borrow<Path> for TempFile {
    fn borrow(&self) -> &Path {
        &self.path
    }
}

impl AsRef<Path> for TempFile {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RegistryConfig;

    #[tokio::test]
    async fn size_is_cached_until_refresh() -> Result<(), Error> {
        let registry = TempFileRegistry::new(RegistryConfig::default());
        let file = registry.new_file_for("foobar", None).await?;
        assert_eq!(file.size().await?, 6);

        tokio::fs::write(file.file_path(), b"foobarbaz").await?;

        assert_eq!(file.size().await?, 6);
        assert_eq!(file.metadata().await?.len(), 6);
        assert_eq!(file.refresh().size().await?, 9);
        assert_eq!(file.metadata().await?.len(), 9);
        Ok(())
    }

    #[tokio::test]
    async fn metadata_is_cached_until_refresh() -> Result<(), Error> {
        let registry = TempFileRegistry::new(RegistryConfig::default());
        let file = registry.new_file().await?;
        assert!(file.metadata().await?.is_file());

        tokio::fs::remove_file(file.file_path()).await?;

        // The handle still reports the stale metadata, the path itself does not.
        assert!(file.metadata().await.is_ok());
        assert!(file.file_path().metadata().is_err());
        assert!(matches!(
            file.refresh().metadata().await,
            Err(Error::Io(e)) if e.kind() == ErrorKind::NotFound
        ));
        Ok(())
    }

    #[tokio::test]
    async fn delete_twice_is_a_no_op() -> Result<(), Error> {
        let registry = TempFileRegistry::new(RegistryConfig::default());
        let file = registry.new_file_for("contents", None).await?;
        assert!(file.exists().await?);

        file.delete().await?;
        file.delete().await?;

        assert!(!file.exists().await?);
        assert!(!file.file_path().exists());
        assert!(file.size().await.is_err());
        Ok(())
    }
}
