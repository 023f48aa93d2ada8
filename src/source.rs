use std::fmt::{Debug, Formatter};
use std::path::Path;
use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::{Error, Result, TempFile};

/// Content a temporary file can be filled with.
///
/// `&str`, `&[u8]` and `&Vec<u8>` convert into [`Source::Bytes`], `&Path`
/// into [`Source::File`].
pub enum Source<'a> {
    /// Leaves the file empty.
    Empty,
    /// A raw payload written as-is.
    Bytes(&'a [u8]),
    /// A stream read to exhaustion from its current position.
    /// The stream is borrowed; closing it remains the caller's job.
    Stream(&'a mut (dyn AsyncRead + Unpin + Send)),
    /// An existing file copied byte for byte.
    File(&'a Path),
}

impl<'a> Source<'a> {
    /// Wraps a readable stream.
    pub fn stream<R: AsyncRead + Unpin + Send>(reader: &'a mut R) -> Self {
        Self::Stream(reader)
    }
}

impl<'a> From<&'a [u8]> for Source<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Source<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for Source<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a> From<&'a str> for Source<'a> {
    fn from(text: &'a str) -> Self {
        Self::Bytes(text.as_bytes())
    }
}

impl<'a> From<&'a String> for Source<'a> {
    fn from(text: &'a String) -> Self {
        Self::Bytes(text.as_bytes())
    }
}

impl<'a> From<&'a Path> for Source<'a> {
    fn from(path: &'a Path) -> Self {
        Self::File(path)
    }
}

impl<'a> From<&'a TempFile> for Source<'a> {
    fn from(file: &'a TempFile) -> Self {
        Self::File(file.file_path())
    }
}

impl Debug for Source<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Self::Stream(_) => f.write_str("Stream"),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

impl TempFile {
    /// Replaces the content of the file with `source` and refreshes the handle.
    ///
    /// ## Example
    ///
    /// ```
    /// # use tracked_tempfile::{Source, TempFile, Error};
    /// # let _ = tokio_test::block_on(async {
    /// let file = TempFile::new().await?;
    /// file.fill("first").await?;
    /// file.fill(b"second").await?;
    /// assert_eq!(file.contents().await?, b"second");
    ///
    /// file.fill(Source::Empty).await?;
    /// assert_eq!(file.size().await?, 0);
    /// # Ok::<(), Error>(())
    /// # });
    /// ```
    pub async fn fill<'a, S: Into<Source<'a>>>(&self, source: S) -> Result<&Self> {
        match source.into() {
            Source::Empty => self.fill_empty().await,
            Source::Bytes(bytes) => self.fill_from_bytes(bytes).await,
            Source::Stream(stream) => self.fill_from_stream(stream).await,
            Source::File(path) => self.fill_from_file(path).await,
        }
    }

    /// Leaves the content untouched. A freshly allocated file is already empty.
    pub async fn fill_empty(&self) -> Result<&Self> {
        Ok(self)
    }

    /// Overwrites the file with `bytes`.
    pub async fn fill_from_bytes(&self, bytes: &[u8]) -> Result<&Self> {
        tokio::fs::write(self.file_path(), bytes)
            .await
            .map_err(|source| self.write_error(source))?;

        tracing::debug!(path = %self.file_path().display(), len = bytes.len(), "Filled temporary file");
        Ok(self.refresh())
    }

    /// Overwrites the file with everything that remains in `stream`.
    pub async fn fill_from_stream<R>(&self, stream: &mut R) -> Result<&Self>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut file = tokio::fs::File::create(self.file_path())
            .await
            .map_err(|source| self.write_error(source))?;
        let len = tokio::io::copy(stream, &mut file)
            .await
            .map_err(|source| self.write_error(source))?;
        file.flush().await.map_err(|source| self.write_error(source))?;

        tracing::debug!(path = %self.file_path().display(), len, "Filled temporary file from stream");
        Ok(self.refresh())
    }

    /// Overwrites the file with a copy of `source`.
    ///
    /// The permission bits of `source` are carried over where the platform supports it.
    /// Copying the file onto itself leaves it untouched.
    pub async fn fill_from_file<P: AsRef<Path>>(&self, source: P) -> Result<&Self> {
        let from = source.as_ref();
        // Copying truncates the destination first, which would empty a self-copy.
        if same_file(from, self.file_path()).await {
            tracing::debug!(path = %self.file_path().display(), "Skipped copying temporary file onto itself");
            return Ok(self.refresh());
        }

        let len = tokio::fs::copy(from, self.file_path())
            .await
            .map_err(|source| Error::Copy {
                from: from.to_path_buf(),
                to: self.file_path().clone(),
                source,
            })?;

        tracing::debug!(path = %self.file_path().display(), from = %from.display(), len, "Filled temporary file from file");
        Ok(self.refresh())
    }

    fn write_error(&self, source: std::io::Error) -> Error {
        Error::Write {
            path: self.file_path().clone(),
            source,
        }
    }
}

/// Determines whether both paths name the same existing file, following links.
async fn same_file(a: &Path, b: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        match (tokio::fs::metadata(a).await, tokio::fs::metadata(b).await) {
            (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
            _ => false,
        }
    }

    #[cfg(not(unix))]
    {
        match (
            tokio::fs::canonicalize(a).await,
            tokio::fs::canonicalize(b).await,
        ) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RegistryConfig, TempFileRegistry};

    #[tokio::test]
    async fn bytes_replace_previous_content() -> Result<(), Error> {
        let registry = TempFileRegistry::new(RegistryConfig::default());
        let file = registry.new_file_for("a much longer first payload", None).await?;

        file.fill("short").await?;

        assert_eq!(file.contents().await?, b"short");
        assert_eq!(file.size().await?, 5);
        Ok(())
    }

    #[tokio::test]
    async fn stream_is_read_from_its_current_position() -> Result<(), Error> {
        let registry = TempFileRegistry::new(RegistryConfig::default());
        let file = registry.new_file().await?;

        let mut stream = std::io::Cursor::new(b"skipped|kept".to_vec());
        stream.set_position(8);
        file.fill(Source::stream(&mut stream)).await?;

        assert_eq!(file.contents().await?, b"kept");
        Ok(())
    }

    #[tokio::test]
    async fn copying_a_file_onto_itself_keeps_its_content() -> Result<(), Error> {
        let registry = TempFileRegistry::new(RegistryConfig::default());
        let file = registry.new_file_for("precious", None).await?;

        file.fill(&file).await?;
        assert_eq!(file.contents().await?, b"precious");

        // A differently spelled path to the same file is detected as well.
        let dir = file.file_path().parent().unwrap();
        let name = file.file_path().file_name().unwrap();
        let dotted = dir.join(".").join(name);
        file.fill(dotted.as_path()).await?;

        assert_eq!(file.contents().await?, b"precious");
        assert_eq!(file.size().await?, 8);
        Ok(())
    }

    #[tokio::test]
    async fn missing_source_file_is_a_copy_error() -> Result<(), Error> {
        let registry = TempFileRegistry::new(RegistryConfig::default());
        let file = registry.new_file().await?;

        let missing = registry.config().dir().join(format!("ttmp_missing_{}", std::process::id()));
        let result = file.fill(missing.as_path()).await;

        assert!(matches!(result, Err(Error::Copy { .. })));
        Ok(())
    }
}
