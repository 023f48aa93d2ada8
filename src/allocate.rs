use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs::OpenOptions;

use crate::random_name::RandomName;
use crate::{Error, Result, Source, TempFile, TempFileRegistry};

/// Characters that would let a name escape the temp directory.
#[cfg(windows)]
const SEPARATORS: &[char] = &['/', '\\'];
#[cfg(not(windows))]
const SEPARATORS: &[char] = &['/'];

impl TempFileRegistry {
    /// Creates a new, uniquely named empty file in the configured directory.
    ///
    /// Uniqueness is guaranteed by exclusive creation; a name that already
    /// exists is discarded and another one is generated.
    pub async fn new_file(&self) -> Result<TempFile> {
        let path = self.allocate().await?;
        self.register(path.clone());
        Ok(TempFile::tracked(path))
    }

    /// Creates a new, uniquely named empty file whose name ends in `.{extension}`.
    ///
    /// If the rename that appends the extension fails, the file created under
    /// the bare name is left behind untracked.
    pub async fn new_file_with_extension(&self, extension: &str) -> Result<TempFile> {
        validate_name(extension)?;

        let original = self.allocate().await?;
        let mut renamed = original.clone().into_os_string();
        renamed.push(".");
        renamed.push(extension);
        let renamed = PathBuf::from(renamed);

        if let Err(source) = tokio::fs::rename(&original, &renamed).await {
            tracing::warn!(path = %original.display(), error = %source, "Unable to add extension to temporary file");
            return Err(Error::Allocation {
                path: renamed,
                source,
            });
        }

        self.register(renamed.clone());
        Ok(TempFile::tracked(renamed))
    }

    /// Creates the file `name` directly in the configured directory, truncating
    /// any file that already exists under that name.
    ///
    /// ## Errors
    ///
    /// [`Error::InvalidName`] if `name` is empty, `.`/`..`, or contains a directory separator.
    pub async fn new_file_with_name<N: AsRef<str>>(&self, name: N) -> Result<TempFile> {
        let name = name.as_ref();
        validate_name(name)?;

        let path = self.config().dir().join(name);
        if let Err(source) = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .await
        {
            return Err(if path.is_dir() {
                Error::IsDirectory(path)
            } else {
                Error::Allocation { path, source }
            });
        }

        self.register(path.clone());
        Ok(TempFile::tracked(path))
    }

    /// Tracks an arbitrary path. Nothing is created; the path may not exist yet.
    ///
    /// ## Errors
    ///
    /// [`Error::IsDirectory`] if `path` is a directory.
    pub async fn from_path<P: Into<PathBuf>>(&self, path: P) -> Result<TempFile> {
        let path = path.into();
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => return Err(Error::IsDirectory(path)),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.register(path.clone());
        Ok(TempFile::tracked(path))
    }

    /// Creates a new temporary file, optionally with an extension, and fills it from `source`.
    pub async fn new_file_for<'a, S: Into<Source<'a>>>(
        &self,
        source: S,
        extension: Option<&str>,
    ) -> Result<TempFile> {
        let file = match extension {
            Some(extension) => self.new_file_with_extension(extension).await?,
            None => self.new_file().await?,
        };
        file.fill(source).await?;
        Ok(file)
    }

    /// Creates the named temporary file `name` and fills it from `source`.
    pub async fn new_file_with_name_for<'a, N: AsRef<str>, S: Into<Source<'a>>>(
        &self,
        name: N,
        source: S,
    ) -> Result<TempFile> {
        let file = self.new_file_with_name(name).await?;
        file.fill(source).await?;
        Ok(file)
    }

    /// Reserves a fresh path by exclusively creating an empty file under a generated name.
    async fn allocate(&self) -> Result<PathBuf> {
        let config = self.config();
        let mut attempts = 0;
        loop {
            attempts += 1;
            let name = RandomName::new(config.prefix());
            let path = config.dir().join(name.as_ref());

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(_) => {
                    tracing::debug!(path = %path.display(), "Allocated temporary file");
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempts < config.max_attempts() => {
                    continue;
                }
                Err(source) => return Err(Error::Allocation { path, source }),
            }
        }
    }
}

/// Checks a caller-supplied file name (or extension) for directory traversal.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_name(name, "name is empty"));
    }
    if name == "." || name == ".." {
        return Err(Error::invalid_name(name, "name refers to a directory"));
    }
    if name.contains(SEPARATORS) {
        return Err(Error::invalid_name(name, "name contains a directory separator"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_separators() {
        assert!(matches!(
            validate_name("some/dir/file.txt"),
            Err(Error::InvalidName { .. })
        ));
        assert!(matches!(validate_name(".."), Err(Error::InvalidName { .. })));
        assert!(matches!(validate_name(""), Err(Error::InvalidName { .. })));
        assert!(validate_name("some-file.txt").is_ok());
    }
}
