//! # tracked-tempfile
//!
//! Provides the [`TempFile`] struct, a handle to a temporary file in the system
//! temp directory. Every file created through this crate is tracked by a
//! [`TempFileRegistry`] and removed when the registry is purged, either on
//! demand or automatically when the process exits.
//!
//! ```
//! use tracked_tempfile::TempFile;
//!
//! #[tokio::main]
//! async fn main() {
//!     let file = TempFile::for_source("file contents", Some("txt")).await.unwrap();
//!     assert!(file.file_path().is_file());
//!     assert_eq!(file.contents().await.unwrap(), b"file contents");
//!
//!     // Deletes every file created so far; this also happens at process exit.
//!     TempFile::purge();
//!     assert!(!file.file_path().is_file());
//! }
//! ```
//!
//! Long-running hosts that handle independent units of work can either call
//! [`TempFile::purge`] between them or give each unit its own
//! [`TempFileRegistry`], which purges its files when dropped.
//!
//! ## Features
//!
//! * `image` - (Default) Enables [`TempFile::image`] to generate image files,
//!             based on the [`image`](https://crates.io/crates/image) crate.
//! * `uuid` - Generates file names from random UUIDs based on the
//!            [`uuid`](https://crates.io/crates/uuid) crate.

// Document crate features on docs.rs.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unused_must_use)]
#![warn(missing_debug_implementations)]

mod allocate;
mod config;
mod errors;
#[cfg(feature = "image")]
mod image_file;
mod random_name;
mod registry;
mod source;
mod tempfile;
#[cfg(feature = "image")]
mod wbmp;

pub use config::RegistryConfig;
pub use errors::{Error, Result};
#[cfg(feature = "image")]
#[cfg_attr(docsrs, doc(cfg(feature = "image")))]
pub use image_file::{ImageFormat, ImageOptions};
pub use registry::TempFileRegistry;
pub use source::Source;
pub use tempfile::TempFile;
