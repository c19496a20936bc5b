//! The remote file store trait.

use std::future::Future;
use std::pin::Pin;

use craftdeploy_protocol::panel::FileAttributes;

use crate::error::FileStoreError;

/// Boxed future returned by [`FileStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, FileStoreError>> + Send + 'a>>;

/// One game server's remote file system.
///
/// `directory` arguments are raw query values: implementations append them
/// verbatim, so callers control the exact encoding the store receives.
/// `None` means "send no directory parameter" (the store root).
///
/// The service implements this over HTTP; keeping it a trait keeps the
/// placement logic testable against mocks.
pub trait FileStore: Send + Sync {
    /// Lists a directory.
    fn list_directory(&self, directory: Option<&str>) -> StoreFuture<'_, Vec<FileAttributes>>;

    /// Requests a one-shot upload endpoint.
    fn upload_target(&self, directory: Option<&str>) -> StoreFuture<'_, String>;

    /// Posts `bytes` as a multipart file named `file_name` to an upload endpoint.
    fn upload(&self, url: &str, file_name: &str, bytes: &[u8]) -> StoreFuture<'_, ()>;

    /// Creates folder `name` inside `path`.
    fn create_folder(&self, name: &str, path: &str) -> StoreFuture<'_, ()>;

    /// Renames/moves `from` to `to`, both relative to `root`.
    fn rename(&self, root: &str, from: &str, to: &str) -> StoreFuture<'_, ()>;

    /// Deletes `files` inside `root`.
    fn delete(&self, root: &str, files: &[String]) -> StoreFuture<'_, ()>;

    /// Returns the server's identifier.
    fn server_id(&self) -> &str;
}
