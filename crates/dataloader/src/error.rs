/// Failures produced by the loader machinery itself, independent of what the
/// underlying [`Loader`](crate::Loader) fetches.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The owning scope was cancelled before the value was loaded.
    #[error("request cancelled before the value was loaded")]
    Cancelled,
    /// The loader returned a batch without an entry for the requested key.
    #[error("loader produced no value for the requested key")]
    MissingValue,
}
