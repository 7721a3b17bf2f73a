use std::collections::BTreeMap;
use std::io;
use std::time::Duration;

use thiserror::Error;

/// An error that happens when loading a property of an entity.
///
/// These errors are stored in the cache like any other property value, so a property that
/// failed to load reads back as the error instead of a missing value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// The entity does not exist.
    #[error("not found")]
    NotFound,
    /// The property could not be loaded due to missing permissions.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// Loading the property did not finish in time.
    #[error("load timed out after {0:?}")]
    Timeout(Duration),
    /// The provider failed to load the property, for example due to an I/O error.
    #[error("load failed: {0}")]
    LoadError(String),
    /// The property was loaded, but its value is invalid in some way.
    #[error("malformed: {0}")]
    Malformed(String),
    /// The provider does not know the requested property.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// An unexpected error in the cache itself.
    #[error("internal error")]
    InternalError,
}

impl From<io::Error> for PropertyError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            _ => Self::LoadError(err.to_string()),
        }
    }
}

/// The cached state of one property: either its value, or the reason it could not be loaded.
pub type PropertyEntry<V> = Result<V, PropertyError>;

/// Property entries keyed by property name.
pub type PropertyMap<V> = BTreeMap<String, PropertyEntry<V>>;
