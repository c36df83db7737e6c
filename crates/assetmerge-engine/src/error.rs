use assetmerge_core::AssetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DedupError {
    #[error(transparent)]
    Store(#[from] AssetError),

    #[error("duplicate group has no members")]
    EmptyGroup,

    #[error("unknown grouping strategy: {0}")]
    UnknownStrategy(String),
}

impl DedupError {
    /// Fatal errors abort a whole run; anything else only fails the group
    /// being processed.
    pub fn is_fatal(&self) -> bool {
        match self {
            DedupError::Store(err) => err.is_fatal(),
            DedupError::EmptyGroup | DedupError::UnknownStrategy(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, DedupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_keep_their_classification() {
        assert!(DedupError::from(AssetError::MissingTable("assets".into())).is_fatal());
        assert!(!DedupError::from(AssetError::AssetNotFound(3)).is_fatal());
        assert!(!DedupError::EmptyGroup.is_fatal());
    }
}
