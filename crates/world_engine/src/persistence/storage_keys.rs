use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageKeyError {
    #[error("storage key must not be empty")]
    Empty,
    #[error("storage key must not contain '..'")]
    ParentTraversal,
    #[error("storage key contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

/// Keys double as file stems for [`super::FileStorage`], so they are limited
/// to lowercase ASCII, digits, `_` and `-`.
pub fn validate_storage_key(key: &str) -> Result<(), StorageKeyError> {
    if key.is_empty() {
        return Err(StorageKeyError::Empty);
    }
    if key.contains("..") {
        return Err(StorageKeyError::ParentTraversal);
    }
    match key
        .chars()
        .find(|ch| !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '-')))
    {
        Some(character) => Err(StorageKeyError::InvalidCharacter { character }),
        None => Ok(()),
    }
}
