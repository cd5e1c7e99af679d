//! Object keys within the container

use thiserror::Error;

/// Errors from building an object key
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("user identity is empty")]
    EmptyUser,

    #[error("file name is empty")]
    EmptyFileName,

    #[error("'{0}' contains a '.' or '..' path segment")]
    DotSegment(String),
}

/// Key of a stored object: `<user_identity>/<file_name>`.
///
/// Both parts are trimmed. No other escaping is done, so a `/` inside the
/// file name produces a nested pseudo-path and equal pairs always map to the
/// same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    key: String,
    user_len: usize,
}

impl ObjectKey {
    pub fn new(user_identity: &str, file_name: &str) -> Result<Self, KeyError> {
        let user = user_identity.trim();
        let file = file_name.trim();

        if user.is_empty() {
            return Err(KeyError::EmptyUser);
        }
        if file.is_empty() {
            return Err(KeyError::EmptyFileName);
        }

        // Blob URLs get dot segments normalised away, which would address a
        // different blob than the one named here.
        for part in [user, file] {
            if part.split('/').any(|segment| segment == "." || segment == "..") {
                return Err(KeyError::DotSegment(part.to_string()));
            }
        }

        Ok(Self {
            key: format!("{}/{}", user, file),
            user_len: user.len(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn user(&self) -> &str {
        &self.key[..self.user_len]
    }

    pub fn file_name(&self) -> &str {
        &self.key[self.user_len + 1..]
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}
