use thiserror::Error;

/// Error type for parsing molecules and patterns and for reading parameter files.
#[derive(Debug, Error)]
pub enum FragmentError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("invalid SMILES '{input}' at position {pos}: {msg}")]
    Smiles {
        input: String,
        pos: usize,
        msg: String,
    },
    #[error("invalid SMARTS '{input}' at position {pos}: {msg}")]
    Smarts {
        input: String,
        pos: usize,
        msg: String,
    },
    #[error("functional group with id {0} is not part of the catalog")]
    UnknownGroupId(u32),
    #[error("functional group '{0}' is not part of the catalog")]
    UnknownGroup(String),
    #[error("no chemical found for identifier '{0}'")]
    UnknownChemical(String),
}

/// Convenience type for `Result<T, FragmentError>`.
pub type FragmentResult<T> = Result<T, FragmentError>;

impl FragmentError {
    pub(crate) fn smiles(input: &[u8], pos: usize, msg: impl Into<String>) -> Self {
        Self::Smiles {
            input: String::from_utf8_lossy(input).into_owned(),
            pos,
            msg: msg.into(),
        }
    }

    pub(crate) fn smarts(input: &[u8], pos: usize, msg: impl Into<String>) -> Self {
        Self::Smarts {
            input: String::from_utf8_lossy(input).into_owned(),
            pos,
            msg: msg.into(),
        }
    }
}
