use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} choice: {value:?}")]
pub struct UnknownChoice {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownChoice {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("phone number must be exactly {expected} digits, got {actual:?}")]
    InvalidPhone { expected: usize, actual: String },
}
