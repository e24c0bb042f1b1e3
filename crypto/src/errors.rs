use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Group validation failed: {0}")]
    GroupValidation(String),

    #[error("Proof invalid: {0}")]
    ProofInvalid(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CryptoError {
    pub fn parse(context: impl Into<String>) -> Self {
        Self::Parse(context.into())
    }

    pub fn invalid_input(context: impl Into<String>) -> Self {
        Self::InvalidInput(context.into())
    }

    pub fn proof_invalid(context: impl Into<String>) -> Self {
        Self::ProofInvalid(context.into())
    }
}

pub type Result<T> = std::result::Result<T, CryptoError>;

pub fn add_u64(a: u64, b: u64) -> Result<u64> {
    a.checked_add(b)
        .ok_or_else(|| CryptoError::ArithmeticOverflow(format!("{} + {}", a, b)))
}

pub fn sub_u64(a: u64, b: u64) -> Result<u64> {
    a.checked_sub(b)
        .ok_or_else(|| CryptoError::ArithmeticOverflow(format!("{} - {}", a, b)))
}
