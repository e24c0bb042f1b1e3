use privacy_crypto::CryptoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TxError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("Duplicate {kind} at index {index}")]
    Duplicate { kind: &'static str, index: String },

    #[error("Insufficient funds: need {required}, have {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("Ledger lookup failed: {0}")]
    Ledger(String),

    #[error("Sanity check failed: {0}")]
    Sanity(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TxError {
    pub fn sanity(context: impl Into<String>) -> Self {
        Self::Sanity(context.into())
    }

    pub fn ledger(context: impl Into<String>) -> Self {
        Self::Ledger(context.into())
    }
}

pub type Result<T> = std::result::Result<T, TxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_error_passes_through() {
        let err: TxError = CryptoError::parse("coin bytes are empty").into();
        assert!(matches!(err, TxError::Crypto(CryptoError::Parse(_))));
        assert_eq!(err.to_string(), "Parse error: coin bytes are empty");
    }

    #[test]
    fn test_error_messages_name_the_stage() {
        let err = TxError::Duplicate {
            kind: "serial number",
            index: "ab".into(),
        };
        assert_eq!(err.to_string(), "Duplicate serial number at index ab");

        let err = TxError::InsufficientFunds {
            required: 105,
            available: 100,
        };
        assert!(err.to_string().contains("need 105"));
    }
}
