use sled::transaction::TransactionError;

/// Every failure an engine operation can report.
///
/// The first block are the expected business conditions; they never leave
/// partial state behind. The last three are infrastructure failures.
#[derive(thiserror::Error, Debug)]
pub enum MarketError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("cannot request a swap for your own item")]
    SelfSwapForbidden,
    #[error("item {0} is not available for swap")]
    ItemNotAvailable(String),
    #[error("offered item is not valid: {0}")]
    InvalidOfferedItem(String),
    #[error("insufficient points: requested {requested}, balance {balance}")]
    InsufficientPoints { requested: u64, balance: u64 },
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("swap was automatically rejected: {0}")]
    PreconditionChanged(String),
    #[error("item {0} is locked by a pending swap")]
    ItemLocked(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unauthorized")]
    Unauthorized,

    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("encoding error: {0}")]
    Encoding(String),
    #[error("crypto error: {0}")]
    Crypto(String),
}

pub type MarketResult<T> = Result<T, MarketError>;

impl MarketError {
    /// Stable machine-readable name, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            MarketError::NotFound(_) => "NotFound",
            MarketError::PermissionDenied(_) => "PermissionDenied",
            MarketError::SelfSwapForbidden => "SelfSwapForbidden",
            MarketError::ItemNotAvailable(_) => "ItemNotAvailable",
            MarketError::InvalidOfferedItem(_) => "InvalidOfferedItem",
            MarketError::InsufficientPoints { .. } => "InsufficientPoints",
            MarketError::InvalidState(_) => "InvalidState",
            MarketError::PreconditionChanged(_) => "PreconditionChanged",
            MarketError::ItemLocked(_) => "ItemLocked",
            MarketError::Validation(_) => "Validation",
            MarketError::Conflict(_) => "Conflict",
            MarketError::Unauthorized => "Unauthorized",
            MarketError::Storage(_) => "Storage",
            MarketError::Encoding(_) => "Encoding",
            MarketError::Crypto(_) => "Crypto",
        }
    }

    /// Infrastructure failures are surfaced generically and may be retried.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            MarketError::Storage(_) | MarketError::Encoding(_) | MarketError::Crypto(_)
        )
    }
}

impl From<TransactionError<MarketError>> for MarketError {
    fn from(value: TransactionError<MarketError>) -> Self {
        match value {
            TransactionError::Abort(err) => err,
            TransactionError::Storage(err) => MarketError::Storage(err),
        }
    }
}

impl From<minicbor::decode::Error> for MarketError {
    fn from(value: minicbor::decode::Error) -> Self {
        MarketError::Encoding(value.to_string())
    }
}

impl From<minicbor::encode::Error<std::convert::Infallible>> for MarketError {
    fn from(value: minicbor::encode::Error<std::convert::Infallible>) -> Self {
        MarketError::Encoding(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_abort_unwraps_to_the_domain_error() {
        let err: MarketError =
            TransactionError::Abort(MarketError::SelfSwapForbidden).into();
        assert!(matches!(err, MarketError::SelfSwapForbidden));
        assert_eq!(err.kind(), "SelfSwapForbidden");
        assert!(!err.is_infrastructure());
    }
}
