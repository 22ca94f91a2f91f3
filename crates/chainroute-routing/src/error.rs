use chainroute_core::ChainId;

/// Errors that can occur while registering chains or ranking candidates.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("no enabled settlement backend can take this payment")]
    NoAvailableBackend,

    #[error("chain already registered: {0}")]
    DuplicateChainId(ChainId),

    #[error("chain not found: {0}")]
    ChainNotFound(ChainId),

    #[error("invalid chain profile {id}: {reason}")]
    InvalidChainProfile { id: ChainId, reason: String },

    #[error("no exchange rate for currency: {0}")]
    UnsupportedCurrency(String),

    #[error("exchange rate feed error: {0}")]
    RateFeed(String),
}
