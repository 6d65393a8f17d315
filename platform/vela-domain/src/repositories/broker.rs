use crate::value_objects::account::AccountSnapshot;
use crate::value_objects::order::{BrokerPosition, OrderAck, OrderRequest};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BrokerError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("broker returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode: {0}")]
    Decode(String),
    #[error("order rejected: {0}")]
    Rejected(String),
    #[error("no broker session")]
    NotConnected,
}

impl BrokerError {
    /// Worth another attempt: network hiccups and 5xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            BrokerError::Transport(_) => true,
            BrokerError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub trait Broker {
    fn account(&self) -> Result<AccountSnapshot, BrokerError>;
    fn submit_order(&self, order: &OrderRequest) -> Result<OrderAck, BrokerError>;
    /// `Ok(None)` when the account holds nothing in `symbol`.
    fn position(&self, symbol: &str) -> Result<Option<BrokerPosition>, BrokerError>;

    /// Latest close seen for `symbol`. Brokers that price orders themselves
    /// ignore it.
    fn observe_price(&self, _symbol: &str, _price: f64) -> Result<(), BrokerError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::BrokerError;

    #[test]
    fn only_transport_and_server_errors_retry() {
        assert!(BrokerError::Transport("reset".to_string()).is_retryable());
        assert!(BrokerError::Status {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(!BrokerError::Status {
            status: 422,
            body: "bad qty".to_string()
        }
        .is_retryable());
        assert!(!BrokerError::Rejected("halted".to_string()).is_retryable());
    }
}
