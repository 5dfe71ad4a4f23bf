//! Alert — a signalling event on a token, treated as a potential trade entry.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub call_id: String,
    pub caller_name: String,
    pub chain: String,
    pub token_address: String,
    pub alert_ts_ms: i64,
    /// Reference entry price, `p0`.
    pub alert_price: f64,
}

impl Alert {
    pub fn new(
        call_id: impl Into<String>,
        caller_name: impl Into<String>,
        chain: impl Into<String>,
        token_address: impl Into<String>,
        alert_ts_ms: i64,
        alert_price: f64,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            caller_name: caller_name.into(),
            chain: chain.into(),
            token_address: token_address.into(),
            alert_ts_ms,
            alert_price,
        }
    }
}
