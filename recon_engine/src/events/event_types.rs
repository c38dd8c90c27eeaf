use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::db_types::OrderNo;

/// An alarm raised by the reconciliation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmEvent {
    /// The order the alarm is about, when there is one. Sweep summaries carry no order number.
    pub order_no: Option<OrderNo>,
    pub merchant_id: Option<String>,
    pub message: String,
}

impl AlarmEvent {
    /// An alarm tied to a specific order and merchant.
    pub fn for_order(order_no: &OrderNo, merchant_id: &str, message: &str) -> Self {
        Self {
            order_no: Some(order_no.clone()),
            merchant_id: Some(merchant_id.to_string()),
            message: message.to_string(),
        }
    }

    /// A free-form alarm, e.g. a batch sweep summary.
    pub fn broadcast<S: Into<String>>(message: S) -> Self {
        Self { order_no: None, merchant_id: None, message: message.into() }
    }
}

impl Display for AlarmEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.order_no, &self.merchant_id) {
            (Some(order_no), Some(merchant_id)) => {
                write!(f, "[recon alarm] order: {order_no}, merchant: {merchant_id}, message: {}", self.message)
            },
            (Some(order_no), None) => write!(f, "[recon alarm] order: {order_no}, message: {}", self.message),
            _ => write!(f, "[recon alarm] {}", self.message),
        }
    }
}
