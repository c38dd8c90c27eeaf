use serde::{Deserialize, Serialize};

use crate::db_types::OrderNo;

/// The boundary outcome of a reconciliation call.
///
/// The engine never propagates faults to its callers: validation failures, unmatched lookups and
/// storage faults all come back as an unsuccessful result carrying a human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconResult {
    /// The order the call ended up operating on. Absent when the order could not be resolved.
    pub order_no: Option<OrderNo>,
    pub success: bool,
    pub message: String,
}

impl ReconResult {
    pub fn success(order_no: OrderNo) -> Self {
        Self { order_no: Some(order_no), success: true, message: "reconciled".to_string() }
    }

    pub fn failure<S: Into<String>>(order_no: OrderNo, message: S) -> Self {
        Self { order_no: Some(order_no), success: false, message: message.into() }
    }

    /// A failure for an event that could not be matched to any order. Unmatched events are a
    /// legitimate race with ingestion, not a data fault.
    pub fn unmatched<S: Into<String>>(message: S) -> Self {
        Self { order_no: None, success: false, message: message.into() }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}
