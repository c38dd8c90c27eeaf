use chrono::{DateTime, NaiveDate, Utc};
use recon_common::Money;
use thiserror::Error;

use crate::db_types::{
    BusinessStatus,
    ExceptionRecord,
    NotifyLog,
    Order,
    OrderNo,
    ReconStatus,
    ReconSummary,
    RefundSplitSub,
    SplitSub,
};

/// The persistence port for the reconciliation engine.
///
/// Implementations provide durable storage for orders, split records, refund splits, exception
/// records and notification logs. Two contract points matter beyond plain CRUD:
///
/// * **Compound atomicity**: [`Self::insert_order_with_splits`] must commit the order and all of its
///   split records together or not at all. The default implementation chains the two single-table
///   saves and is only suitable for backends that serialize whole calls (such as the in-memory
///   backend); transactional backends should override it.
/// * **Guarded transitions**: [`Self::update_recon_status`] and [`Self::update_notify_status`] only
///   move a row *out of its non-terminal state* (`Pending` / `Processing`) and report whether a row
///   actually changed. This is the per-order serialization point that keeps the verdict monotonic
///   under concurrent notifications and batch sweeps.
#[allow(async_fn_in_trait)]
pub trait ReconBackend: Clone {
    /// The URL of the backing store.
    fn url(&self) -> &str;

    /// Inserts a new order row. Fails with [`ReconBackendError::OrderAlreadyExists`] if the order
    /// number is already present; existing rows are never overwritten.
    async fn save_order(&self, order: &Order) -> Result<(), ReconBackendError>;

    /// Inserts a batch of split records.
    async fn batch_save_split_subs(&self, subs: &[SplitSub]) -> Result<(), ReconBackendError>;

    /// Inserts an order together with its split records, all-or-nothing.
    async fn insert_order_with_splits(&self, order: &Order, subs: &[SplitSub]) -> Result<(), ReconBackendError> {
        self.save_order(order).await?;
        self.batch_save_split_subs(subs).await
    }

    /// Appends an exception record. Rows are immutable once written.
    async fn save_exception(&self, record: &ExceptionRecord) -> Result<(), ReconBackendError>;

    /// Appends a notification audit row.
    async fn save_notify_log(&self, log: &NotifyLog) -> Result<(), ReconBackendError>;

    /// Transitions the order's reconciliation verdict out of `Pending`.
    ///
    /// Returns `true` if the row was transitioned by this call, `false` if the order is missing or a
    /// terminal verdict had already been reached. At most one call per order ever returns `true` for
    /// a terminal target status.
    async fn update_recon_status(&self, order_no: &OrderNo, status: ReconStatus) -> Result<bool, ReconBackendError>;

    /// Transitions the order-level notification status out of `Processing`, storing the raw
    /// notification result alongside. Guarded like [`Self::update_recon_status`].
    async fn update_notify_status(
        &self,
        order_no: &OrderNo,
        status: BusinessStatus,
        result: Option<&str>,
    ) -> Result<bool, ReconBackendError>;

    /// Updates the notification status and raw result of one split record, identified by the
    /// `(order_no, merchant_id, sub_order_no)` scope. Returns whether a row matched.
    async fn update_split_sub_notify_status(
        &self,
        order_no: &OrderNo,
        merchant_id: &str,
        sub_order_no: &str,
        status: BusinessStatus,
        result: Option<&str>,
    ) -> Result<bool, ReconBackendError>;

    /// Resolves the parent order number from a merchant's sub-order number.
    async fn find_order_no_by_sub(
        &self,
        merchant_id: &str,
        sub_order_no: &str,
    ) -> Result<Option<OrderNo>, ReconBackendError>;

    /// Resolves the parent order number from a merchant's own order number.
    async fn find_order_no_by_merchant_order(
        &self,
        merchant_id: &str,
        merchant_order_no: &str,
    ) -> Result<Option<OrderNo>, ReconBackendError>;

    /// True when every split record under the order reports a successful notification. An order
    /// without split records is vacuously closed.
    async fn is_all_split_subs_notified(&self, order_no: &OrderNo) -> Result<bool, ReconBackendError>;

    async fn get_order(&self, order_no: &OrderNo) -> Result<Option<Order>, ReconBackendError>;

    async fn get_split_subs(&self, order_no: &OrderNo) -> Result<Vec<SplitSub>, ReconBackendError>;

    async fn get_refund_split_subs(&self, order_no: &OrderNo) -> Result<Vec<RefundSplitSub>, ReconBackendError>;

    async fn get_exceptions(&self, order_no: &OrderNo) -> Result<Vec<ExceptionRecord>, ReconBackendError>;

    async fn get_notify_logs(&self, order_no: &OrderNo) -> Result<Vec<NotifyLog>, ReconBackendError>;

    /// Pages through orders created on `date` whose verdict is still `Pending`, ordered by creation
    /// time.
    async fn list_pending_orders(
        &self,
        date: NaiveDate,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Order>, ReconBackendError>;

    /// Records the refund leg on the order: status, cumulative refunded amount and refund time.
    /// Returns whether the order existed. Refund state is independent of the reconciliation verdict
    /// and may be updated repeatedly.
    async fn update_recon_refund_status(
        &self,
        order_no: &OrderNo,
        status: BusinessStatus,
        amount: Money,
        time: DateTime<Utc>,
    ) -> Result<bool, ReconBackendError>;

    /// Inserts a batch of refund split records.
    async fn batch_save_refund_split_subs(&self, subs: &[RefundSplitSub]) -> Result<(), ReconBackendError>;

    /// Aggregates verdict counts and the total pay amount over orders created on `date`.
    async fn get_summary(&self, date: NaiveDate) -> Result<ReconSummary, ReconBackendError>;

    /// Pages through all orders created on `date`, ordered by creation time. `page` is 1-based.
    async fn list_orders(&self, date: NaiveDate, page: u32, size: u32) -> Result<Vec<Order>, ReconBackendError>;

    /// Closes the backing store.
    async fn close(&mut self) -> Result<(), ReconBackendError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ReconBackendError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Cannot insert order {0}, since it already exists")]
    OrderAlreadyExists(OrderNo),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderNo),
}

impl From<sqlx::Error> for ReconBackendError {
    fn from(e: sqlx::Error) -> Self {
        ReconBackendError::DatabaseError(e.to_string())
    }
}
