//! `SqliteBackend` is a concrete implementation of the reconciliation persistence port.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements the [`ReconBackend`] trait on top of
//! the query functions in [`super::db`].
use std::fmt::Debug;

use chrono::{DateTime, NaiveDate, Utc};
use log::*;
use recon_common::Money;
use sqlx::SqlitePool;

use super::db::{db_url, exceptions, new_pool, notify_logs, orders, refunds, split_subs};
use crate::{
    db_types::{
        BusinessStatus,
        ExceptionRecord,
        NotifyLog,
        Order,
        OrderNo,
        ReconStatus,
        ReconSummary,
        RefundSplitSub,
        SplitSub,
    },
    traits::{ReconBackend, ReconBackendError},
};

#[derive(Clone)]
pub struct SqliteBackend {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteBackend ({:?})", self.pool)
    }
}

impl SqliteBackend {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, ReconBackendError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    /// Connects to the database named by `RECON_DATABASE_URL`, falling back to the default path.
    pub async fn new_default(max_connections: u32) -> Result<Self, ReconBackendError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies the embedded schema migrations.
    pub async fn run_migrations(&self) -> Result<(), ReconBackendError> {
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ReconBackendError::DatabaseError(e.to_string()))?;
        info!("🗃️ Migrations complete");
        Ok(())
    }
}

impl ReconBackend for SqliteBackend {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn save_order(&self, order: &Order) -> Result<(), ReconBackendError> {
        let mut conn = self.pool.acquire().await?;
        orders::insert_order(order, &mut conn).await
    }

    async fn batch_save_split_subs(&self, subs: &[SplitSub]) -> Result<(), ReconBackendError> {
        let mut conn = self.pool.acquire().await?;
        split_subs::insert_split_subs(subs, &mut conn).await?;
        Ok(())
    }

    /// The order row and all of its split records are committed in one transaction.
    async fn insert_order_with_splits(&self, order: &Order, subs: &[SplitSub]) -> Result<(), ReconBackendError> {
        let mut tx = self.pool.begin().await?;
        orders::insert_order(order, &mut tx).await?;
        split_subs::insert_split_subs(subs, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order [{}] saved with {} splits", order.order_no, subs.len());
        Ok(())
    }

    async fn save_exception(&self, record: &ExceptionRecord) -> Result<(), ReconBackendError> {
        let mut conn = self.pool.acquire().await?;
        exceptions::insert_exception(record, &mut conn).await?;
        Ok(())
    }

    async fn save_notify_log(&self, log: &NotifyLog) -> Result<(), ReconBackendError> {
        let mut conn = self.pool.acquire().await?;
        notify_logs::insert_notify_log(log, &mut conn).await?;
        Ok(())
    }

    async fn update_recon_status(&self, order_no: &OrderNo, status: ReconStatus) -> Result<bool, ReconBackendError> {
        let mut conn = self.pool.acquire().await?;
        let changed = orders::update_recon_status(order_no, status, &mut conn).await?;
        if changed {
            debug!("🗃️ Order [{order_no}] verdict is now {status}");
        }
        Ok(changed)
    }

    async fn update_notify_status(
        &self,
        order_no: &OrderNo,
        status: BusinessStatus,
        result: Option<&str>,
    ) -> Result<bool, ReconBackendError> {
        let mut conn = self.pool.acquire().await?;
        let changed = orders::update_notify_status(order_no, status, result, &mut conn).await?;
        Ok(changed)
    }

    async fn update_split_sub_notify_status(
        &self,
        order_no: &OrderNo,
        merchant_id: &str,
        sub_order_no: &str,
        status: BusinessStatus,
        result: Option<&str>,
    ) -> Result<bool, ReconBackendError> {
        let mut conn = self.pool.acquire().await?;
        let changed =
            split_subs::update_split_sub_notify_status(order_no, merchant_id, sub_order_no, status, result, &mut conn)
                .await?;
        Ok(changed)
    }

    async fn find_order_no_by_sub(
        &self,
        merchant_id: &str,
        sub_order_no: &str,
    ) -> Result<Option<OrderNo>, ReconBackendError> {
        let mut conn = self.pool.acquire().await?;
        let order_no = split_subs::find_order_no_by_sub(merchant_id, sub_order_no, &mut conn).await?;
        Ok(order_no)
    }

    async fn find_order_no_by_merchant_order(
        &self,
        merchant_id: &str,
        merchant_order_no: &str,
    ) -> Result<Option<OrderNo>, ReconBackendError> {
        let mut conn = self.pool.acquire().await?;
        let order_no = split_subs::find_order_no_by_merchant_order(merchant_id, merchant_order_no, &mut conn).await?;
        Ok(order_no)
    }

    async fn is_all_split_subs_notified(&self, order_no: &OrderNo) -> Result<bool, ReconBackendError> {
        let mut conn = self.pool.acquire().await?;
        let all = split_subs::is_all_notified(order_no, &mut conn).await?;
        Ok(all)
    }

    async fn get_order(&self, order_no: &OrderNo) -> Result<Option<Order>, ReconBackendError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_no(order_no, &mut conn).await?;
        Ok(order)
    }

    async fn get_split_subs(&self, order_no: &OrderNo) -> Result<Vec<SplitSub>, ReconBackendError> {
        let mut conn = self.pool.acquire().await?;
        let subs = split_subs::fetch_split_subs(order_no, &mut conn).await?;
        Ok(subs)
    }

    async fn get_refund_split_subs(&self, order_no: &OrderNo) -> Result<Vec<RefundSplitSub>, ReconBackendError> {
        let mut conn = self.pool.acquire().await?;
        let subs = refunds::fetch_refund_split_subs(order_no, &mut conn).await?;
        Ok(subs)
    }

    async fn get_exceptions(&self, order_no: &OrderNo) -> Result<Vec<ExceptionRecord>, ReconBackendError> {
        let mut conn = self.pool.acquire().await?;
        let records = exceptions::fetch_exceptions(order_no, &mut conn).await?;
        Ok(records)
    }

    async fn get_notify_logs(&self, order_no: &OrderNo) -> Result<Vec<NotifyLog>, ReconBackendError> {
        let mut conn = self.pool.acquire().await?;
        let logs = notify_logs::fetch_notify_logs(order_no, &mut conn).await?;
        Ok(logs)
    }

    async fn list_pending_orders(
        &self,
        date: NaiveDate,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Order>, ReconBackendError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_pending_orders(date, offset, limit, &mut conn).await?;
        Ok(orders)
    }

    async fn update_recon_refund_status(
        &self,
        order_no: &OrderNo,
        status: BusinessStatus,
        amount: Money,
        time: DateTime<Utc>,
    ) -> Result<bool, ReconBackendError> {
        let mut conn = self.pool.acquire().await?;
        let updated = orders::update_refund_status(order_no, status, amount, time, &mut conn).await?;
        Ok(updated)
    }

    async fn batch_save_refund_split_subs(&self, subs: &[RefundSplitSub]) -> Result<(), ReconBackendError> {
        let mut conn = self.pool.acquire().await?;
        refunds::insert_refund_split_subs(subs, &mut conn).await?;
        Ok(())
    }

    async fn get_summary(&self, date: NaiveDate) -> Result<ReconSummary, ReconBackendError> {
        let mut conn = self.pool.acquire().await?;
        let summary = orders::fetch_summary(date, &mut conn).await?;
        Ok(summary)
    }

    async fn list_orders(&self, date: NaiveDate, page: u32, size: u32) -> Result<Vec<Order>, ReconBackendError> {
        let mut conn = self.pool.acquire().await?;
        let offset = page.saturating_sub(1) * size;
        let orders = orders::fetch_orders_by_date(date, offset, size, &mut conn).await?;
        Ok(orders)
    }

    async fn close(&mut self) -> Result<(), ReconBackendError> {
        self.pool.close().await;
        Ok(())
    }
}
