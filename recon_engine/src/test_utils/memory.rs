//! An in-memory implementation of the persistence port.
//!
//! Used by the test suites as a stand-in for a real database. A single mutex serialises every call,
//! which trivially satisfies the port's atomicity and guarded-transition contract; the guards are
//! still implemented faithfully so that transition semantics can be tested against this backend.
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, NaiveDate, Utc};
use recon_common::Money;

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

const MEMORY_URL: &str = "memory://recon";

#[derive(Default)]
struct Inner {
    orders: BTreeMap<OrderNo, Order>,
    split_subs: Vec<SplitSub>,
    refund_split_subs: Vec<RefundSplitSub>,
    exceptions: Vec<ExceptionRecord>,
    notify_logs: Vec<NotifyLog>,
}

#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory backend lock poisoned")
    }
}

impl ReconBackend for MemoryBackend {
    fn url(&self) -> &str {
        MEMORY_URL
    }

    async fn save_order(&self, order: &Order) -> Result<(), ReconBackendError> {
        let mut inner = self.lock();
        if inner.orders.contains_key(&order.order_no) {
            return Err(ReconBackendError::OrderAlreadyExists(order.order_no.clone()));
        }
        inner.orders.insert(order.order_no.clone(), order.clone());
        Ok(())
    }

    async fn batch_save_split_subs(&self, subs: &[SplitSub]) -> Result<(), ReconBackendError> {
        self.lock().split_subs.extend_from_slice(subs);
        Ok(())
    }

    async fn save_exception(&self, record: &ExceptionRecord) -> Result<(), ReconBackendError> {
        self.lock().exceptions.push(record.clone());
        Ok(())
    }

    async fn save_notify_log(&self, log: &NotifyLog) -> Result<(), ReconBackendError> {
        self.lock().notify_logs.push(log.clone());
        Ok(())
    }

    async fn update_recon_status(&self, order_no: &OrderNo, status: ReconStatus) -> Result<bool, ReconBackendError> {
        let mut inner = self.lock();
        match inner.orders.get_mut(order_no) {
            Some(order) if order.recon_status == ReconStatus::Pending => {
                order.recon_status = status;
                order.updated_at = Utc::now();
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    async fn update_notify_status(
        &self,
        order_no: &OrderNo,
        status: BusinessStatus,
        result: Option<&str>,
    ) -> Result<bool, ReconBackendError> {
        let mut inner = self.lock();
        match inner.orders.get_mut(order_no) {
            Some(order) if order.notify_status == BusinessStatus::Processing => {
                order.notify_status = status;
                order.notify_result = result.map(String::from);
                order.updated_at = Utc::now();
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    async fn update_split_sub_notify_status(
        &self,
        order_no: &OrderNo,
        merchant_id: &str,
        sub_order_no: &str,
        status: BusinessStatus,
        result: Option<&str>,
    ) -> Result<bool, ReconBackendError> {
        let mut inner = self.lock();
        let found = inner.split_subs.iter_mut().find(|s| {
            &s.order_no == order_no && s.merchant_id == merchant_id && s.sub_order_no == sub_order_no
        });
        match found {
            Some(sub) => {
                sub.notify_status = status;
                sub.notify_result = result.map(String::from);
                sub.updated_at = Utc::now();
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn find_order_no_by_sub(
        &self,
        merchant_id: &str,
        sub_order_no: &str,
    ) -> Result<Option<OrderNo>, ReconBackendError> {
        let inner = self.lock();
        Ok(inner
            .split_subs
            .iter()
            .find(|s| s.merchant_id == merchant_id && s.sub_order_no == sub_order_no)
            .map(|s| s.order_no.clone()))
    }

    async fn find_order_no_by_merchant_order(
        &self,
        merchant_id: &str,
        merchant_order_no: &str,
    ) -> Result<Option<OrderNo>, ReconBackendError> {
        let inner = self.lock();
        Ok(inner
            .split_subs
            .iter()
            .find(|s| s.merchant_id == merchant_id && s.merchant_order_no.as_deref() == Some(merchant_order_no))
            .map(|s| s.order_no.clone()))
    }

    async fn is_all_split_subs_notified(&self, order_no: &OrderNo) -> Result<bool, ReconBackendError> {
        let inner = self.lock();
        Ok(inner
            .split_subs
            .iter()
            .filter(|s| &s.order_no == order_no)
            .all(|s| s.notify_status == BusinessStatus::Success))
    }

    async fn get_order(&self, order_no: &OrderNo) -> Result<Option<Order>, ReconBackendError> {
        Ok(self.lock().orders.get(order_no).cloned())
    }

    async fn get_split_subs(&self, order_no: &OrderNo) -> Result<Vec<SplitSub>, ReconBackendError> {
        let inner = self.lock();
        Ok(inner.split_subs.iter().filter(|s| &s.order_no == order_no).cloned().collect())
    }

    async fn get_refund_split_subs(&self, order_no: &OrderNo) -> Result<Vec<RefundSplitSub>, ReconBackendError> {
        let inner = self.lock();
        Ok(inner.refund_split_subs.iter().filter(|s| &s.order_no == order_no).cloned().collect())
    }

    async fn get_exceptions(&self, order_no: &OrderNo) -> Result<Vec<ExceptionRecord>, ReconBackendError> {
        let inner = self.lock();
        Ok(inner.exceptions.iter().filter(|e| &e.order_no == order_no).cloned().collect())
    }

    async fn get_notify_logs(&self, order_no: &OrderNo) -> Result<Vec<NotifyLog>, ReconBackendError> {
        let inner = self.lock();
        Ok(inner.notify_logs.iter().filter(|l| &l.order_no == order_no).cloned().collect())
    }

    async fn list_pending_orders(
        &self,
        date: NaiveDate,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Order>, ReconBackendError> {
        let inner = self.lock();
        let mut pending = inner
            .orders
            .values()
            .filter(|o| o.recon_status == ReconStatus::Pending && o.created_at.date_naive() == date)
            .cloned()
            .collect::<Vec<_>>();
        pending.sort_by_key(|o| o.created_at);
        Ok(pending.into_iter().skip(offset as usize).take(limit as usize).collect())
    }

    async fn update_recon_refund_status(
        &self,
        order_no: &OrderNo,
        status: BusinessStatus,
        amount: Money,
        time: DateTime<Utc>,
    ) -> Result<bool, ReconBackendError> {
        let mut inner = self.lock();
        match inner.orders.get_mut(order_no) {
            Some(order) => {
                order.refund_status = Some(status);
                order.refund_amount = Some(amount);
                order.refund_time = Some(time);
                order.updated_at = Utc::now();
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn batch_save_refund_split_subs(&self, subs: &[RefundSplitSub]) -> Result<(), ReconBackendError> {
        self.lock().refund_split_subs.extend_from_slice(subs);
        Ok(())
    }

    async fn get_summary(&self, date: NaiveDate) -> Result<ReconSummary, ReconBackendError> {
        let inner = self.lock();
        let mut summary = ReconSummary::default();
        for order in inner.orders.values().filter(|o| o.created_at.date_naive() == date) {
            summary.total_orders += 1;
            match order.recon_status {
                ReconStatus::Success => summary.success_count += 1,
                ReconStatus::Failure => summary.failure_count += 1,
                ReconStatus::Pending => summary.pending_count += 1,
            }
            summary.total_amount = summary.total_amount + order.pay_amount;
        }
        Ok(summary)
    }

    async fn list_orders(&self, date: NaiveDate, page: u32, size: u32) -> Result<Vec<Order>, ReconBackendError> {
        let inner = self.lock();
        let mut orders = inner
            .orders
            .values()
            .filter(|o| o.created_at.date_naive() == date)
            .cloned()
            .collect::<Vec<_>>();
        orders.sort_by_key(|o| o.created_at);
        let offset = page.saturating_sub(1).saturating_mul(size) as usize;
        Ok(orders.into_iter().skip(offset).take(size as usize).collect())
    }
}
