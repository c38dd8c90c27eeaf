use std::fmt::Debug;

use chrono::{NaiveDate, Utc};
use log::*;
use recon_common::Money;

use crate::{
    db_types::{
        BusinessStatus,
        ExceptionRecord,
        ExceptionStep,
        NewOrder,
        NotifyEvent,
        NotifyLog,
        Order,
        OrderNo,
        ReconStatus,
        ReconSummary,
        RefundNotice,
        RefundSplitSub,
        SplitDetail,
        SplitSub,
        SELF_MERCHANT,
    },
    events::{AlarmEvent, EventProducers},
    helpers::{
        amounts::{amounts_balance, split_total},
        status_rules::{derive_verdict, Verdict},
    },
    recon_api::objects::ReconResult,
    traits::{ReconBackend, ReconBackendError},
};

const DEFAULT_TOLERANCE: Money = Money::from_minor(1);
const DEFAULT_BATCH_SIZE: u32 = 100;

/// `ReconFlowApi` is the primary API for reconciling orders, merchant notifications and refunds.
///
/// Every mutating operation is synchronous with respect to the caller and total: a call either
/// commits all of its effects or none of them, and faults of any kind come back as an unsuccessful
/// [`ReconResult`] rather than an error. Alarms for every rejection are published through the
/// registered event producers.
pub struct ReconFlowApi<B> {
    db: B,
    producers: EventProducers,
    tolerance: Money,
    batch_size: u32,
}

impl<B> Debug for ReconFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconFlowApi")
    }
}

impl<B> ReconFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, tolerance: DEFAULT_TOLERANCE, batch_size: DEFAULT_BATCH_SIZE }
    }

    /// Overrides the amount tolerance (default: one minor unit).
    pub fn with_tolerance(mut self, tolerance: Money) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Overrides the page size of the batch sweep (default: 100).
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

impl<B> ReconFlowApi<B>
where B: ReconBackend
{
    /// Reconciles a reported order against its split, fee and platform-income figures.
    ///
    /// The three leg statuses are combined into a verdict first. A failed leg rejects the order
    /// outright (exception + alarm, nothing persisted). Orders with a processing leg are persisted
    /// as `Pending` and converge later through [`Self::reevaluate`]. Orders whose legs all succeeded
    /// must pass the amount check before they are persisted as `Success`; a mismatch rejects the
    /// order with a step-4 exception and persists nothing.
    pub async fn recon_order(&self, order: NewOrder, splits: Vec<SplitDetail>) -> ReconResult {
        let order_no = order.order_no.clone();
        let verdict = derive_verdict(order.pay_status, order.split_status, order.notify_status);
        if let Verdict::Reject(step) = verdict {
            let message = rejection_message(step);
            warn!("🔀️ Order [{order_no}] rejected: {message}");
            self.record_exception(&order_no, SELF_MERCHANT, message, step).await;
            return ReconResult::failure(order_no, message);
        }

        let total = split_total(splits.iter().map(|s| s.split_amount));
        let recon_status = match verdict {
            Verdict::Pending => ReconStatus::Pending,
            _ => {
                if !amounts_balance(order.pay_amount, order.platform_income, order.pay_fee, total, self.tolerance) {
                    let message = "amount check failed, reported pay amount does not match the computed total";
                    warn!(
                        "🔀️ Order [{order_no}] rejected: {message} (pay: {}, splits: {total}, platform income: {}, \
                         fee: {})",
                        order.pay_amount, order.platform_income, order.pay_fee
                    );
                    self.record_exception(&order_no, SELF_MERCHANT, message, ExceptionStep::AmountMismatch).await;
                    return ReconResult::failure(order_no, message);
                }
                ReconStatus::Success
            },
        };

        let now = Utc::now();
        let record = Order {
            order_no: order_no.clone(),
            pay_amount: order.pay_amount,
            platform_income: order.platform_income,
            pay_fee: order.pay_fee,
            split_total_amount: total,
            pay_status: order.pay_status,
            split_status: order.split_status,
            notify_status: order.notify_status,
            notify_result: None,
            recon_status,
            refund_status: None,
            refund_amount: None,
            refund_time: None,
            created_at: now,
            updated_at: now,
        };
        let subs = splits
            .into_iter()
            .map(|d| SplitSub {
                order_no: order_no.clone(),
                sub_order_no: d.sub_order_no,
                merchant_id: d.merchant_id,
                merchant_order_no: d.merchant_order_no,
                split_amount: d.split_amount,
                notify_status: d.notify_status.unwrap_or(order.notify_status),
                notify_result: None,
                created_at: now,
                updated_at: now,
            })
            .collect::<Vec<_>>();
        match self.db.insert_order_with_splits(&record, &subs).await {
            Ok(()) => {
                debug!("🔀️ Order [{order_no}] persisted with {} splits, verdict {recon_status}", subs.len());
                ReconResult::success(order_no)
            },
            Err(e) => {
                error!("🔀️ Order [{order_no}] could not be persisted: {e}");
                let message = format!("reconciliation aborted by a storage fault: {e}");
                self.record_exception(&order_no, SELF_MERCHANT, &message, ExceptionStep::SystemError).await;
                ReconResult::failure(order_no, message)
            },
        }
    }

    /// Records a merchant notification outcome and re-evaluates the order.
    ///
    /// The order is resolved from the event's explicit order number, or through the sub-order /
    /// merchant-order lookup keys. An event that cannot be matched to any order returns an
    /// unsuccessful result without recording an exception: unmatched callbacks are a race with
    /// ingestion, not a data fault.
    pub async fn recon_notify(&self, event: NotifyEvent) -> ReconResult {
        let resolved = self
            .resolve_order_no(
                event.order_no.as_ref(),
                Some(&event.merchant_id),
                event.sub_order_no.as_deref(),
                event.merchant_order_no.as_deref(),
            )
            .await;
        let order_no = match resolved {
            Ok(Some(order_no)) => order_no,
            Ok(None) => {
                debug!("🔔️ Notification from merchant {} does not match any order", event.merchant_id);
                return ReconResult::unmatched("notification does not match any reconciled order");
            },
            Err(e) => {
                error!("🔔️ Could not resolve the order for a notification event: {e}");
                self.send_alarm(AlarmEvent::broadcast(format!("notification lookup aborted by a storage fault: {e}")))
                    .await;
                return ReconResult::unmatched(format!("storage fault during notification lookup: {e}"));
            },
        };
        match self.try_recon_notify(&order_no, &event).await {
            Ok(result) => result,
            Err(e) => {
                error!("🔔️ Notification tracking for order [{order_no}] failed: {e}");
                let message = format!("notification tracking aborted by a storage fault: {e}");
                self.record_exception(&order_no, SELF_MERCHANT, &message, ExceptionStep::SystemError).await;
                ReconResult::failure(order_no, message)
            },
        }
    }

    /// Notification entry point keyed by the merchant's sub-order number.
    pub async fn recon_notify_by_sub_order(
        &self,
        merchant_id: &str,
        sub_order_no: &str,
        status: BusinessStatus,
        result: Option<&str>,
    ) -> ReconResult {
        let mut event = NotifyEvent::for_sub_order(merchant_id, sub_order_no, status);
        if let Some(r) = result {
            event = event.with_result(r);
        }
        self.recon_notify(event).await
    }

    /// Notification entry point keyed by the merchant's own order number.
    pub async fn recon_notify_by_merchant_order(
        &self,
        merchant_id: &str,
        merchant_order_no: &str,
        status: BusinessStatus,
        result: Option<&str>,
    ) -> ReconResult {
        let mut event = NotifyEvent::for_merchant_order(merchant_id, merchant_order_no, status);
        if let Some(r) = result {
            event = event.with_result(r);
        }
        self.recon_notify(event).await
    }

    async fn try_recon_notify(&self, order_no: &OrderNo, event: &NotifyEvent) -> Result<ReconResult, ReconBackendError> {
        if event.merchant_id != SELF_MERCHANT {
            let sub_order_no = match &event.sub_order_no {
                Some(sub) => Some(sub.clone()),
                None => {
                    self.lookup_sub_order_no(order_no, &event.merchant_id, event.merchant_order_no.as_deref()).await?
                },
            };
            match sub_order_no {
                Some(sub) => {
                    let changed = self
                        .db
                        .update_split_sub_notify_status(
                            order_no,
                            &event.merchant_id,
                            &sub,
                            event.status,
                            event.result.as_deref(),
                        )
                        .await?;
                    if changed {
                        trace!("🔔️ Split [{sub}] of order [{order_no}] is now {}", event.status);
                    } else {
                        debug!("🔔️ No split record of order [{order_no}] matches merchant {} / sub [{sub}]",
                            event.merchant_id);
                    }
                },
                None => {
                    debug!(
                        "🔔️ Notification from merchant {} for order [{order_no}] carries no resolvable sub-order",
                        event.merchant_id
                    );
                },
            }
        }

        // Closure check. The order-level status only ever transitions out of Processing (the update
        // is guarded in the backend), so concurrent "last sub-order" events cannot both conclude
        // closure, and a failure landing first wins.
        if self.db.is_all_split_subs_notified(order_no).await? {
            if self.db.update_notify_status(order_no, BusinessStatus::Success, event.result.as_deref()).await? {
                debug!("🔔️ Order [{order_no}] notification leg closed: every merchant confirmed");
            }
        } else if event.status == BusinessStatus::Failure {
            // Fail fast: a single merchant failure fails the whole leg without waiting for siblings.
            if self.db.update_notify_status(order_no, BusinessStatus::Failure, event.result.as_deref()).await? {
                warn!("🔔️ Order [{order_no}] notification leg failed by merchant {}", event.merchant_id);
            }
        }

        let log_row = NotifyLog {
            order_no: order_no.clone(),
            merchant_id: event.merchant_id.clone(),
            sub_order_no: event.sub_order_no.clone(),
            notify_url: event.notify_url.clone(),
            notify_status: event.status,
            notify_result: event.result.clone(),
            created_at: Utc::now(),
        };
        self.db.save_notify_log(&log_row).await?;

        let converged = self.reevaluate_inner(order_no).await?;
        Ok(if converged {
            ReconResult::success(order_no.clone())
        } else {
            ReconResult::failure(order_no.clone(), "order has not converged yet")
        })
    }

    /// Reconciles a reported refund against the original order.
    ///
    /// Preconditions, checked in this sequence: the original order must exist (a miss is a benign
    /// race, no exception is recorded); the refund may not exceed the order's pay amount; the refund
    /// split total may not exceed the refund amount. Refund state never reopens a terminal
    /// reconciliation verdict.
    pub async fn recon_refund(&self, notice: RefundNotice) -> ReconResult {
        let resolved = self
            .resolve_order_no(
                notice.order_no.as_ref(),
                notice.merchant_id.as_deref(),
                notice.sub_order_no.as_deref(),
                notice.merchant_order_no.as_deref(),
            )
            .await;
        let order_no = match resolved {
            Ok(Some(order_no)) => order_no,
            Ok(None) => {
                debug!("💸️ Refund event does not match any order");
                return ReconResult::unmatched("refund does not match any reconciled order");
            },
            Err(e) => {
                error!("💸️ Could not resolve the order for a refund event: {e}");
                self.send_alarm(AlarmEvent::broadcast(format!("refund lookup aborted by a storage fault: {e}"))).await;
                return ReconResult::unmatched(format!("storage fault during refund lookup: {e}"));
            },
        };
        match self.try_recon_refund(&order_no, &notice).await {
            Ok(result) => result,
            Err(e) => {
                error!("💸️ Refund reconciliation for order [{order_no}] failed: {e}");
                let message = format!("refund reconciliation aborted by a storage fault: {e}");
                self.record_exception(&order_no, SELF_MERCHANT, &message, ExceptionStep::SystemError).await;
                ReconResult::failure(order_no, message)
            },
        }
    }

    async fn try_recon_refund(
        &self,
        order_no: &OrderNo,
        notice: &RefundNotice,
    ) -> Result<ReconResult, ReconBackendError> {
        let Some(order) = self.db.get_order(order_no).await? else {
            debug!("💸️ Refund for order [{order_no}] arrived before the order itself");
            return Ok(ReconResult::failure(order_no.clone(), "original order not found"));
        };
        if notice.refund_amount > order.pay_amount {
            let message = "refund amount exceeds the pay amount";
            warn!("💸️ Order [{order_no}]: {message} ({} > {})", notice.refund_amount, order.pay_amount);
            self.record_exception(order_no, SELF_MERCHANT, message, ExceptionStep::AmountMismatch).await;
            return Ok(ReconResult::failure(order_no.clone(), message));
        }
        let refund_split_total = split_total(notice.splits.iter().map(|s| s.refund_split_amount));
        if refund_split_total > notice.refund_amount {
            let message = "refund split total exceeds the refund amount";
            warn!("💸️ Order [{order_no}]: {message} ({refund_split_total} > {})", notice.refund_amount);
            self.record_exception(order_no, SELF_MERCHANT, message, ExceptionStep::AmountMismatch).await;
            return Ok(ReconResult::failure(order_no.clone(), message));
        }
        let updated = self
            .db
            .update_recon_refund_status(order_no, notice.refund_status, notice.refund_amount, notice.refund_time)
            .await?;
        if !updated {
            return Ok(ReconResult::failure(order_no.clone(), "refund status update failed"));
        }
        if !notice.splits.is_empty() {
            let now = Utc::now();
            let subs = notice
                .splits
                .iter()
                .map(|d| RefundSplitSub {
                    order_no: order_no.clone(),
                    sub_order_no: d.sub_order_no.clone(),
                    merchant_id: d.merchant_id.clone(),
                    merchant_order_no: d.merchant_order_no.clone(),
                    refund_split_amount: d.refund_split_amount,
                    created_at: now,
                    updated_at: now,
                })
                .collect::<Vec<_>>();
            self.db.batch_save_refund_split_subs(&subs).await?;
        }
        debug!("💸️ Refund of {} recorded against order [{order_no}]", notice.refund_amount);
        Ok(ReconResult::success(order_no.clone()))
    }

    /// Re-evaluates the order's verdict.
    ///
    /// Terminal verdicts are absorbing: the call is a no-op and reports `true` for `Success` and
    /// `false` for `Failure`. An order with a still-processing leg has not converged yet and reports
    /// `false`, and a leg that has meanwhile failed (fail-fast notification closure) drives the
    /// verdict to `Failure`. Otherwise the split total is recomputed from the persisted split
    /// records and checked against the stored figures; the verdict transitions to `Success` on a
    /// match and to `Failure` (with a step-4 exception) on a mismatch.
    pub async fn reevaluate(&self, order_no: &OrderNo) -> bool {
        match self.reevaluate_inner(order_no).await {
            Ok(converged) => converged,
            Err(e) => {
                error!("🔁️ Re-evaluation of order [{order_no}] failed: {e}");
                let message = format!("re-evaluation aborted by a storage fault: {e}");
                self.record_exception(order_no, SELF_MERCHANT, &message, ExceptionStep::SystemError).await;
                false
            },
        }
    }

    async fn reevaluate_inner(&self, order_no: &OrderNo) -> Result<bool, ReconBackendError> {
        let Some(order) = self.db.get_order(order_no).await? else {
            debug!("🔁️ Order [{order_no}] is not known; nothing to re-evaluate");
            return Ok(false);
        };
        match order.recon_status {
            ReconStatus::Success => return Ok(true),
            ReconStatus::Failure => return Ok(false),
            ReconStatus::Pending => {},
        }
        match derive_verdict(order.pay_status, order.split_status, order.notify_status) {
            Verdict::Reject(step) => {
                let message = rejection_message(step);
                warn!("🔁️ Order [{order_no}] failed: {message}");
                self.record_exception(order_no, SELF_MERCHANT, message, step).await;
                let _ = self.db.update_recon_status(order_no, ReconStatus::Failure).await?;
                return Ok(false);
            },
            Verdict::Pending => {
                trace!("🔁️ Order [{order_no}] still has a processing leg");
                return Ok(false);
            },
            Verdict::TentativeSuccess => {},
        }
        let subs = self.db.get_split_subs(order_no).await?;
        let total = split_total(subs.iter().map(|s| s.split_amount));
        if !amounts_balance(order.pay_amount, order.platform_income, order.pay_fee, total, self.tolerance) {
            warn!("🔁️ Order [{order_no}] failed the amount re-check (pay: {}, splits: {total})", order.pay_amount);
            self.record_exception(order_no, SELF_MERCHANT, "retry: amount mismatch", ExceptionStep::AmountMismatch)
                .await;
            let _ = self.db.update_recon_status(order_no, ReconStatus::Failure).await?;
            return Ok(false);
        }
        let _ = self.db.update_recon_status(order_no, ReconStatus::Success).await?;
        info!("🔁️ Order [{order_no}] reconciled");
        Ok(true)
    }

    /// Sweeps every still-pending order of the given date through [`Self::reevaluate`].
    ///
    /// Pages of `batch_size` orders are fetched until an empty page comes back. A failure on one
    /// order never aborts the sweep; the total number of orders processed is reported through the
    /// alarm channel at the end. Returns whether the sweep itself ran to completion.
    pub async fn run_batch_recon(&self, date: NaiveDate) -> bool {
        match self.try_run_batch_recon(date).await {
            Ok(processed) => {
                info!("⏱️ Batch reconciliation for {date} complete. {processed} orders processed");
                self.send_alarm(AlarmEvent::broadcast(format!(
                    "timing reconciliation finished [{date}]: {processed} orders processed"
                )))
                .await;
                true
            },
            Err(e) => {
                error!("⏱️ Batch reconciliation for {date} aborted: {e}");
                self.send_alarm(AlarmEvent::broadcast(format!("timing reconciliation aborted [{date}]: {e}"))).await;
                false
            },
        }
    }

    async fn try_run_batch_recon(&self, date: NaiveDate) -> Result<u64, ReconBackendError> {
        let mut offset = 0u32;
        let limit = self.batch_size;
        let mut processed = 0u64;
        loop {
            let page = self.db.list_pending_orders(date, offset, limit).await?;
            if page.is_empty() {
                break;
            }
            for order in &page {
                // reevaluate records its own exceptions; one stubborn order must not stall the sweep
                let _ = self.reevaluate(&order.order_no).await;
                processed += 1;
            }
            offset += limit;
        }
        Ok(processed)
    }

    //------------------------------------- Query surface ------------------------------------------

    /// The current verdict for the order, if it is known.
    pub async fn recon_status(&self, order_no: &OrderNo) -> Result<Option<ReconStatus>, ReconBackendError> {
        Ok(self.db.get_order(order_no).await?.map(|o| o.recon_status))
    }

    pub async fn get_order(&self, order_no: &OrderNo) -> Result<Option<Order>, ReconBackendError> {
        self.db.get_order(order_no).await
    }

    pub async fn get_split_subs(&self, order_no: &OrderNo) -> Result<Vec<SplitSub>, ReconBackendError> {
        self.db.get_split_subs(order_no).await
    }

    pub async fn get_refund_split_subs(&self, order_no: &OrderNo) -> Result<Vec<RefundSplitSub>, ReconBackendError> {
        self.db.get_refund_split_subs(order_no).await
    }

    pub async fn get_exceptions(&self, order_no: &OrderNo) -> Result<Vec<ExceptionRecord>, ReconBackendError> {
        self.db.get_exceptions(order_no).await
    }

    pub async fn get_notify_logs(&self, order_no: &OrderNo) -> Result<Vec<NotifyLog>, ReconBackendError> {
        self.db.get_notify_logs(order_no).await
    }

    pub async fn get_summary(&self, date: NaiveDate) -> Result<ReconSummary, ReconBackendError> {
        self.db.get_summary(date).await
    }

    pub async fn list_orders(&self, date: NaiveDate, page: u32, size: u32) -> Result<Vec<Order>, ReconBackendError> {
        self.db.list_orders(date, page, size).await
    }

    //------------------------------------- Internals ----------------------------------------------

    async fn resolve_order_no(
        &self,
        explicit: Option<&OrderNo>,
        merchant_id: Option<&str>,
        sub_order_no: Option<&str>,
        merchant_order_no: Option<&str>,
    ) -> Result<Option<OrderNo>, ReconBackendError> {
        if let Some(order_no) = explicit {
            return Ok(Some(order_no.clone()));
        }
        let Some(merchant_id) = merchant_id else {
            return Ok(None);
        };
        if let Some(sub) = sub_order_no {
            if let Some(order_no) = self.db.find_order_no_by_sub(merchant_id, sub).await? {
                return Ok(Some(order_no));
            }
        }
        if let Some(merchant_order) = merchant_order_no {
            if let Some(order_no) = self.db.find_order_no_by_merchant_order(merchant_id, merchant_order).await? {
                return Ok(Some(order_no));
            }
        }
        Ok(None)
    }

    async fn lookup_sub_order_no(
        &self,
        order_no: &OrderNo,
        merchant_id: &str,
        merchant_order_no: Option<&str>,
    ) -> Result<Option<String>, ReconBackendError> {
        let subs = self.db.get_split_subs(order_no).await?;
        let found = subs.into_iter().find(|s| {
            s.merchant_id == merchant_id
                && match merchant_order_no {
                    Some(merchant_order) => s.merchant_order_no.as_deref() == Some(merchant_order),
                    None => true,
                }
        });
        Ok(found.map(|s| s.sub_order_no))
    }

    /// Writes an exception record and raises an alarm. Neither may fail the calling operation.
    async fn record_exception(&self, order_no: &OrderNo, merchant_id: &str, message: &str, step: ExceptionStep) {
        let record = ExceptionRecord::new(order_no.clone(), merchant_id, message, step);
        if let Err(e) = self.db.save_exception(&record).await {
            error!("🗒️ Exception record for order [{order_no}] could not be stored: {e}");
        }
        self.send_alarm(AlarmEvent::for_order(order_no, merchant_id, message)).await;
    }

    async fn send_alarm(&self, event: AlarmEvent) {
        for producer in &self.producers.alarm_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

fn rejection_message(step: ExceptionStep) -> &'static str {
    match step {
        ExceptionStep::Payment => "payment leg failed, order rejected",
        ExceptionStep::Split => "split leg failed, order rejected",
        _ => "notification leg failed, order rejected",
    }
}
