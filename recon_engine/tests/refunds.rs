//! Refund reconciliation: bound checks, resolution and independence from the verdict.
use chrono::Utc;
use recon_common::Money;
use recon_engine::db_types::{
    BusinessStatus,
    ExceptionStep,
    NewOrder,
    OrderNo,
    ReconStatus,
    RefundDetail,
    RefundNotice,
    SplitDetail,
};

mod support;
use support::{memory_api, settled_order, split};

#[tokio::test]
async fn refund_within_bounds_is_accepted_and_a_later_over_refund_is_not() {
    // Scenario: 50.00 refunded against a 300.00 order, then a 400.00 refund on the same order.
    let api = memory_api();
    let order = settled_order("REFUND_A", Money::from_major(300));
    let splits = vec![split("REFUND_A-S1", "MERCHANT_A", Money::from_major(300))];
    assert!(api.recon_order(order, splits).await.is_success());
    let order_no = OrderNo::from("REFUND_A");

    let notice = RefundNotice::for_order(order_no.clone(), Money::from_major(50), Utc::now())
        .with_splits(vec![RefundDetail::new("REFUND_A-S1", "MERCHANT_A", Money::from_major(50))]);
    let result = api.recon_refund(notice).await;

    assert!(result.is_success());
    let stored = api.get_order(&order_no).await.unwrap().unwrap();
    assert_eq!(stored.refund_amount, Some(Money::from_major(50)));
    assert_eq!(stored.refund_status, Some(BusinessStatus::Success));
    assert!(stored.refund_time.is_some());
    assert_eq!(api.get_refund_split_subs(&order_no).await.unwrap().len(), 1);

    let over = RefundNotice::for_order(order_no.clone(), Money::from_major(400), Utc::now());
    let result = api.recon_refund(over).await;

    assert!(!result.is_success());
    let exceptions = api.get_exceptions(&order_no).await.unwrap();
    assert_eq!(exceptions.len(), 1);
    assert_eq!(exceptions[0].step, ExceptionStep::AmountMismatch);
    // The first refund's bookkeeping is untouched.
    let stored = api.get_order(&order_no).await.unwrap().unwrap();
    assert_eq!(stored.refund_amount, Some(Money::from_major(50)));
}

#[tokio::test]
async fn refund_split_total_may_not_exceed_the_refund_amount() {
    let api = memory_api();
    let order = settled_order("REFUND_B", Money::from_major(100));
    let splits = vec![split("REFUND_B-S1", "MERCHANT_A", Money::from_major(100))];
    assert!(api.recon_order(order, splits).await.is_success());
    let order_no = OrderNo::from("REFUND_B");

    let notice = RefundNotice::for_order(order_no.clone(), Money::from_major(50), Utc::now()).with_splits(vec![
        RefundDetail::new("REFUND_B-S1", "MERCHANT_A", Money::from_major(30)),
        RefundDetail::new("REFUND_B-S1", "MERCHANT_B", Money::from_major(30)),
    ]);
    let result = api.recon_refund(notice).await;

    assert!(!result.is_success());
    let exceptions = api.get_exceptions(&order_no).await.unwrap();
    assert_eq!(exceptions.len(), 1);
    assert_eq!(exceptions[0].step, ExceptionStep::AmountMismatch);
    assert!(api.get_refund_split_subs(&order_no).await.unwrap().is_empty());
}

#[tokio::test]
async fn refund_for_an_unknown_order_fails_without_an_exception() {
    let api = memory_api();

    let notice = RefundNotice::for_order("NO_SUCH_ORDER".into(), Money::from_major(10), Utc::now());
    let result = api.recon_refund(notice).await;

    assert!(!result.is_success());
    assert!(api.get_exceptions(&OrderNo::from("NO_SUCH_ORDER")).await.unwrap().is_empty());
}

#[tokio::test]
async fn unresolvable_refund_events_are_unmatched() {
    let api = memory_api();

    let notice = RefundNotice::for_sub_order("MERCHANT_X", "NO_SUCH_SUB", Money::from_major(10), Utc::now());
    let result = api.recon_refund(notice).await;

    assert!(!result.is_success());
    assert!(result.order_no.is_none());
}

#[tokio::test]
async fn refunds_resolve_through_sub_order_and_merchant_order_numbers() {
    let api = memory_api();
    let order = settled_order("REFUND_RES", Money::from_major(100));
    let splits =
        vec![split("REFUND_RES-S1", "MCH_888", Money::from_major(100)).with_merchant_order_no("MCH_ORDER_REF")];
    assert!(api.recon_order(order, splits).await.is_success());
    let order_no = OrderNo::from("REFUND_RES");

    let by_sub = RefundNotice::for_sub_order("MCH_888", "REFUND_RES-S1", Money::from_major(10), Utc::now());
    let result = api.recon_refund(by_sub).await;
    assert!(result.is_success());
    assert_eq!(result.order_no, Some(order_no.clone()));

    let by_merchant_order =
        RefundNotice::for_merchant_order("MCH_888", "MCH_ORDER_REF", Money::from_major(20), Utc::now());
    let result = api.recon_refund(by_merchant_order).await;
    assert!(result.is_success());
    let stored = api.get_order(&order_no).await.unwrap().unwrap();
    assert_eq!(stored.refund_amount, Some(Money::from_major(20)));
}

#[tokio::test]
async fn a_refund_never_touches_a_terminal_verdict() {
    let api = memory_api();
    // A settled order and a failed order.
    let order = settled_order("REFUND_TERM_OK", Money::from_major(100));
    assert!(api
        .recon_order(order, vec![split("REFUND_TERM_OK-S1", "MERCHANT_A", Money::from_major(100))])
        .await
        .is_success());
    let failed = NewOrder::new("REFUND_TERM_FAIL".into(), Money::from_major(100)).with_statuses(
        BusinessStatus::Success,
        BusinessStatus::Success,
        BusinessStatus::Processing,
    );
    let failed_splits = vec![SplitDetail::new("REFUND_TERM_FAIL-S1", "MERCHANT_A", Money::from_major(100))];
    assert!(api.recon_order(failed, failed_splits).await.is_success());
    api.recon_notify_by_sub_order("MERCHANT_A", "REFUND_TERM_FAIL-S1", BusinessStatus::Failure, None).await;
    assert_eq!(
        api.recon_status(&OrderNo::from("REFUND_TERM_FAIL")).await.unwrap(),
        Some(ReconStatus::Failure)
    );

    for order_no in ["REFUND_TERM_OK", "REFUND_TERM_FAIL"] {
        let notice = RefundNotice::for_order(order_no.into(), Money::from_major(10), Utc::now());
        assert!(api.recon_refund(notice).await.is_success());
    }

    assert_eq!(api.recon_status(&OrderNo::from("REFUND_TERM_OK")).await.unwrap(), Some(ReconStatus::Success));
    assert_eq!(api.recon_status(&OrderNo::from("REFUND_TERM_FAIL")).await.unwrap(), Some(ReconStatus::Failure));
}
