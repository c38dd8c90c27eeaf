//! Order ingestion: verdict derivation, amount validation and all-or-nothing persistence.
use recon_common::Money;
use recon_engine::{
    db_types::{BusinessStatus, ExceptionStep, NewOrder, OrderNo, ReconStatus},
    ReconBackend,
};

mod support;
use support::{memory_api, settled_order, split};

#[tokio::test]
async fn fully_settled_order_reconciles_immediately() {
    // Scenario: 300.00 paid, split 200.00 + 100.00, no fees, every leg succeeded.
    let api = memory_api();
    let order = settled_order("ORDER_A", Money::from_major(300));
    let splits = vec![
        split("ORDER_A-S1", "MERCHANT_A", Money::from_major(200)),
        split("ORDER_A-S2", "MERCHANT_B", Money::from_major(100)),
    ];

    let result = api.recon_order(order, splits).await;

    assert!(result.is_success());
    assert_eq!(result.order_no, Some(OrderNo::from("ORDER_A")));
    let order_no = OrderNo::from("ORDER_A");
    let stored = api.get_order(&order_no).await.unwrap().expect("order was not persisted");
    assert_eq!(stored.recon_status, ReconStatus::Success);
    assert_eq!(stored.split_total_amount, Money::from_major(300));
    assert_eq!(api.get_split_subs(&order_no).await.unwrap().len(), 2);
    assert!(api.get_exceptions(&order_no).await.unwrap().is_empty());
}

#[tokio::test]
async fn amount_mismatch_rejects_without_committing_anything() {
    // Scenario: 100.00 paid but the splits only cover 90.00.
    let api = memory_api();
    let order = settled_order("ORDER_B", Money::from_major(100));
    let splits = vec![
        split("ORDER_B-S1", "MERCHANT_A", Money::from_major(60)),
        split("ORDER_B-S2", "MERCHANT_B", Money::from_major(30)),
    ];

    let result = api.recon_order(order, splits).await;

    assert!(!result.is_success());
    let order_no = OrderNo::from("ORDER_B");
    assert!(api.get_order(&order_no).await.unwrap().is_none());
    assert!(api.get_split_subs(&order_no).await.unwrap().is_empty());
    let exceptions = api.get_exceptions(&order_no).await.unwrap();
    assert_eq!(exceptions.len(), 1);
    assert_eq!(exceptions[0].step, ExceptionStep::AmountMismatch);
    assert_eq!(exceptions[0].merchant_id, "SELF");
}

#[tokio::test]
async fn platform_income_and_fees_count_towards_the_total() {
    let api = memory_api();
    let order = settled_order("ORDER_FEES", Money::from_major(100))
        .with_platform_income(Money::from_major(5))
        .with_pay_fee(Money::from_major(1));
    let splits = vec![split("ORDER_FEES-S1", "MERCHANT_A", Money::from_major(94))];

    let result = api.recon_order(order, splits).await;

    assert!(result.is_success());
    let stored = api.get_order(&OrderNo::from("ORDER_FEES")).await.unwrap().unwrap();
    assert_eq!(stored.recon_status, ReconStatus::Success);
}

#[tokio::test]
async fn difference_at_the_tolerance_is_accepted() {
    let api = memory_api();
    // One cent off, with the default tolerance of one cent.
    let order = settled_order("ORDER_TOL", Money::from_minor(30_001));
    let splits = vec![split("ORDER_TOL-S1", "MERCHANT_A", Money::from_major(300))];

    let result = api.recon_order(order, splits).await;

    assert!(result.is_success());
    let stored = api.get_order(&OrderNo::from("ORDER_TOL")).await.unwrap().unwrap();
    assert_eq!(stored.recon_status, ReconStatus::Success);
}

#[tokio::test]
async fn failed_legs_reject_with_their_step_code() {
    let cases = [
        (BusinessStatus::Failure, BusinessStatus::Success, BusinessStatus::Success, ExceptionStep::Payment),
        (BusinessStatus::Success, BusinessStatus::Failure, BusinessStatus::Success, ExceptionStep::Split),
        (BusinessStatus::Success, BusinessStatus::Success, BusinessStatus::Failure, ExceptionStep::Notification),
        // Payment is checked first when several legs failed.
        (BusinessStatus::Failure, BusinessStatus::Failure, BusinessStatus::Success, ExceptionStep::Payment),
    ];
    for (i, (pay, split_status, notify, expected_step)) in cases.into_iter().enumerate() {
        let api = memory_api();
        let order_no = format!("ORDER_LEG_{i}");
        let order = NewOrder::new(order_no.as_str().into(), Money::from_major(100)).with_statuses(
            pay,
            split_status,
            notify,
        );
        let splits = vec![split(&format!("{order_no}-S1"), "MERCHANT_A", Money::from_major(100))];

        let result = api.recon_order(order, splits).await;

        assert!(!result.is_success());
        let order_no = OrderNo::from(order_no);
        assert!(api.get_order(&order_no).await.unwrap().is_none(), "rejected order must not be persisted");
        let exceptions = api.get_exceptions(&order_no).await.unwrap();
        assert_eq!(exceptions.len(), 1);
        assert_eq!(exceptions[0].step, expected_step);
    }
}

#[tokio::test]
async fn processing_legs_persist_the_order_as_pending() {
    let api = memory_api();
    let order = NewOrder::new("ORDER_PENDING".into(), Money::from_major(100)).with_statuses(
        BusinessStatus::Success,
        BusinessStatus::Success,
        BusinessStatus::Processing,
    );
    // The amounts do not even balance, but the order is accepted: the check only runs once every
    // leg has succeeded.
    let splits = vec![split("ORDER_PENDING-S1", "MERCHANT_A", Money::from_major(40))];

    let result = api.recon_order(order, splits).await;

    assert!(result.is_success());
    let stored = api.get_order(&OrderNo::from("ORDER_PENDING")).await.unwrap().unwrap();
    assert_eq!(stored.recon_status, ReconStatus::Pending);
    assert!(api.get_exceptions(&OrderNo::from("ORDER_PENDING")).await.unwrap().is_empty());
}

#[tokio::test]
async fn omitted_statuses_default_to_processing() {
    let api = memory_api();
    let order = NewOrder::new("ORDER_DEFAULTS".into(), Money::from_major(100));

    let result = api.recon_order(order, vec![]).await;

    assert!(result.is_success());
    let stored = api.get_order(&OrderNo::from("ORDER_DEFAULTS")).await.unwrap().unwrap();
    assert_eq!(stored.pay_status, BusinessStatus::Processing);
    assert_eq!(stored.recon_status, ReconStatus::Pending);
}

#[tokio::test]
async fn split_notify_status_defaults_to_the_order_level_status() {
    let api = memory_api();
    let order = NewOrder::new("ORDER_SUBDEF".into(), Money::from_major(30)).with_statuses(
        BusinessStatus::Success,
        BusinessStatus::Success,
        BusinessStatus::Processing,
    );
    let splits = vec![
        split("ORDER_SUBDEF-S1", "MERCHANT_A", Money::from_major(10)),
        split("ORDER_SUBDEF-S2", "MERCHANT_B", Money::from_major(20)).with_notify_status(BusinessStatus::Success),
    ];

    assert!(api.recon_order(order, splits).await.is_success());

    let subs = api.get_split_subs(&OrderNo::from("ORDER_SUBDEF")).await.unwrap();
    let s1 = subs.iter().find(|s| s.sub_order_no == "ORDER_SUBDEF-S1").unwrap();
    let s2 = subs.iter().find(|s| s.sub_order_no == "ORDER_SUBDEF-S2").unwrap();
    assert_eq!(s1.notify_status, BusinessStatus::Processing);
    assert_eq!(s2.notify_status, BusinessStatus::Success);
}

#[tokio::test]
async fn resubmitting_an_order_is_rejected_as_a_storage_fault() {
    let api = memory_api();
    let order = settled_order("ORDER_DUP", Money::from_major(100));
    let splits = vec![split("ORDER_DUP-S1", "MERCHANT_A", Money::from_major(100))];
    assert!(api.recon_order(order.clone(), splits.clone()).await.is_success());

    let result = api.recon_order(order, splits).await;

    assert!(!result.is_success());
    let order_no = OrderNo::from("ORDER_DUP");
    let exceptions = api.get_exceptions(&order_no).await.unwrap();
    assert_eq!(exceptions.len(), 1);
    assert_eq!(exceptions[0].step, ExceptionStep::SystemError);
    // The original row is untouched and no extra splits were committed.
    assert_eq!(api.get_split_subs(&order_no).await.unwrap().len(), 1);
    assert_eq!(api.db().get_order(&order_no).await.unwrap().unwrap().recon_status, ReconStatus::Success);
}
