use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use recon_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

/// Merchant id recorded on exceptions the engine raises about its own checks, as opposed to faults
/// attributed to a specific sub-merchant.
pub const SELF_MERCHANT: &str = "SELF";

//--------------------------------------   BusinessStatus    ---------------------------------------------------------
/// Status of one business leg (payment, split, notification, refund) as reported by the upstream system.
///
/// The wire vocabulary is a small integer: `0=PROCESSING, 1=SUCCESS, 2=FAILURE`. Absent or unknown codes
/// decode as `Processing`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Type)]
#[repr(i32)]
pub enum BusinessStatus {
    #[default]
    Processing = 0,
    Success = 1,
    Failure = 2,
}

impl BusinessStatus {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Success,
            2 => Self::Failure,
            _ => Self::Processing,
        }
    }
}

impl Display for BusinessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusinessStatus::Processing => write!(f, "Processing"),
            BusinessStatus::Success => write!(f, "Success"),
            BusinessStatus::Failure => write!(f, "Failure"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid status: {0}")]
pub struct StatusConversionError(String);

impl FromStr for BusinessStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Processing" => Ok(Self::Processing),
            "Success" => Ok(Self::Success),
            "Failure" => Ok(Self::Failure),
            s => Err(StatusConversionError(format!("Invalid business status: {s}"))),
        }
    }
}

//--------------------------------------     ReconStatus     ---------------------------------------------------------
/// The derived reconciliation verdict for an order.
///
/// `Pending` is the only non-terminal state. `Success` and `Failure` are absorbing: once an order leaves
/// `Pending` its verdict never changes again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Type)]
#[repr(i32)]
pub enum ReconStatus {
    #[default]
    Pending = 0,
    Success = 1,
    Failure = 2,
}

impl ReconStatus {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Success,
            2 => Self::Failure,
            _ => Self::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReconStatus::Pending)
    }
}

impl Display for ReconStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconStatus::Pending => write!(f, "Pending"),
            ReconStatus::Success => write!(f, "Success"),
            ReconStatus::Failure => write!(f, "Failure"),
        }
    }
}

impl FromStr for ReconStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Success" => Ok(Self::Success),
            "Failure" => Ok(Self::Failure),
            s => Err(StatusConversionError(format!("Invalid recon status: {s}"))),
        }
    }
}

//--------------------------------------    ExceptionStep    ---------------------------------------------------------
/// Identifies the check that raised an exception record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[repr(i32)]
pub enum ExceptionStep {
    Payment = 1,
    Split = 2,
    Notification = 3,
    AmountMismatch = 4,
    SystemError = 5,
}

impl ExceptionStep {
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

impl Display for ExceptionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExceptionStep::Payment => write!(f, "payment"),
            ExceptionStep::Split => write!(f, "split"),
            ExceptionStep::Notification => write!(f, "notification"),
            ExceptionStep::AmountMismatch => write!(f, "amount-mismatch"),
            ExceptionStep::SystemError => write!(f, "system-error"),
        }
    }
}

//--------------------------------------       OrderNo       ---------------------------------------------------------
/// The externally assigned order number. This is the natural key for everything the engine touches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Type)]
#[sqlx(transparent)]
pub struct OrderNo(pub String);

impl FromStr for OrderNo {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNo {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderNo {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderNo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderNo {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
/// A persisted order under reconciliation.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    pub order_no: OrderNo,
    pub pay_amount: Money,
    pub platform_income: Money,
    pub pay_fee: Money,
    /// Total of the split amounts as computed at ingestion time.
    pub split_total_amount: Money,
    pub pay_status: BusinessStatus,
    pub split_status: BusinessStatus,
    pub notify_status: BusinessStatus,
    pub notify_result: Option<String>,
    pub recon_status: ReconStatus,
    pub refund_status: Option<BusinessStatus>,
    pub refund_amount: Option<Money>,
    pub refund_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      NewOrder       ---------------------------------------------------------
/// The reported figures for an order, as submitted to `recon_order`.
///
/// Leg statuses default to `Processing` when the upstream system has not reported them yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_no: OrderNo,
    pub pay_amount: Money,
    pub platform_income: Money,
    pub pay_fee: Money,
    pub pay_status: BusinessStatus,
    pub split_status: BusinessStatus,
    pub notify_status: BusinessStatus,
}

impl NewOrder {
    pub fn new(order_no: OrderNo, pay_amount: Money) -> Self {
        Self {
            order_no,
            pay_amount,
            platform_income: Money::default(),
            pay_fee: Money::default(),
            pay_status: BusinessStatus::default(),
            split_status: BusinessStatus::default(),
            notify_status: BusinessStatus::default(),
        }
    }

    pub fn with_platform_income(mut self, income: Money) -> Self {
        self.platform_income = income;
        self
    }

    pub fn with_pay_fee(mut self, fee: Money) -> Self {
        self.pay_fee = fee;
        self
    }

    pub fn with_statuses(mut self, pay: BusinessStatus, split: BusinessStatus, notify: BusinessStatus) -> Self {
        self.pay_status = pay;
        self.split_status = split;
        self.notify_status = notify;
        self
    }
}

//--------------------------------------     SplitDetail     ---------------------------------------------------------
/// One reported split line inside a `recon_order` submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitDetail {
    pub sub_order_no: String,
    pub merchant_id: String,
    /// The merchant's own order number, usable as an alternate lookup key for notifications and refunds.
    pub merchant_order_no: Option<String>,
    pub split_amount: Money,
    /// Defaults to the order-level notification status when not reported per split.
    pub notify_status: Option<BusinessStatus>,
}

impl SplitDetail {
    pub fn new<S: Into<String>>(sub_order_no: S, merchant_id: S, split_amount: Money) -> Self {
        Self {
            sub_order_no: sub_order_no.into(),
            merchant_id: merchant_id.into(),
            merchant_order_no: None,
            split_amount,
            notify_status: None,
        }
    }

    pub fn with_merchant_order_no<S: Into<String>>(mut self, merchant_order_no: S) -> Self {
        self.merchant_order_no = Some(merchant_order_no.into());
        self
    }

    pub fn with_notify_status(mut self, status: BusinessStatus) -> Self {
        self.notify_status = Some(status);
        self
    }
}

//--------------------------------------      SplitSub       ---------------------------------------------------------
/// A persisted split record, stamped with its parent order number.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SplitSub {
    pub order_no: OrderNo,
    pub sub_order_no: String,
    pub merchant_id: String,
    pub merchant_order_no: Option<String>,
    pub split_amount: Money,
    pub notify_status: BusinessStatus,
    pub notify_result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    RefundDetail     ---------------------------------------------------------
/// One reported refund split line inside a `recon_refund` submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundDetail {
    pub sub_order_no: String,
    pub merchant_id: String,
    pub merchant_order_no: Option<String>,
    pub refund_split_amount: Money,
}

impl RefundDetail {
    pub fn new<S: Into<String>>(sub_order_no: S, merchant_id: S, refund_split_amount: Money) -> Self {
        Self {
            sub_order_no: sub_order_no.into(),
            merchant_id: merchant_id.into(),
            merchant_order_no: None,
            refund_split_amount,
        }
    }

    pub fn with_merchant_order_no<S: Into<String>>(mut self, merchant_order_no: S) -> Self {
        self.merchant_order_no = Some(merchant_order_no.into());
        self
    }
}

//--------------------------------------   RefundSplitSub    ---------------------------------------------------------
/// A persisted refund split record.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RefundSplitSub {
    pub order_no: OrderNo,
    pub sub_order_no: String,
    pub merchant_id: String,
    pub merchant_order_no: Option<String>,
    pub refund_split_amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    RefundNotice     ---------------------------------------------------------
/// A reported refund, as submitted to the `recon_refund` family.
///
/// Either `order_no` is given directly, or it is resolved through `merchant_id` plus one of
/// `sub_order_no` / `merchant_order_no`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundNotice {
    pub order_no: Option<OrderNo>,
    pub merchant_id: Option<String>,
    pub sub_order_no: Option<String>,
    pub merchant_order_no: Option<String>,
    pub refund_amount: Money,
    pub refund_time: DateTime<Utc>,
    pub refund_status: BusinessStatus,
    pub splits: Vec<RefundDetail>,
}

impl RefundNotice {
    pub fn for_order(order_no: OrderNo, refund_amount: Money, refund_time: DateTime<Utc>) -> Self {
        Self {
            order_no: Some(order_no),
            merchant_id: None,
            sub_order_no: None,
            merchant_order_no: None,
            refund_amount,
            refund_time,
            refund_status: BusinessStatus::Success,
            splits: Vec::new(),
        }
    }

    pub fn for_sub_order<S: Into<String>>(
        merchant_id: S,
        sub_order_no: S,
        refund_amount: Money,
        refund_time: DateTime<Utc>,
    ) -> Self {
        Self {
            order_no: None,
            merchant_id: Some(merchant_id.into()),
            sub_order_no: Some(sub_order_no.into()),
            merchant_order_no: None,
            refund_amount,
            refund_time,
            refund_status: BusinessStatus::Success,
            splits: Vec::new(),
        }
    }

    pub fn for_merchant_order<S: Into<String>>(
        merchant_id: S,
        merchant_order_no: S,
        refund_amount: Money,
        refund_time: DateTime<Utc>,
    ) -> Self {
        Self {
            order_no: None,
            merchant_id: Some(merchant_id.into()),
            sub_order_no: None,
            merchant_order_no: Some(merchant_order_no.into()),
            refund_amount,
            refund_time,
            refund_status: BusinessStatus::Success,
            splits: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: BusinessStatus) -> Self {
        self.refund_status = status;
        self
    }

    pub fn with_splits(mut self, splits: Vec<RefundDetail>) -> Self {
        self.splits = splits;
        self
    }
}

//--------------------------------------     NotifyEvent     ---------------------------------------------------------
/// A merchant notification outcome delivered to the `recon_notify` family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyEvent {
    pub order_no: Option<OrderNo>,
    pub merchant_id: String,
    pub sub_order_no: Option<String>,
    pub merchant_order_no: Option<String>,
    pub notify_url: Option<String>,
    pub status: BusinessStatus,
    /// Raw response payload returned by the notified party.
    pub result: Option<String>,
}

impl NotifyEvent {
    pub fn for_order<S: Into<String>>(order_no: OrderNo, merchant_id: S, status: BusinessStatus) -> Self {
        Self {
            order_no: Some(order_no),
            merchant_id: merchant_id.into(),
            sub_order_no: None,
            merchant_order_no: None,
            notify_url: None,
            status,
            result: None,
        }
    }

    pub fn for_sub_order<S: Into<String>>(merchant_id: S, sub_order_no: S, status: BusinessStatus) -> Self {
        Self {
            order_no: None,
            merchant_id: merchant_id.into(),
            sub_order_no: Some(sub_order_no.into()),
            merchant_order_no: None,
            notify_url: None,
            status,
            result: None,
        }
    }

    pub fn for_merchant_order<S: Into<String>>(merchant_id: S, merchant_order_no: S, status: BusinessStatus) -> Self {
        Self {
            order_no: None,
            merchant_id: merchant_id.into(),
            sub_order_no: None,
            merchant_order_no: Some(merchant_order_no.into()),
            notify_url: None,
            status,
            result: None,
        }
    }

    pub fn with_sub_order_no<S: Into<String>>(mut self, sub_order_no: S) -> Self {
        self.sub_order_no = Some(sub_order_no.into());
        self
    }

    pub fn with_notify_url<S: Into<String>>(mut self, url: S) -> Self {
        self.notify_url = Some(url.into());
        self
    }

    pub fn with_result<S: Into<String>>(mut self, result: S) -> Self {
        self.result = Some(result.into());
        self
    }
}

//--------------------------------------  ExceptionRecord    ---------------------------------------------------------
/// An append-only record of a reconciliation fault. Rows are never updated or deleted.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ExceptionRecord {
    pub order_no: OrderNo,
    pub merchant_id: String,
    pub message: String,
    pub step: ExceptionStep,
    pub created_at: DateTime<Utc>,
}

impl ExceptionRecord {
    pub fn new(order_no: OrderNo, merchant_id: &str, message: &str, step: ExceptionStep) -> Self {
        Self {
            order_no,
            merchant_id: merchant_id.to_string(),
            message: message.to_string(),
            step,
            created_at: Utc::now(),
        }
    }
}

//--------------------------------------      NotifyLog      ---------------------------------------------------------
/// Audit trail of notification calls. One row per call, regardless of outcome.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NotifyLog {
    pub order_no: OrderNo,
    pub merchant_id: String,
    pub sub_order_no: Option<String>,
    pub notify_url: Option<String>,
    pub notify_status: BusinessStatus,
    pub notify_result: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------    ReconSummary     ---------------------------------------------------------
/// Per-date aggregate over reconciled orders.
#[derive(Debug, Clone, Default, Serialize, FromRow)]
pub struct ReconSummary {
    pub total_orders: i64,
    pub success_count: i64,
    pub failure_count: i64,
    pub pending_count: i64,
    pub total_amount: Money,
}
