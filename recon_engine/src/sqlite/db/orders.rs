use chrono::{NaiveDate, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{BusinessStatus, Order, OrderNo, ReconStatus, ReconSummary},
    traits::ReconBackendError,
};
use recon_common::Money;

/// Inserts a new order row. The order number is the primary key; a duplicate insert is reported as
/// [`ReconBackendError::OrderAlreadyExists`] and leaves the existing row untouched.
pub async fn insert_order(order: &Order, conn: &mut SqliteConnection) -> Result<(), ReconBackendError> {
    let result = sqlx::query(
        r#"
            INSERT INTO recon_orders (
                order_no,
                pay_amount,
                platform_income,
                pay_fee,
                split_total_amount,
                pay_status,
                split_status,
                notify_status,
                notify_result,
                recon_status,
                refund_status,
                refund_amount,
                refund_time,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15);
        "#,
    )
    .bind(&order.order_no)
    .bind(order.pay_amount)
    .bind(order.platform_income)
    .bind(order.pay_fee)
    .bind(order.split_total_amount)
    .bind(order.pay_status)
    .bind(order.split_status)
    .bind(order.notify_status)
    .bind(&order.notify_result)
    .bind(order.recon_status)
    .bind(order.refund_status)
    .bind(order.refund_amount)
    .bind(order.refund_time)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(conn)
    .await;
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.as_database_error().map(|de| de.is_unique_violation()).unwrap_or(false) => {
            Err(ReconBackendError::OrderAlreadyExists(order.order_no.clone()))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_order_by_order_no(
    order_no: &OrderNo,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM recon_orders WHERE order_no = $1")
        .bind(order_no.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Transitions the reconciliation verdict out of `Pending`. The guard in the `WHERE` clause is what
/// makes the verdict monotonic under concurrent callers.
pub async fn update_recon_status(
    order_no: &OrderNo,
    status: ReconStatus,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE recon_orders SET recon_status = $1, updated_at = $2 WHERE order_no = $3 AND recon_status = $4",
    )
    .bind(status)
    .bind(Utc::now())
    .bind(order_no.as_str())
    .bind(ReconStatus::Pending)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Transitions the order-level notification status out of `Processing`, guarded like
/// [`update_recon_status`].
pub async fn update_notify_status(
    order_no: &OrderNo,
    status: BusinessStatus,
    notify_result: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE recon_orders SET notify_status = $1, notify_result = $2, updated_at = $3
            WHERE order_no = $4 AND notify_status = $5
        "#,
    )
    .bind(status)
    .bind(notify_result)
    .bind(Utc::now())
    .bind(order_no.as_str())
    .bind(BusinessStatus::Processing)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Records the refund leg on the order. Unguarded: refunds may arrive repeatedly and are tracked
/// independently of the reconciliation verdict.
pub async fn update_refund_status(
    order_no: &OrderNo,
    status: BusinessStatus,
    amount: Money,
    time: chrono::DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE recon_orders SET refund_status = $1, refund_amount = $2, refund_time = $3, updated_at = $4
            WHERE order_no = $5
        "#,
    )
    .bind(status)
    .bind(amount)
    .bind(time)
    .bind(Utc::now())
    .bind(order_no.as_str())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn fetch_pending_orders(
    date: NaiveDate,
    offset: u32,
    limit: u32,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        r#"
            SELECT * FROM recon_orders
            WHERE recon_status = $1 AND date(created_at) = $2
            ORDER BY created_at ASC LIMIT $3 OFFSET $4
        "#,
    )
    .bind(ReconStatus::Pending)
    .bind(date)
    .bind(limit)
    .bind(offset)
    .fetch_all(conn)
    .await?;
    trace!("🗃️ {} pending orders fetched for {date} (offset {offset})", orders.len());
    Ok(orders)
}

pub async fn fetch_orders_by_date(
    date: NaiveDate,
    offset: u32,
    limit: u32,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        "SELECT * FROM recon_orders WHERE date(created_at) = $1 ORDER BY created_at ASC LIMIT $2 OFFSET $3",
    )
    .bind(date)
    .bind(limit)
    .bind(offset)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

pub async fn fetch_summary(date: NaiveDate, conn: &mut SqliteConnection) -> Result<ReconSummary, sqlx::Error> {
    let summary = sqlx::query_as(
        r#"
            SELECT
                COUNT(*) AS total_orders,
                COALESCE(SUM(CASE WHEN recon_status = 1 THEN 1 ELSE 0 END), 0) AS success_count,
                COALESCE(SUM(CASE WHEN recon_status = 2 THEN 1 ELSE 0 END), 0) AS failure_count,
                COALESCE(SUM(CASE WHEN recon_status = 0 THEN 1 ELSE 0 END), 0) AS pending_count,
                COALESCE(SUM(pay_amount), 0) AS total_amount
            FROM recon_orders WHERE date(created_at) = $1
        "#,
    )
    .bind(date)
    .fetch_one(conn)
    .await?;
    Ok(summary)
}
