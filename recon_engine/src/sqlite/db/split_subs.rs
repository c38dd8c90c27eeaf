use chrono::Utc;
use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{BusinessStatus, OrderNo, SplitSub};

pub async fn insert_split_subs(subs: &[SplitSub], conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    for sub in subs {
        sqlx::query(
            r#"
                INSERT INTO recon_split_subs (
                    order_no,
                    sub_order_no,
                    merchant_id,
                    merchant_order_no,
                    split_amount,
                    notify_status,
                    notify_result,
                    created_at,
                    updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9);
            "#,
        )
        .bind(&sub.order_no)
        .bind(&sub.sub_order_no)
        .bind(&sub.merchant_id)
        .bind(&sub.merchant_order_no)
        .bind(sub.split_amount)
        .bind(sub.notify_status)
        .bind(&sub.notify_result)
        .bind(sub.created_at)
        .bind(sub.updated_at)
        .execute(&mut *conn)
        .await?;
    }
    trace!("🗃️ {} split records inserted", subs.len());
    Ok(())
}

pub async fn fetch_split_subs(order_no: &OrderNo, conn: &mut SqliteConnection) -> Result<Vec<SplitSub>, sqlx::Error> {
    let subs = sqlx::query_as(
        r#"
            SELECT order_no, sub_order_no, merchant_id, merchant_order_no, split_amount, notify_status,
                   notify_result, created_at, updated_at
            FROM recon_split_subs WHERE order_no = $1 ORDER BY sub_order_no ASC
        "#,
    )
    .bind(order_no.as_str())
    .fetch_all(conn)
    .await?;
    Ok(subs)
}

pub async fn update_split_sub_notify_status(
    order_no: &OrderNo,
    merchant_id: &str,
    sub_order_no: &str,
    status: BusinessStatus,
    notify_result: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE recon_split_subs SET notify_status = $1, notify_result = $2, updated_at = $3
            WHERE order_no = $4 AND merchant_id = $5 AND sub_order_no = $6
        "#,
    )
    .bind(status)
    .bind(notify_result)
    .bind(Utc::now())
    .bind(order_no.as_str())
    .bind(merchant_id)
    .bind(sub_order_no)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn find_order_no_by_sub(
    merchant_id: &str,
    sub_order_no: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderNo>, sqlx::Error> {
    let order_no = sqlx::query_scalar(
        "SELECT order_no FROM recon_split_subs WHERE merchant_id = $1 AND sub_order_no = $2 LIMIT 1",
    )
    .bind(merchant_id)
    .bind(sub_order_no)
    .fetch_optional(conn)
    .await?;
    Ok(order_no)
}

pub async fn find_order_no_by_merchant_order(
    merchant_id: &str,
    merchant_order_no: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderNo>, sqlx::Error> {
    let order_no = sqlx::query_scalar(
        "SELECT order_no FROM recon_split_subs WHERE merchant_id = $1 AND merchant_order_no = $2 LIMIT 1",
    )
    .bind(merchant_id)
    .bind(merchant_order_no)
    .fetch_optional(conn)
    .await?;
    Ok(order_no)
}

/// True when no split record of the order is still unnotified. An order without split records is
/// vacuously closed.
pub async fn is_all_notified(order_no: &OrderNo, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let outstanding: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM recon_split_subs WHERE order_no = $1 AND notify_status != $2")
            .bind(order_no.as_str())
            .bind(BusinessStatus::Success)
            .fetch_one(conn)
            .await?;
    Ok(outstanding == 0)
}
