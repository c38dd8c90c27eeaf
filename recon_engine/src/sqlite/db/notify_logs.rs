use sqlx::SqliteConnection;

use crate::db_types::{NotifyLog, OrderNo};

pub async fn insert_notify_log(log: &NotifyLog, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO recon_notify_logs (
                order_no,
                merchant_id,
                sub_order_no,
                notify_url,
                notify_status,
                notify_result,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7);
        "#,
    )
    .bind(&log.order_no)
    .bind(&log.merchant_id)
    .bind(&log.sub_order_no)
    .bind(&log.notify_url)
    .bind(log.notify_status)
    .bind(&log.notify_result)
    .bind(log.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_notify_logs(order_no: &OrderNo, conn: &mut SqliteConnection) -> Result<Vec<NotifyLog>, sqlx::Error> {
    let logs = sqlx::query_as(
        r#"
            SELECT order_no, merchant_id, sub_order_no, notify_url, notify_status, notify_result, created_at
            FROM recon_notify_logs WHERE order_no = $1 ORDER BY created_at ASC
        "#,
    )
    .bind(order_no.as_str())
    .fetch_all(conn)
    .await?;
    Ok(logs)
}
