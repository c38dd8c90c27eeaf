use sqlx::SqliteConnection;

use crate::db_types::{ExceptionRecord, OrderNo};

pub async fn insert_exception(record: &ExceptionRecord, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO recon_exceptions (order_no, merchant_id, message, step, created_at)
            VALUES ($1, $2, $3, $4, $5);
        "#,
    )
    .bind(&record.order_no)
    .bind(&record.merchant_id)
    .bind(&record.message)
    .bind(record.step)
    .bind(record.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_exceptions(
    order_no: &OrderNo,
    conn: &mut SqliteConnection,
) -> Result<Vec<ExceptionRecord>, sqlx::Error> {
    let records = sqlx::query_as(
        r#"
            SELECT order_no, merchant_id, message, step, created_at
            FROM recon_exceptions WHERE order_no = $1 ORDER BY created_at ASC
        "#,
    )
    .bind(order_no.as_str())
    .fetch_all(conn)
    .await?;
    Ok(records)
}
