use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{OrderNo, RefundSplitSub};

pub async fn insert_refund_split_subs(
    subs: &[RefundSplitSub],
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    for sub in subs {
        sqlx::query(
            r#"
                INSERT INTO recon_refund_split_subs (
                    order_no,
                    sub_order_no,
                    merchant_id,
                    merchant_order_no,
                    refund_split_amount,
                    created_at,
                    updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7);
            "#,
        )
        .bind(&sub.order_no)
        .bind(&sub.sub_order_no)
        .bind(&sub.merchant_id)
        .bind(&sub.merchant_order_no)
        .bind(sub.refund_split_amount)
        .bind(sub.created_at)
        .bind(sub.updated_at)
        .execute(&mut *conn)
        .await?;
    }
    trace!("🗃️ {} refund split records inserted", subs.len());
    Ok(())
}

pub async fn fetch_refund_split_subs(
    order_no: &OrderNo,
    conn: &mut SqliteConnection,
) -> Result<Vec<RefundSplitSub>, sqlx::Error> {
    let subs = sqlx::query_as(
        r#"
            SELECT order_no, sub_order_no, merchant_id, merchant_order_no, refund_split_amount, created_at, updated_at
            FROM recon_refund_split_subs WHERE order_no = $1 ORDER BY sub_order_no ASC
        "#,
    )
    .bind(order_no.as_str())
    .fetch_all(conn)
    .await?;
    Ok(subs)
}
