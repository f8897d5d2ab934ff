//! Voucher history log.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use vouchledger_core::ledger::LedgerError;
use vouchledger_core::workflow::HistoryEntry;

use crate::entities::voucher_history;
use crate::error::db_err;

/// Appends one history row.
pub(crate) async fn append<C: ConnectionTrait>(
    conn: &C,
    voucher_id: i64,
    actor: &str,
    entry: HistoryEntry,
) -> Result<voucher_history::Model, LedgerError> {
    voucher_history::ActiveModel {
        voucher_id: Set(voucher_id),
        actor: Set(actor.to_string()),
        action: Set(entry.action.to_string()),
        detail: Set(Some(entry.detail).filter(|d| !d.is_empty())),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(db_err)
}

/// History of a voucher, oldest first.
pub(crate) async fn list<C: ConnectionTrait>(
    conn: &C,
    voucher_id: i64,
) -> Result<Vec<voucher_history::Model>, LedgerError> {
    voucher_history::Entity::find()
        .filter(voucher_history::Column::VoucherId.eq(voucher_id))
        .order_by_asc(voucher_history::Column::Id)
        .all(conn)
        .await
        .map_err(db_err)
}
