use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseTransaction, DbBackend, EntityTrait, QueryFilter, QuerySelect,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    entities::product::{self, Entity as Product},
    errors::ServiceError,
};

/// A product row held under an exclusive lock for the duration of the
/// surrounding transaction. The lock releases on commit or rollback, so
/// every exit path (including errors) gives it up.
pub struct LockedProduct<'a> {
    txn: &'a DatabaseTransaction,
    product: product::Model,
}

impl<'a> LockedProduct<'a> {
    pub fn model(&self) -> &product::Model {
        &self.product
    }

    pub fn available(&self) -> i32 {
        self.product.stock_quantity
    }

    /// Verifies availability and decrements under the held lock. Fails with
    /// `InsufficientStock` naming the product and the quantity actually
    /// available; the caller is expected to roll the whole transaction back.
    pub async fn decrement(self, quantity: i32) -> Result<product::Model, ServiceError> {
        if self.product.stock_quantity < quantity {
            return Err(ServiceError::InsufficientStock(format!(
                "product {}: {} available, {} requested",
                self.product.name, self.product.stock_quantity, quantity
            )));
        }

        let remaining = self.product.stock_quantity - quantity;
        let mut active: product::ActiveModel = self.product.into();
        active.stock_quantity = Set(remaining);
        active.updated_at = Set(chrono::Utc::now());
        let updated = active.update(self.txn).await?;

        debug!(
            product_id = %updated.id,
            remaining = updated.stock_quantity,
            "stock decremented"
        );
        Ok(updated)
    }
}

/// Acquires an exclusive row lock on a product inside the given transaction
/// and returns a handle scoped to it.
///
/// Postgres takes a real `SELECT ... FOR UPDATE`; SQLite has no row locks
/// and relies on its single-writer transaction instead, so the clause is
/// skipped there.
#[instrument(skip(txn))]
pub async fn lock_product(
    txn: &DatabaseTransaction,
    product_id: Uuid,
) -> Result<LockedProduct<'_>, ServiceError> {
    let mut query = Product::find_by_id(product_id);
    if txn.get_database_backend() == DbBackend::Postgres {
        query = query.lock_exclusive();
    }

    let product = query
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

    Ok(LockedProduct { txn, product })
}

/// Returns quantity to a product's stock counter. Used on cancellation and
/// line-item removal; unconditional and independently atomic, it does not
/// need the original lock window.
#[instrument(skip(db))]
pub async fn restock<C: ConnectionTrait>(
    db: &C,
    product_id: Uuid,
    quantity: i32,
) -> Result<(), ServiceError> {
    Product::update_many()
        .col_expr(
            product::Column::StockQuantity,
            Expr::col(product::Column::StockQuantity).add(quantity),
        )
        .col_expr(
            product::Column::UpdatedAt,
            Expr::value(chrono::Utc::now()),
        )
        .filter(product::Column::Id.eq(product_id))
        .filter(product::Column::TracksStock.eq(true))
        .exec(db)
        .await?;

    debug!(product_id = %product_id, quantity, "stock restored");
    Ok(())
}
