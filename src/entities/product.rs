use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog product. The engine reads price, tax rate and stock; only the
/// stock counter is ever written here, under the checkout row lock.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,

    /// Short catalog code, used as the fiscal line-item code when present.
    #[sea_orm(nullable)]
    pub code: Option<String>,

    /// Tax-inclusive sale price.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub price: Decimal,

    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub cost: Decimal,

    /// Tax rate as configured upstream. Usually percent form (15), but some
    /// catalogs store the fraction form (0.15); consumers normalize.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub tax_rate: Decimal,

    pub stock_quantity: i32,

    /// When false the stock counter is informational and never locked.
    pub tracks_stock: bool,

    pub active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_size::Entity")]
    Sizes,
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::product_size::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sizes.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
