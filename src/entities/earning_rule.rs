use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Configured policy for converting an order amount into loyalty points.
/// Rules are authored out of band and read-only inputs to the engine.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "earning_rules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub rule_kind: RuleKind,
    /// Threshold the order amount must reach for the rule to apply.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub min_order_value: Decimal,
    pub points_to_award: i32,
    /// Divisor for per-amount-step rules. A positive value here makes the
    /// rule per-step regardless of `rule_kind`.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub amount_step: Option<Decimal>,
    pub channel: RuleChannel,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(30))")]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    #[sea_orm(string_value = "per_amount_step")]
    PerAmountStep,
    #[sea_orm(string_value = "fixed_above_threshold")]
    FixedAboveThreshold,
}

/// Channel a rule applies to. `All` matches both order channels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum RuleChannel {
    #[sea_orm(string_value = "all")]
    All,
    #[sea_orm(string_value = "web")]
    Web,
    #[sea_orm(string_value = "pos")]
    Pos,
}
