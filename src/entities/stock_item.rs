use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A stocked medication or supply.
///
/// `current_stock` is only ever written by the stock ledger, which also bumps
/// `version` on every write so concurrent writers can detect each other.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = StockItem)]
#[sea_orm(table_name = "stock_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub current_stock: Decimal,
    pub unit: StockUnit,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub purchase_price: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub sale_price: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub reorder_level: Decimal,
    pub expiry_date: Option<NaiveDate>,
    pub supplier_id: Option<i32>,
    pub location: Option<String>,
    pub is_active: bool,
    pub version: i32,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::supplier::Entity",
        from = "Column::SupplierId",
        to = "super::supplier::Column::Id",
        on_delete = "SetNull"
    )]
    Supplier,
    #[sea_orm(has_many = "super::inventory_history::Entity")]
    InventoryHistory,
    #[sea_orm(has_many = "super::supplier_stock_item::Entity")]
    SupplierStockItems,
}

impl Related<super::supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl Related<super::inventory_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryHistory.def()
    }
}

impl Related<super::supplier_stock_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SupplierStockItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Dispensing unit of a stock item
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum StockUnit {
    #[sea_orm(string_value = "Pill")]
    Pill,
    #[sea_orm(string_value = "Tablet")]
    Tablet,
    #[sea_orm(string_value = "Capsule")]
    Capsule,
    #[sea_orm(string_value = "Syrup")]
    Syrup,
    #[sea_orm(string_value = "Injection")]
    Injection,
    #[sea_orm(string_value = "Vial")]
    Vial,
    #[sea_orm(string_value = "Ampule")]
    Ampule,
    #[sea_orm(string_value = "Bottle")]
    Bottle,
    #[sea_orm(string_value = "Tube")]
    Tube,
    #[sea_orm(string_value = "Pouch")]
    Pouch,
    #[sea_orm(string_value = "Unit")]
    Unit,
    #[sea_orm(string_value = "Other")]
    Other,
}
