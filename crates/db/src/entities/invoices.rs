//! `SeaORM` Entity for invoices table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub client_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub total_cost: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub paid_amount: Decimal,
    pub generated_at: DateTimeWithTimeZone,
    pub invoice_period: String,
    #[sea_orm(column_type = "Text")]
    pub note: String,
    pub status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::clients::Entity",
        from = "Column::ClientId",
        to = "super::clients::Column::Id"
    )]
    Clients,
    #[sea_orm(has_many = "super::invoice_transactions::Entity")]
    InvoiceTransactions,
}

impl Related<super::clients::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Clients.def()
    }
}

impl Related<super::invoice_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InvoiceTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
