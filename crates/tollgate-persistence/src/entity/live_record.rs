//! Live record entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "live_record")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub schema_id: String,
    pub record_key: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub payload: Json,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
