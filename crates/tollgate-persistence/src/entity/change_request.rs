//! Change request entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "change_request")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub created_by: String,
    pub created_at: DateTime,
    pub status: String,
    pub version_id: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,
    pub submitted_at: DateTime,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime>,
    pub deployment_version_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::change_detail::Entity")]
    ChangeDetail,
}

impl Related<super::change_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChangeDetail.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
