//! Review workflow schema: change requests, their details, table locks, and
//! the generic live and staging record tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChangeRequest::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChangeRequest::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChangeRequest::CreatedBy).string_len(128).not_null())
                    .col(ColumnDef::new(ChangeRequest::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(ChangeRequest::Status).string_len(16).not_null())
                    .col(ColumnDef::new(ChangeRequest::VersionId).string_len(128).not_null())
                    .col(ColumnDef::new(ChangeRequest::Comment).text())
                    .col(ColumnDef::new(ChangeRequest::SubmittedAt).date_time().not_null())
                    .col(ColumnDef::new(ChangeRequest::ReviewedBy).string_len(128))
                    .col(ColumnDef::new(ChangeRequest::ReviewedAt).date_time())
                    .col(ColumnDef::new(ChangeRequest::DeploymentVersionId).string_len(128))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_change_request_status")
                    .table(ChangeRequest::Table)
                    .col(ChangeRequest::Status)
                    .col(ChangeRequest::SubmittedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChangeDetail::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChangeDetail::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChangeDetail::RequestId).string_len(64).not_null())
                    .col(ColumnDef::new(ChangeDetail::TableName).string_len(128).not_null())
                    .col(ColumnDef::new(ChangeDetail::RuleKey).json_binary().not_null())
                    .col(ColumnDef::new(ChangeDetail::OldValue).json_binary())
                    .col(ColumnDef::new(ChangeDetail::NewValue).json_binary())
                    .col(ColumnDef::new(ChangeDetail::Status).string_len(16).not_null())
                    .col(ColumnDef::new(ChangeDetail::ReviewedBy).string_len(128))
                    .col(ColumnDef::new(ChangeDetail::ReviewedAt).date_time())
                    .col(ColumnDef::new(ChangeDetail::Comment).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_change_detail_request")
                            .from(ChangeDetail::Table, ChangeDetail::RequestId)
                            .to(ChangeRequest::Table, ChangeRequest::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_change_detail_request_table")
                    .table(ChangeDetail::Table)
                    .col(ChangeDetail::RequestId)
                    .col(ChangeDetail::TableName)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TableLock::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TableLock::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TableLock::SchemaId).string_len(128).not_null())
                    .col(ColumnDef::new(TableLock::LockedBy).string_len(128).not_null())
                    .col(ColumnDef::new(TableLock::RequestId).string_len(64).not_null())
                    .col(ColumnDef::new(TableLock::LockedAt).date_time().not_null())
                    .col(ColumnDef::new(TableLock::ExpiresAt).date_time())
                    .to_owned(),
            )
            .await?;

        // At most one lock per table; concurrent submissions race on this index
        manager
            .create_index(
                Index::create()
                    .name("uk_table_lock_schema")
                    .table(TableLock::Table)
                    .col(TableLock::SchemaId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_table_lock_request")
                    .table(TableLock::Table)
                    .col(TableLock::RequestId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LiveRecord::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LiveRecord::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LiveRecord::SchemaId).string_len(128).not_null())
                    .col(ColumnDef::new(LiveRecord::RecordKey).string_len(255).not_null())
                    .col(ColumnDef::new(LiveRecord::Payload).json_binary().not_null())
                    .col(ColumnDef::new(LiveRecord::UpdatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uk_live_record_schema_key")
                    .table(LiveRecord::Table)
                    .col(LiveRecord::SchemaId)
                    .col(LiveRecord::RecordKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StagedRecord::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StagedRecord::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StagedRecord::StagingTable).string_len(128).not_null())
                    .col(ColumnDef::new(StagedRecord::RequestId).string_len(64).not_null())
                    .col(ColumnDef::new(StagedRecord::RecordKey).string_len(255).not_null())
                    .col(ColumnDef::new(StagedRecord::Operation).string_len(16).not_null())
                    .col(ColumnDef::new(StagedRecord::Payload).json_binary())
                    .col(ColumnDef::new(StagedRecord::CreatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_staged_record_table_request")
                    .table(StagedRecord::Table)
                    .col(StagedRecord::StagingTable)
                    .col(StagedRecord::RequestId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StagedRecord::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LiveRecord::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TableLock::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChangeDetail::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChangeRequest::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum ChangeRequest {
    Table,
    Id,
    CreatedBy,
    CreatedAt,
    Status,
    VersionId,
    Comment,
    SubmittedAt,
    ReviewedBy,
    ReviewedAt,
    DeploymentVersionId,
}

#[derive(DeriveIden)]
enum ChangeDetail {
    Table,
    Id,
    RequestId,
    TableName,
    RuleKey,
    OldValue,
    NewValue,
    Status,
    ReviewedBy,
    ReviewedAt,
    Comment,
}

#[derive(DeriveIden)]
enum TableLock {
    Table,
    Id,
    SchemaId,
    LockedBy,
    RequestId,
    LockedAt,
    ExpiresAt,
}

#[derive(DeriveIden)]
enum LiveRecord {
    Table,
    Id,
    SchemaId,
    RecordKey,
    Payload,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum StagedRecord {
    Table,
    Id,
    StagingTable,
    RequestId,
    RecordKey,
    Operation,
    Payload,
    CreatedAt,
}
