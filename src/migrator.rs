use anyhow::Result;
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::prelude::*;
use std::time::Duration;
use tracing::{error, info};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_inventory_tables::Migration),
            Box::new(m20260101_000002_create_production_order_tables::Migration),
            Box::new(m20260101_000003_create_batch_and_issue_tables::Migration),
            Box::new(m20260101_000004_create_warehouse_deliveries_table::Migration),
            Box::new(m20260101_000005_create_sequence_and_outbox_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20260101_000001_create_inventory_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000001_create_inventory_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Materials::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Materials::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Materials::Name).string().not_null())
                        .col(ColumnDef::new(Materials::MaterialType).string_len(16).not_null())
                        .col(ColumnDef::new(Materials::Unit).string_len(16).not_null())
                        .col(
                            ColumnDef::new(Materials::CurrentStock)
                                .decimal()
                                .not_null()
                                .default(0)
                                .check(Expr::col(Materials::CurrentStock).gte(0)),
                        )
                        .col(
                            ColumnDef::new(Materials::MinStock)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Materials::PricePerUnit)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Materials::Supplier).string().null())
                        .col(
                            ColumnDef::new(Materials::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Materials::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Materials::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_materials_type_active")
                        .table(Materials::Table)
                        .col(Materials::MaterialType)
                        .col(Materials::IsActive)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::MaterialId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockMovements::Direction)
                                .string_len(8)
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::Quantity).decimal().not_null())
                        .col(ColumnDef::new(StockMovements::StockAfter).decimal().not_null())
                        .col(ColumnDef::new(StockMovements::Reason).string().not_null())
                        .col(ColumnDef::new(StockMovements::UserId).uuid().null())
                        .col(
                            ColumnDef::new(StockMovements::ProductionOrderId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_movements_material")
                                .from(StockMovements::Table, StockMovements::MaterialId)
                                .to(Materials::Table, Materials::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_movements_material_id")
                        .table(StockMovements::Table)
                        .col(StockMovements::MaterialId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Windows::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Windows::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Windows::Name).string().not_null())
                        .col(ColumnDef::new(Windows::WidthMm).integer().not_null())
                        .col(ColumnDef::new(Windows::HeightMm).integer().not_null())
                        .col(ColumnDef::new(Windows::Price).decimal().null())
                        .col(
                            ColumnDef::new(Windows::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Windows::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Windows::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockMovements::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Materials::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Materials {
        Table,
        Id,
        Name,
        MaterialType,
        Unit,
        CurrentStock,
        MinStock,
        PricePerUnit,
        Supplier,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum StockMovements {
        Table,
        Id,
        MaterialId,
        Direction,
        Quantity,
        StockAfter,
        Reason,
        UserId,
        ProductionOrderId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Windows {
        Table,
        Id,
        Name,
        WidthMm,
        HeightMm,
        Price,
        IsActive,
        CreatedAt,
    }
}

mod m20260101_000002_create_production_order_tables {

    use super::m20260101_000001_create_inventory_tables::{Materials, Windows};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000002_create_production_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProductionOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductionOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionOrders::OrderNumber)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(ProductionOrders::SourceType)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductionOrders::SourceOrderId).uuid().null())
                        .col(ColumnDef::new(ProductionOrders::CustomerName).string().null())
                        .col(ColumnDef::new(ProductionOrders::CustomerEmail).string().null())
                        .col(ColumnDef::new(ProductionOrders::DeliveryAddress).text().null())
                        .col(
                            ColumnDef::new(ProductionOrders::ProductDescription)
                                .text()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductionOrders::Specifications).json().null())
                        .col(ColumnDef::new(ProductionOrders::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(ProductionOrders::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionOrders::HeldFromStatus)
                                .string_len(32)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductionOrders::Priority)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductionOrders::AssignedTo).uuid().null())
                        .col(
                            ColumnDef::new(ProductionOrders::IsConfirmed)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ProductionOrders::ConfirmedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(ProductionOrders::ConfirmedBy).uuid().null())
                        .col(
                            ColumnDef::new(ProductionOrders::IsDelayed)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(ProductionOrders::DelayReason).text().null())
                        .col(
                            ColumnDef::new(ProductionOrders::RevisedCompletionAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductionOrders::EstimatedCompletionAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductionOrders::StartedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductionOrders::ProductionTimeHours)
                                .integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductionOrders::EstimatedWarehouseDeliveryAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductionOrders::ActualCompletionAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(ProductionOrders::Notes).text().null())
                        .col(
                            ColumnDef::new(ProductionOrders::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(ProductionOrders::CreatedBy).uuid().null())
                        .col(ColumnDef::new(ProductionOrders::UpdatedBy).uuid().null())
                        .col(
                            ColumnDef::new(ProductionOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_production_orders_status")
                        .table(ProductionOrders::Table)
                        .col(ProductionOrders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_production_orders_assigned_to")
                        .table(ProductionOrders::Table)
                        .col(ProductionOrders::AssignedTo)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductionOrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductionOrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionOrderItems::ProductionOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductionOrderItems::WindowId).uuid().not_null())
                        .col(
                            ColumnDef::new(ProductionOrderItems::Quantity)
                                .integer()
                                .not_null()
                                .check(Expr::col(ProductionOrderItems::Quantity).gte(1)),
                        )
                        .col(
                            ColumnDef::new(ProductionOrderItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_production_order_items_order")
                                .from(
                                    ProductionOrderItems::Table,
                                    ProductionOrderItems::ProductionOrderId,
                                )
                                .to(ProductionOrders::Table, ProductionOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_production_order_items_window")
                                .from(ProductionOrderItems::Table, ProductionOrderItems::WindowId)
                                .to(Windows::Table, Windows::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductionMaterials::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductionMaterials::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionMaterials::ProductionOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionMaterials::MaterialId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionMaterials::QuantityRequired)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionMaterials::QuantityUsed)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductionMaterials::ReturnedQuantity)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductionMaterials::ReservedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionMaterials::UsedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductionMaterials::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_production_materials_order")
                                .from(
                                    ProductionMaterials::Table,
                                    ProductionMaterials::ProductionOrderId,
                                )
                                .to(ProductionOrders::Table, ProductionOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_production_materials_material")
                                .from(ProductionMaterials::Table, ProductionMaterials::MaterialId)
                                .to(Materials::Table, Materials::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductionTimelines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductionTimelines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionTimelines::ProductionOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionTimelines::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductionTimelines::Notes).text().null())
                        .col(ColumnDef::new(ProductionTimelines::DelayReason).text().null())
                        .col(
                            ColumnDef::new(ProductionTimelines::RevisedCompletionAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(ProductionTimelines::UserId).uuid().null())
                        .col(
                            ColumnDef::new(ProductionTimelines::Sequence)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionTimelines::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_production_timelines_order")
                                .from(
                                    ProductionTimelines::Table,
                                    ProductionTimelines::ProductionOrderId,
                                )
                                .to(ProductionOrders::Table, ProductionOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_production_timelines_order_sequence")
                        .table(ProductionTimelines::Table)
                        .col(ProductionTimelines::ProductionOrderId)
                        .col(ProductionTimelines::Sequence)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductionTimelines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductionMaterials::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductionOrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductionOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum ProductionOrders {
        Table,
        Id,
        OrderNumber,
        SourceType,
        SourceOrderId,
        CustomerName,
        CustomerEmail,
        DeliveryAddress,
        ProductDescription,
        Specifications,
        Quantity,
        Status,
        HeldFromStatus,
        Priority,
        AssignedTo,
        IsConfirmed,
        ConfirmedAt,
        ConfirmedBy,
        IsDelayed,
        DelayReason,
        RevisedCompletionAt,
        EstimatedCompletionAt,
        StartedAt,
        ProductionTimeHours,
        EstimatedWarehouseDeliveryAt,
        ActualCompletionAt,
        Notes,
        Version,
        CreatedBy,
        UpdatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductionOrderItems {
        Table,
        Id,
        ProductionOrderId,
        WindowId,
        Quantity,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductionMaterials {
        Table,
        Id,
        ProductionOrderId,
        MaterialId,
        QuantityRequired,
        QuantityUsed,
        ReturnedQuantity,
        ReservedAt,
        UsedAt,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductionTimelines {
        Table,
        Id,
        ProductionOrderId,
        Status,
        Notes,
        DelayReason,
        RevisedCompletionAt,
        UserId,
        Sequence,
        CreatedAt,
    }
}

mod m20260101_000003_create_batch_and_issue_tables {

    use super::m20260101_000002_create_production_order_tables::ProductionOrders;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000003_create_batch_and_issue_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProductionBatches::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductionBatches::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionBatches::ProductionOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionBatches::BatchNumber)
                                .string_len(48)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(ProductionBatches::Quantity)
                                .integer()
                                .not_null()
                                .check(Expr::col(ProductionBatches::Quantity).gte(1)),
                        )
                        .col(
                            ColumnDef::new(ProductionBatches::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionBatches::QualityCheckPassed)
                                .boolean()
                                .null(),
                        )
                        .col(ColumnDef::new(ProductionBatches::QualityNotes).text().null())
                        .col(
                            ColumnDef::new(ProductionBatches::StartedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionBatches::CompletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductionBatches::ShippedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductionBatches::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionBatches::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_production_batches_order")
                                .from(ProductionBatches::Table, ProductionBatches::ProductionOrderId)
                                .to(ProductionOrders::Table, ProductionOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_production_batches_order_id")
                        .table(ProductionBatches::Table)
                        .col(ProductionBatches::ProductionOrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductionIssues::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductionIssues::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionIssues::ProductionOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionIssues::IssueType)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionIssues::Severity)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductionIssues::Description).text().not_null())
                        .col(
                            ColumnDef::new(ProductionIssues::Impact)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionIssues::EstimatedDelayHours)
                                .integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductionIssues::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductionIssues::ReportedBy).uuid().null())
                        .col(ColumnDef::new(ProductionIssues::ResolvedBy).uuid().null())
                        .col(
                            ColumnDef::new(ProductionIssues::ResolvedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(ProductionIssues::ResolutionNotes).text().null())
                        .col(
                            ColumnDef::new(ProductionIssues::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionIssues::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_production_issues_order")
                                .from(ProductionIssues::Table, ProductionIssues::ProductionOrderId)
                                .to(ProductionOrders::Table, ProductionOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_production_issues_order_status")
                        .table(ProductionIssues::Table)
                        .col(ProductionIssues::ProductionOrderId)
                        .col(ProductionIssues::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductionIssues::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductionBatches::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum ProductionBatches {
        Table,
        Id,
        ProductionOrderId,
        BatchNumber,
        Quantity,
        Status,
        QualityCheckPassed,
        QualityNotes,
        StartedAt,
        CompletedAt,
        ShippedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductionIssues {
        Table,
        Id,
        ProductionOrderId,
        IssueType,
        Severity,
        Description,
        Impact,
        EstimatedDelayHours,
        Status,
        ReportedBy,
        ResolvedBy,
        ResolvedAt,
        ResolutionNotes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20260101_000004_create_warehouse_deliveries_table {

    use super::m20260101_000002_create_production_order_tables::ProductionOrders;
    use super::m20260101_000003_create_batch_and_issue_tables::ProductionBatches;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000004_create_warehouse_deliveries_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WarehouseDeliveries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseDeliveries::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseDeliveries::DeliveryNumber)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(WarehouseDeliveries::ProductionOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseDeliveries::ProductionBatchId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseDeliveries::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseDeliveries::ExpectedDeliveryDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseDeliveries::ActualDeliveryDate)
                                .date()
                                .null(),
                        )
                        .col(ColumnDef::new(WarehouseDeliveries::Items).json().not_null())
                        .col(ColumnDef::new(WarehouseDeliveries::Notes).text().null())
                        .col(
                            ColumnDef::new(WarehouseDeliveries::RejectionReason)
                                .text()
                                .null(),
                        )
                        .col(ColumnDef::new(WarehouseDeliveries::ShippedBy).uuid().null())
                        .col(
                            ColumnDef::new(WarehouseDeliveries::ShippedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(WarehouseDeliveries::ReceivedBy).uuid().null())
                        .col(
                            ColumnDef::new(WarehouseDeliveries::ReceivedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseDeliveries::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseDeliveries::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_warehouse_deliveries_order")
                                .from(
                                    WarehouseDeliveries::Table,
                                    WarehouseDeliveries::ProductionOrderId,
                                )
                                .to(ProductionOrders::Table, ProductionOrders::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_warehouse_deliveries_batch")
                                .from(
                                    WarehouseDeliveries::Table,
                                    WarehouseDeliveries::ProductionBatchId,
                                )
                                .to(ProductionBatches::Table, ProductionBatches::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_warehouse_deliveries_status")
                        .table(WarehouseDeliveries::Table)
                        .col(WarehouseDeliveries::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WarehouseDeliveries::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum WarehouseDeliveries {
        Table,
        Id,
        DeliveryNumber,
        ProductionOrderId,
        ProductionBatchId,
        Status,
        ExpectedDeliveryDate,
        ActualDeliveryDate,
        Items,
        Notes,
        RejectionReason,
        ShippedBy,
        ShippedAt,
        ReceivedBy,
        ReceivedAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20260101_000005_create_sequence_and_outbox_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000005_create_sequence_and_outbox_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SequenceCounters::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SequenceCounters::Scope)
                                .string_len(96)
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SequenceCounters::Value)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(NotificationOutbox::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(NotificationOutbox::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(NotificationOutbox::TargetRole)
                                .string_len(32)
                                .null(),
                        )
                        .col(ColumnDef::new(NotificationOutbox::TargetUserId).uuid().null())
                        .col(
                            ColumnDef::new(NotificationOutbox::NotificationType)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(ColumnDef::new(NotificationOutbox::Title).string().not_null())
                        .col(ColumnDef::new(NotificationOutbox::Message).text().not_null())
                        .col(ColumnDef::new(NotificationOutbox::Data).json().not_null())
                        .col(
                            ColumnDef::new(NotificationOutbox::Priority)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(NotificationOutbox::Link).string().null())
                        .col(
                            ColumnDef::new(NotificationOutbox::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(NotificationOutbox::Attempts)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(NotificationOutbox::AvailableAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(NotificationOutbox::LastError).text().null())
                        .col(
                            ColumnDef::new(NotificationOutbox::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(NotificationOutbox::ProcessedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_notification_outbox_status_available_at")
                        .table(NotificationOutbox::Table)
                        .col(NotificationOutbox::Status)
                        .col(NotificationOutbox::AvailableAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(NotificationOutbox::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SequenceCounters::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum SequenceCounters {
        Table,
        Scope,
        Value,
    }

    #[derive(DeriveIden)]
    enum NotificationOutbox {
        Table,
        Id,
        TargetRole,
        TargetUserId,
        NotificationType,
        Title,
        Message,
        Data,
        Priority,
        Link,
        Status,
        Attempts,
        AvailableAt,
        LastError,
        CreatedAt,
        ProcessedAt,
    }
}

// Database migration CLI runner
pub async fn run_migration(db_url: &str) -> Result<()> {
    info!("Setting up database connection for migrations");

    let mut opt = ConnectOptions::new(db_url);
    opt.max_connections(2)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .sqlx_logging(true);

    let db = Database::connect(opt).await?;

    info!("Running database migrations");

    match Migrator::up(&db, None).await {
        Ok(_) => {
            info!("Migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Migration failed: {}", e);
            Err(e.into())
        }
    }
}
