use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240401_000001_create_batches_table::Migration),
            Box::new(m20240401_000002_create_stock_entries_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240401_000001_create_batches_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240401_000001_create_batches_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Batches::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Batches::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Batches::BatchCode)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Batches::BatchNo).integer().not_null())
                        .col(ColumnDef::new(Batches::ProductionDate).date().not_null())
                        .col(
                            ColumnDef::new(Batches::ProductTypeName)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Batches::BrandName).string().not_null())
                        .col(ColumnDef::new(Batches::Parameters).json().not_null())
                        .col(ColumnDef::new(Batches::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Batches::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_batches_product_type_name")
                        .table(Batches::Table)
                        .col(Batches::ProductTypeName)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_batches_production_date")
                        .table(Batches::Table)
                        .col(Batches::ProductionDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Batches::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Batches {
        Table,
        Id,
        BatchCode,
        BatchNo,
        ProductionDate,
        ProductTypeName,
        BrandName,
        Parameters,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240401_000002_create_stock_entries_table {

    use sea_orm_migration::prelude::*;

    use super::m20240401_000001_create_batches_table::Batches;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240401_000002_create_stock_entries_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockEntries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockEntries::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockEntries::BatchId).uuid().not_null())
                        .col(ColumnDef::new(StockEntries::StockType).string().not_null())
                        .col(ColumnDef::new(StockEntries::Status).string().not_null())
                        .col(ColumnDef::new(StockEntries::Quantity).integer().null())
                        .col(
                            ColumnDef::new(StockEntries::LengthPerUnit)
                                .decimal()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockEntries::PiecesPerBundle)
                                .integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockEntries::PieceLengthMeters)
                                .decimal()
                                .null(),
                        )
                        .col(ColumnDef::new(StockEntries::PieceCount).integer().null())
                        .col(
                            ColumnDef::new(StockEntries::TotalAvailable)
                                .decimal()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockEntries::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockEntries::UpdatedAt).timestamp().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_entries_batch_id")
                                .from(StockEntries::Table, StockEntries::BatchId)
                                .to(Batches::Table, Batches::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_entries_batch_id")
                        .table(StockEntries::Table)
                        .col(StockEntries::BatchId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_entries_status")
                        .table(StockEntries::Table)
                        .col(StockEntries::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_entries_stock_type")
                        .table(StockEntries::Table)
                        .col(StockEntries::StockType)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockEntries::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockEntries {
        Table,
        Id,
        BatchId,
        StockType,
        Status,
        Quantity,
        LengthPerUnit,
        PiecesPerBundle,
        PieceLengthMeters,
        PieceCount,
        TotalAvailable,
        CreatedAt,
        UpdatedAt,
    }
}
