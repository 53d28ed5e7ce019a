use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OptionRecord::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OptionRecord::Name)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OptionRecord::Value).text().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OptionRecord::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OptionRecord {
    #[sea_orm(iden = "options")]
    Table,
    Name,
    Value,
}
