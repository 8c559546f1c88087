use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Groups::Table)
          .if_not_exists()
          .col(ColumnDef::new(Groups::Name).string().not_null().primary_key())
          .col(ColumnDef::new(Groups::CreatedAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(GroupPermissions::Table)
          .if_not_exists()
          .col(ColumnDef::new(GroupPermissions::GroupName).string().not_null())
          .col(ColumnDef::new(GroupPermissions::Codename).string().not_null())
          .primary_key(
            Index::create()
              .col(GroupPermissions::GroupName)
              .col(GroupPermissions::Codename),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_group_permissions_group")
              .from(GroupPermissions::Table, GroupPermissions::GroupName)
              .to(Groups::Table, Groups::Name)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(GroupPermissions::Table).to_owned())
      .await?;
    manager.drop_table(Table::drop().table(Groups::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Groups {
  Table,
  Name,
  CreatedAt,
}

#[derive(DeriveIden)]
pub enum GroupPermissions {
  Table,
  GroupName,
  Codename,
}
