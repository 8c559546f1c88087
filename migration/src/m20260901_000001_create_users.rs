use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Users::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Users::Id)
              .big_integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Users::Username).string().not_null().unique_key())
          .col(ColumnDef::new(Users::Email).string().not_null())
          .col(ColumnDef::new(Users::PasswordHash).string().not_null())
          .col(
            ColumnDef::new(Users::Role).string().not_null().default("student"),
          )
          .col(ColumnDef::new(Users::CreatedAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(Tokens::Table)
          .if_not_exists()
          .col(ColumnDef::new(Tokens::Key).string().not_null().primary_key())
          .col(ColumnDef::new(Tokens::UserId).big_integer().not_null())
          .col(ColumnDef::new(Tokens::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_tokens_user")
              .from(Tokens::Table, Tokens::UserId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Tokens::Table).to_owned()).await?;
    manager.drop_table(Table::drop().table(Users::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Users {
  Table,
  Id,
  Username,
  Email,
  PasswordHash,
  Role,
  CreatedAt,
}

#[derive(DeriveIden)]
pub enum Tokens {
  Table,
  Key,
  UserId,
  CreatedAt,
}
