use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "group_permissions")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub group_name: String,
  #[sea_orm(primary_key, auto_increment = false)]
  pub codename: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::group::Entity",
    from = "Column::GroupName",
    to = "super::group::Column::Name",
    on_delete = "Cascade"
  )]
  Group,
}

impl Related<super::group::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Group.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
