use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

use super::SeaOrmStorage;
use super::converters::model_to_target;
use crate::errors::Result;
use crate::storage::models::{NewTarget, Target};

use migration::entities::target;

/// 按 email 复用已有目标，否则新建。返回 (目标, 是否新建)。
///
/// 已有目标原样复用：其他活动的事件可能已引用它，姓名/部门不再改写。
pub async fn find_or_create_target<C: ConnectionTrait>(
    conn: &C,
    new: &NewTarget,
) -> Result<(Target, bool)> {
    if let Some(existing) = target::Entity::find()
        .filter(target::Column::Email.eq(new.email.as_str()))
        .one(conn)
        .await?
    {
        return Ok((model_to_target(existing), false));
    }

    let model = target::ActiveModel {
        email: Set(new.email.clone()),
        first_name: Set(new.first_name.clone()),
        last_name: Set(new.last_name.clone()),
        department: Set(new.department.clone()),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let inserted = model.insert(conn).await?;
    Ok((model_to_target(inserted), true))
}

impl SeaOrmStorage {
    pub async fn get_target(&self, id: i64) -> Result<Option<Target>> {
        Ok(target::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(model_to_target))
    }

    /// 目标目录：按 email 排序，`search` 对 email/姓名/部门做子串匹配
    pub async fn search_targets(
        &self,
        search: Option<&str>,
        active_only: bool,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Target>> {
        let mut query = target::Entity::find();

        if let Some(term) = search {
            query = query.filter(
                Condition::any()
                    .add(target::Column::Email.contains(term))
                    .add(target::Column::FirstName.contains(term))
                    .add(target::Column::LastName.contains(term))
                    .add(target::Column::Department.contains(term)),
            );
        }
        if active_only {
            query = query.filter(target::Column::IsActive.eq(true));
        }

        Ok(query
            .order_by_asc(target::Column::Email)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await?
            .into_iter()
            .map(model_to_target)
            .collect())
    }
}
