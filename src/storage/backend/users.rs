use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    sea_query::Expr,
};

use super::SeaOrmStorage;
use super::converters::model_to_user;
use crate::errors::{PhishsimError, Result};
use crate::storage::models::User;

use migration::entities::user;

impl SeaOrmStorage {
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<User> {
        let exists = user::Entity::find()
            .filter(
                Condition::any()
                    .add(user::Column::Username.eq(username))
                    .add(user::Column::Email.eq(email)),
            )
            .count(&self.db)
            .await?;
        if exists > 0 {
            return Err(PhishsimError::conflict(format!(
                "User '{}' or email '{}' already exists",
                username, email
            )));
        }

        let model = user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash.to_string()),
            is_admin: Set(is_admin),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            last_login: Set(None),
            ..Default::default()
        };
        let inserted = model.insert(&self.db).await?;
        Ok(model_to_user(inserted))
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?
            .map(model_to_user))
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>> {
        Ok(user::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(model_to_user))
    }

    pub async fn touch_last_login(&self, id: i64) -> Result<()> {
        user::Entity::update_many()
            .col_expr(user::Column::LastLogin, Expr::value(Utc::now()))
            .filter(user::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// 返回是否有行被更新
    pub async fn update_password_hash(&self, id: i64, password_hash: &str) -> Result<bool> {
        let result = user::Entity::update_many()
            .col_expr(user::Column::PasswordHash, Expr::value(password_hash))
            .filter(user::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
