//! 管理员账号与登录校验

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::errors::{PhishsimError, Result};
use crate::storage::{SeaOrmStorage, User};
use crate::utils::password::{hash_password, verify_password};

use super::audit_service::{Actor, AuditAction, AuditService};
use super::import_validation::{is_valid_email, normalize_email};

const MIN_PASSWORD_LEN: usize = 8;
const USERNAME_MIN_LEN: usize = 3;
const USERNAME_MAX_LEN: usize = 64;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

#[derive(Clone)]
pub struct UserService {
    storage: Arc<SeaOrmStorage>,
    audit: AuditService,
}

impl UserService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self {
            audit: AuditService::new(storage.clone()),
            storage,
        }
    }

    /// 校验用户名密码；失败统一返回 Unauthorized，不区分用户是否存在
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        ip_address: Option<String>,
    ) -> Result<User> {
        let username = username.trim();
        let user = self
            .storage
            .find_user_by_username(username)
            .await?
            .filter(|u| u.is_active && u.is_admin);

        let verified = match &user {
            Some(u) => match verify_password(password, &u.password_hash) {
                Ok(ok) => ok,
                Err(e) => {
                    warn!("Stored password hash for '{}' is unreadable: {}", username, e);
                    false
                }
            },
            None => false,
        };

        let actor = Actor {
            user_id: user.as_ref().map(|u| u.id),
            ip_address,
        };

        match user {
            Some(user) if verified => {
                self.storage.touch_last_login(user.id).await?;
                self.audit
                    .log(&actor, AuditAction::UserLogin, Some(("user", user.id)), None)
                    .await;
                info!("Admin '{}' logged in", user.username);
                Ok(user)
            }
            _ => {
                self.audit
                    .log(
                        &actor,
                        AuditAction::LoginFailed,
                        None,
                        Some(json!({ "username": username })),
                    )
                    .await;
                Err(PhishsimError::unauthorized(INVALID_CREDENTIALS))
            }
        }
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        self.storage
            .get_user(id)
            .await?
            .ok_or_else(|| PhishsimError::not_found(format!("User {} not found", id)))
    }

    /// 修改自己的密码：需要当前密码，成功后记录审计
    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
        actor: &Actor,
    ) -> Result<()> {
        let user = self.get(user_id).await?;

        let current_ok = match verify_password(current_password, &user.password_hash) {
            Ok(ok) => ok,
            Err(e) => {
                warn!("Stored password hash for '{}' is unreadable: {}", user.username, e);
                false
            }
        };
        if !current_ok {
            return Err(PhishsimError::validation("Current password is incorrect"));
        }
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PhishsimError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let hash = hash_password(new_password)
            .map_err(|e| PhishsimError::validation(e.to_string()))?;
        if !self.storage.update_password_hash(user.id, &hash).await? {
            return Err(PhishsimError::not_found(format!("User {} not found", user_id)));
        }

        self.audit
            .log(actor, AuditAction::PasswordChanged, Some(("user", user.id)), None)
            .await;
        info!("Admin '{}' changed their password", user.username);
        Ok(())
    }

    pub async fn create_admin(&self, username: &str, email: &str, password: &str) -> Result<User> {
        let username = username.trim();
        let email = normalize_email(email);

        let len = username.chars().count();
        if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
            return Err(PhishsimError::validation(format!(
                "Username must be between {} and {} characters",
                USERNAME_MIN_LEN, USERNAME_MAX_LEN
            )));
        }
        if !is_valid_email(&email) {
            return Err(PhishsimError::validation(format!(
                "Invalid email format: {}",
                email
            )));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PhishsimError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let hash = hash_password(password)
            .map_err(|e| PhishsimError::validation(e.to_string()))?;
        let user = self.storage.create_user(username, &email, &hash, true).await?;
        info!("Admin user created: {} ({})", user.username, user.id);
        Ok(user)
    }
}
