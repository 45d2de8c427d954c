use serde::{Deserialize, Serialize};

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 包含：
/// - server: 服务器地址、端口、CPU 数量
/// - database: 数据库连接配置
/// - logging: 日志配置
/// - api: 管理 API 与认证配置
/// - mail: SMTP 发信配置
/// - campaign: 活动策略（同意校验、数据保留、发信速率、追踪链接根地址）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub campaign: CampaignConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：PHISHSIM，分隔符：__
    /// 示例：PHISHSIM__CAMPAIGN__MAX_EMAILS_PER_HOUR=50
    pub fn load() -> Self {
        Self::load_from("config.toml")
    }

    pub fn load_from(path: &str) -> Self {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("PHISHSIM")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 管理 API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_admin_prefix")]
    pub admin_prefix: String,
    /// 为空时启动时随机生成（重启后已签发的 token 失效）
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: u64,
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

/// SMTP 配置
///
/// `server` 为空时使用仅记录日志的传输层，不真正发信。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub server: String,
    #[serde(default = "default_mail_port")]
    pub port: u16,
    #[serde(default = "default_mail_use_tls")]
    pub use_tls: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_mail_sender")]
    pub default_sender: String,
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
    #[serde(default = "default_company_name")]
    pub company_name: String,
}

/// 活动策略配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// 追踪链接根地址
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_consent_required")]
    pub consent_required: bool,
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    #[serde(default = "default_retention_interval_hours")]
    pub retention_interval_hours: u64,
    #[serde(default = "default_max_emails_per_hour")]
    pub max_emails_per_hour: u32,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_database_url() -> String {
    "sqlite://phishsim.db?mode=rwc".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_admin_prefix() -> String {
    "/admin".to_string()
}

fn default_access_token_minutes() -> u64 {
    60
}

fn default_mail_port() -> u16 {
    587
}

fn default_mail_use_tls() -> bool {
    true
}

fn default_mail_sender() -> String {
    "security-training@example.com".to_string()
}

fn default_sender_name() -> String {
    "IT Security".to_string()
}

fn default_company_name() -> String {
    "Your Company".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_consent_required() -> bool {
    true
}

fn default_retention_days() -> u64 {
    90
}

fn default_retention_interval_hours() -> u64 {
    24
}

fn default_max_emails_per_hour() -> u32 {
    100
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            admin_prefix: default_admin_prefix(),
            jwt_secret: String::new(),
            access_token_minutes: default_access_token_minutes(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: default_mail_port(),
            use_tls: default_mail_use_tls(),
            username: None,
            password: None,
            default_sender: default_mail_sender(),
            sender_name: default_sender_name(),
            company_name: default_company_name(),
        }
    }
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            consent_required: default_consent_required(),
            retention_days: default_retention_days(),
            retention_interval_hours: default_retention_interval_hours(),
            max_emails_per_hour: default_max_emails_per_hour(),
        }
    }
}
