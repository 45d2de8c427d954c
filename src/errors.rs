use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone)]
pub enum PhishsimError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Validation(String),
    NotFound(String),
    Conflict(String),
    ConsentRequired(String),
    InvalidState(String),
    Unauthorized(String),
    Serialization(String),
    DateParse(String),
    MailTransport(String),
    CsvParse(String),
    CsvFileMissing(String),
    InvalidMultipartData(String),
    FileTooLarge(String),
}

impl PhishsimError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            PhishsimError::DatabaseConfig(_) => "E001",
            PhishsimError::DatabaseConnection(_) => "E002",
            PhishsimError::DatabaseOperation(_) => "E003",
            PhishsimError::FileOperation(_) => "E004",
            PhishsimError::Validation(_) => "E005",
            PhishsimError::NotFound(_) => "E006",
            PhishsimError::Conflict(_) => "E007",
            PhishsimError::ConsentRequired(_) => "E008",
            PhishsimError::InvalidState(_) => "E009",
            PhishsimError::Unauthorized(_) => "E010",
            PhishsimError::Serialization(_) => "E011",
            PhishsimError::DateParse(_) => "E012",
            PhishsimError::MailTransport(_) => "E013",
            PhishsimError::CsvParse(_) => "E014",
            PhishsimError::CsvFileMissing(_) => "E015",
            PhishsimError::InvalidMultipartData(_) => "E016",
            PhishsimError::FileTooLarge(_) => "E017",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            PhishsimError::DatabaseConfig(_) => "Database Configuration Error",
            PhishsimError::DatabaseConnection(_) => "Database Connection Error",
            PhishsimError::DatabaseOperation(_) => "Database Operation Error",
            PhishsimError::FileOperation(_) => "File Operation Error",
            PhishsimError::Validation(_) => "Validation Error",
            PhishsimError::NotFound(_) => "Resource Not Found",
            PhishsimError::Conflict(_) => "Conflict",
            PhishsimError::ConsentRequired(_) => "Consent Required",
            PhishsimError::InvalidState(_) => "Invalid State",
            PhishsimError::Unauthorized(_) => "Unauthorized",
            PhishsimError::Serialization(_) => "Serialization Error",
            PhishsimError::DateParse(_) => "Date Parse Error",
            PhishsimError::MailTransport(_) => "Mail Transport Error",
            PhishsimError::CsvParse(_) => "CSV Parse Error",
            PhishsimError::CsvFileMissing(_) => "CSV File Missing",
            PhishsimError::InvalidMultipartData(_) => "Invalid Multipart Data",
            PhishsimError::FileTooLarge(_) => "File Too Large",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            PhishsimError::DatabaseConfig(msg)
            | PhishsimError::DatabaseConnection(msg)
            | PhishsimError::DatabaseOperation(msg)
            | PhishsimError::FileOperation(msg)
            | PhishsimError::Validation(msg)
            | PhishsimError::NotFound(msg)
            | PhishsimError::Conflict(msg)
            | PhishsimError::ConsentRequired(msg)
            | PhishsimError::InvalidState(msg)
            | PhishsimError::Unauthorized(msg)
            | PhishsimError::Serialization(msg)
            | PhishsimError::DateParse(msg)
            | PhishsimError::MailTransport(msg)
            | PhishsimError::CsvParse(msg)
            | PhishsimError::CsvFileMissing(msg)
            | PhishsimError::InvalidMultipartData(msg)
            | PhishsimError::FileTooLarge(msg) => msg,
        }
    }

    /// 映射到 HTTP 状态码
    pub fn http_status(&self) -> StatusCode {
        match self {
            PhishsimError::Validation(_)
            | PhishsimError::ConsentRequired(_)
            | PhishsimError::DateParse(_)
            | PhishsimError::CsvParse(_)
            | PhishsimError::CsvFileMissing(_)
            | PhishsimError::InvalidMultipartData(_) => StatusCode::BAD_REQUEST,
            PhishsimError::FileTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            PhishsimError::NotFound(_) => StatusCode::NOT_FOUND,
            PhishsimError::Conflict(_) | PhishsimError::InvalidState(_) => StatusCode::CONFLICT,
            PhishsimError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            PhishsimError::MailTransport(_) => StatusCode::BAD_GATEWAY,
            PhishsimError::DatabaseConfig(_)
            | PhishsimError::DatabaseConnection(_)
            | PhishsimError::DatabaseOperation(_)
            | PhishsimError::FileOperation(_)
            | PhishsimError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为彩色输出（用于 CLI 模式）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for PhishsimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for PhishsimError {}

// 便捷的构造函数
impl PhishsimError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        PhishsimError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        PhishsimError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        PhishsimError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        PhishsimError::FileOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        PhishsimError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        PhishsimError::NotFound(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        PhishsimError::Conflict(msg.into())
    }

    pub fn consent_required<T: Into<String>>(msg: T) -> Self {
        PhishsimError::ConsentRequired(msg.into())
    }

    pub fn invalid_state<T: Into<String>>(msg: T) -> Self {
        PhishsimError::InvalidState(msg.into())
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        PhishsimError::Unauthorized(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        PhishsimError::Serialization(msg.into())
    }

    pub fn date_parse<T: Into<String>>(msg: T) -> Self {
        PhishsimError::DateParse(msg.into())
    }

    pub fn mail_transport<T: Into<String>>(msg: T) -> Self {
        PhishsimError::MailTransport(msg.into())
    }

    pub fn csv_parse<T: Into<String>>(msg: T) -> Self {
        PhishsimError::CsvParse(msg.into())
    }

    pub fn csv_file_missing<T: Into<String>>(msg: T) -> Self {
        PhishsimError::CsvFileMissing(msg.into())
    }

    pub fn invalid_multipart_data<T: Into<String>>(msg: T) -> Self {
        PhishsimError::InvalidMultipartData(msg.into())
    }

    pub fn file_too_large<T: Into<String>>(msg: T) -> Self {
        PhishsimError::FileTooLarge(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for PhishsimError {
    fn from(err: sea_orm::DbErr) -> Self {
        PhishsimError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for PhishsimError {
    fn from(err: std::io::Error) -> Self {
        PhishsimError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for PhishsimError {
    fn from(err: serde_json::Error) -> Self {
        PhishsimError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for PhishsimError {
    fn from(err: csv::Error) -> Self {
        PhishsimError::CsvParse(err.to_string())
    }
}

impl From<chrono::ParseError> for PhishsimError {
    fn from(err: chrono::ParseError) -> Self {
        PhishsimError::DateParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PhishsimError>;
