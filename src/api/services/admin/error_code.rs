//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::PhishsimError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字。按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 认证错误
/// - 3000-3099: 活动/模板错误
/// - 4000-4099: 导入导出错误
/// - 5000-5099: 基础设施错误
/// - 6000-6099: 统计错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    Unauthorized = 1001,
    NotFound = 1004,
    InternalServerError = 1005,
    ServiceUnavailable = 1006,
    FileTooLarge = 1011,
    InvalidDateFormat = 1012,

    // 认证错误 2000-2099
    AuthFailed = 2000,
    TokenInvalid = 2002,
    RateLimitExceeded = 2004,

    // 活动/模板错误 3000-3099
    ValidationFailed = 3000,
    Conflict = 3001,
    ConsentRequired = 3002,
    InvalidState = 3003,

    // 导入导出错误 4000-4099
    ImportFailed = 4000,
    ExportFailed = 4001,
    InvalidMultipartData = 4002,
    CsvFileMissing = 4004,
    CsvParseError = 4005,

    // 基础设施错误 5000-5099
    DatabaseError = 5000,
    MailTransportError = 5001,

    // 统计错误 6000-6099
    AnalyticsQueryFailed = 6000,
    AnalyticsInvalidParameter = 6002,
}

impl From<&PhishsimError> for ErrorCode {
    fn from(err: &PhishsimError) -> Self {
        match err {
            PhishsimError::Validation(_) => ErrorCode::ValidationFailed,
            PhishsimError::NotFound(_) => ErrorCode::NotFound,
            PhishsimError::Conflict(_) => ErrorCode::Conflict,
            PhishsimError::ConsentRequired(_) => ErrorCode::ConsentRequired,
            PhishsimError::InvalidState(_) => ErrorCode::InvalidState,
            PhishsimError::Unauthorized(_) => ErrorCode::AuthFailed,
            PhishsimError::DateParse(_) => ErrorCode::InvalidDateFormat,
            PhishsimError::MailTransport(_) => ErrorCode::MailTransportError,
            PhishsimError::CsvParse(_) => ErrorCode::CsvParseError,
            PhishsimError::CsvFileMissing(_) => ErrorCode::CsvFileMissing,
            PhishsimError::InvalidMultipartData(_) => ErrorCode::InvalidMultipartData,
            PhishsimError::FileTooLarge(_) => ErrorCode::FileTooLarge,
            PhishsimError::DatabaseConfig(_)
            | PhishsimError::DatabaseConnection(_)
            | PhishsimError::DatabaseOperation(_) => ErrorCode::DatabaseError,
            PhishsimError::FileOperation(_) | PhishsimError::Serialization(_) => {
                ErrorCode::InternalServerError
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_as_number() {
        assert_eq!(serde_json::to_string(&ErrorCode::Success).unwrap(), "0");
        assert_eq!(
            serde_json::to_string(&ErrorCode::ConsentRequired).unwrap(),
            "3002"
        );
    }

    #[test]
    fn test_error_mapping() {
        let err = PhishsimError::invalid_state("campaign is active");
        assert_eq!(ErrorCode::from(&err), ErrorCode::InvalidState);
        let err = PhishsimError::database_operation("locked");
        assert_eq!(ErrorCode::from(&err), ErrorCode::DatabaseError);
    }
}
