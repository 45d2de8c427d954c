use actix_web::http::StatusCode;
use phishsim::api::services::admin::ErrorCode;
use phishsim::errors::{PhishsimError, Result};
use std::collections::HashSet;
use std::error::Error;

fn all_variants() -> Vec<PhishsimError> {
    vec![
        PhishsimError::database_config("x"),
        PhishsimError::database_connection("x"),
        PhishsimError::database_operation("x"),
        PhishsimError::file_operation("x"),
        PhishsimError::validation("x"),
        PhishsimError::not_found("x"),
        PhishsimError::conflict("x"),
        PhishsimError::consent_required("x"),
        PhishsimError::invalid_state("x"),
        PhishsimError::unauthorized("x"),
        PhishsimError::serialization("x"),
        PhishsimError::date_parse("x"),
        PhishsimError::mail_transport("x"),
        PhishsimError::csv_parse("x"),
        PhishsimError::csv_file_missing("x"),
        PhishsimError::invalid_multipart_data("x"),
        PhishsimError::file_too_large("x"),
    ]
}

#[cfg(test)]
mod error_creation_tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let codes: HashSet<&str> = all_variants().iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), all_variants().len());
    }

    #[test]
    fn test_display_uses_type_and_message() {
        let error = PhishsimError::invalid_state("Campaign 3 is already completed");
        assert_eq!(
            error.to_string(),
            "Invalid State: Campaign 3 is already completed"
        );
        assert!(error.source().is_none());
    }

    #[test]
    fn test_colored_output_contains_code() {
        let error = PhishsimError::csv_parse("row 4: unterminated quote");
        let colored = error.format_colored();
        assert!(colored.contains("E014"));
        assert!(colored.contains("row 4: unterminated quote"));
    }
}

#[cfg(test)]
mod status_mapping_tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert_eq!(
            PhishsimError::validation("bad").http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PhishsimError::conflict("taken").http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            PhishsimError::invalid_state("paused").http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            PhishsimError::unauthorized("nope").http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            PhishsimError::file_too_large("11 MB").http_status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_server_errors_do_not_leak_as_client_errors() {
        for error in all_variants() {
            let status = error.http_status();
            let is_internal = matches!(
                error,
                PhishsimError::DatabaseConfig(_)
                    | PhishsimError::DatabaseConnection(_)
                    | PhishsimError::DatabaseOperation(_)
                    | PhishsimError::FileOperation(_)
                    | PhishsimError::Serialization(_)
                    | PhishsimError::MailTransport(_)
            );
            assert_eq!(status.is_server_error(), is_internal, "{}", error.code());
        }
    }

    #[test]
    fn test_api_error_codes() {
        assert_eq!(
            ErrorCode::from(&PhishsimError::not_found("x")) as i32,
            ErrorCode::NotFound as i32
        );
        assert_eq!(
            ErrorCode::from(&PhishsimError::validation("x")) as i32,
            ErrorCode::ValidationFailed as i32
        );
    }
}

#[cfg(test)]
mod conversion_tests {
    use super::*;

    fn parse_number(s: &str) -> Result<i64> {
        let value: serde_json::Value = serde_json::from_str(s)?;
        value
            .as_i64()
            .ok_or_else(|| PhishsimError::validation("not a number"))
    }

    #[test]
    fn test_question_mark_converts_serde_errors() {
        assert_eq!(parse_number("42").unwrap(), 42);
        assert!(matches!(
            parse_number("{"),
            Err(PhishsimError::Serialization(_))
        ));
        assert!(matches!(
            parse_number("\"x\""),
            Err(PhishsimError::Validation(_))
        ));
    }

    #[test]
    fn test_io_error_converts_to_file_operation() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "phishsim.toml");
        let error: PhishsimError = io.into();
        assert!(matches!(error, PhishsimError::FileOperation(_)));
        assert!(error.message().contains("phishsim.toml"));
    }

    #[test]
    fn test_chrono_error_converts_to_date_parse() {
        let err = chrono::DateTime::parse_from_rfc3339("yesterday").unwrap_err();
        let error: PhishsimError = err.into();
        assert!(matches!(error, PhishsimError::DateParse(_)));
    }
}
