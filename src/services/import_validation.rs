//! 目标导入校验
//!
//! CSV 导入与手工添加共用：邮箱规范化（trim + 小写）、格式校验、文件内去重。
//! "已经是本活动目标" 的检查需要查库，由 CampaignService 在事务内完成。

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::errors::{PhishsimError, Result};
use crate::storage::NewTarget;
use crate::utils::csv_handler::ParsedTargetRow;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

static EMAIL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(EMAIL_PATTERN).ok());

const MAX_NAME_LEN: usize = 100;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.as_ref().is_some_and(|re| re.is_match(email))
}

/// 被拒绝的行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    /// 行号，表头为第 1 行；手工添加时为 0
    pub row: usize,
    pub email: String,
    pub reason: String,
}

/// 通过校验、等待写入的行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedRow {
    pub row: usize,
    pub target: NewTarget,
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(|v| v.chars().take(MAX_NAME_LEN).collect())
}

/// 校验单个目标，返回规范化后的结果
pub fn validate_target(target: NewTarget) -> Result<NewTarget> {
    let email = normalize_email(&target.email);
    if email.is_empty() {
        return Err(PhishsimError::validation("Email is required"));
    }
    if !is_valid_email(&email) {
        return Err(PhishsimError::validation(format!(
            "Invalid email format: {}",
            email
        )));
    }

    Ok(NewTarget {
        email,
        first_name: clean_optional(target.first_name),
        last_name: clean_optional(target.last_name),
        department: clean_optional(target.department),
    })
}

/// 批量校验解析后的行；文件内重复的邮箱只保留第一次出现
pub fn validate_target_rows(rows: Vec<ParsedTargetRow>) -> (Vec<AcceptedRow>, Vec<RejectedRow>) {
    let mut accepted = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for parsed in rows {
        let row = parsed.row;
        let raw = match parsed.result {
            Ok(raw) => raw,
            Err(reason) => {
                rejected.push(RejectedRow {
                    row,
                    email: String::new(),
                    reason,
                });
                continue;
            }
        };

        let raw_email = raw.email.clone();
        let target = match validate_target(raw) {
            Ok(t) => t,
            Err(e) => {
                rejected.push(RejectedRow {
                    row,
                    email: raw_email.trim().to_string(),
                    reason: e.message().to_string(),
                });
                continue;
            }
        };

        if let Some(first_row) = seen.get(&target.email) {
            rejected.push(RejectedRow {
                row,
                email: target.email,
                reason: format!("Duplicate email in file (first seen on row {})", first_row),
            });
            continue;
        }

        seen.insert(target.email.clone(), row);
        accepted.push(AcceptedRow { row, target });
    }

    (accepted, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_pattern_compiles() {
        assert!(EMAIL_RE.is_some());
        assert!(is_valid_email("alice@corp.com"));
    }

    fn parsed(row: usize, email: &str) -> ParsedTargetRow {
        ParsedTargetRow {
            row,
            result: Ok(NewTarget {
                email: email.to_string(),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("first.last+tag@sub.example.co"));
        assert!(!is_valid_email("no-at-sign.example.com"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("user@example.c"));
        assert!(!is_valid_email("user name@example.com"));
    }

    #[test]
    fn test_email_normalized() {
        let target = validate_target(NewTarget {
            email: "  Alice@Example.COM ".to_string(),
            department: Some("  ".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(target.email, "alice@example.com");
        assert_eq!(target.department, None);
    }

    #[test]
    fn test_duplicate_in_file_rejected_with_row_number() {
        let (accepted, rejected) =
            validate_target_rows(vec![parsed(2, "a@x.com"), parsed(3, "a@x.com")]);

        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].row, 2);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].row, 3);
        assert!(rejected[0].reason.contains("Duplicate"));
    }

    #[test]
    fn test_duplicates_compare_after_normalization() {
        let (accepted, rejected) =
            validate_target_rows(vec![parsed(2, "A@X.com"), parsed(3, " a@x.com")]);
        assert_eq!(accepted.len(), 1);
        assert_eq!(rejected.len(), 1);
    }

    #[test]
    fn test_malformed_and_parse_errors_rejected() {
        let rows = vec![
            parsed(2, "good@corp.com"),
            parsed(3, "not-an-email"),
            ParsedTargetRow {
                row: 4,
                result: Err("CSV parse error: bad quoting".to_string()),
            },
        ];
        let (accepted, rejected) = validate_target_rows(rows);

        assert_eq!(accepted.len(), 1);
        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[0].row, 3);
        assert!(rejected[0].reason.starts_with("Invalid email format"));
        assert_eq!(rejected[1].row, 4);
    }
}
