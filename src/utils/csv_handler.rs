//! 目标列表 CSV 解析与活动结果 CSV 导出
//!
//! 导入表头大小写不敏感，并接受导出文件的表头（`Target Email` 等），
//! 因此导出文件可以直接重新导入。

use std::collections::HashMap;
use std::io::Cursor;

use csv::{ReaderBuilder, WriterBuilder};
use serde::Serialize;

use crate::analytics::FirstEvents;
use crate::errors::{PhishsimError, Result};
use crate::storage::models::{NewTarget, RecipientActivity};

/// 导出文件表头（固定顺序）
pub const EXPORT_HEADERS: [&str; 13] = [
    "Target Email",
    "First Name",
    "Last Name",
    "Department",
    "Status",
    "Email Sent",
    "Email Opened",
    "Link Clicked",
    "Form Submitted",
    "Sent Time",
    "First Open Time",
    "First Click Time",
    "Submission Time",
];

/// 导出行，字段顺序与 `EXPORT_HEADERS` 一致
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub target_email: String,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub status: String,
    pub email_sent: &'static str,
    pub email_opened: &'static str,
    pub link_clicked: &'static str,
    pub form_submitted: &'static str,
    pub sent_time: String,
    pub first_open_time: String,
    pub first_click_time: String,
    pub submission_time: String,
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

impl From<&RecipientActivity> for ExportRow {
    fn from(recipient: &RecipientActivity) -> Self {
        let first = FirstEvents::from_events(&recipient.events);
        let time = |ts: Option<chrono::DateTime<chrono::Utc>>| {
            ts.map(|t| t.to_rfc3339()).unwrap_or_default()
        };

        Self {
            target_email: recipient.target.email.clone(),
            first_name: recipient.target.first_name.clone().unwrap_or_default(),
            last_name: recipient.target.last_name.clone().unwrap_or_default(),
            department: recipient.target.department.clone().unwrap_or_default(),
            status: first.stage().to_string(),
            email_sent: yes_no(first.sent.is_some()),
            email_opened: yes_no(first.opened.is_some()),
            link_clicked: yes_no(first.clicked.is_some()),
            form_submitted: yes_no(first.submitted.is_some()),
            sent_time: time(first.sent),
            first_open_time: time(first.opened),
            first_click_time: time(first.clicked),
            submission_time: time(first.submitted),
        }
    }
}

/// 序列化一批导出行；`include_header` 为 true 时先写表头
pub fn write_export_rows(rows: &[ExportRow], include_header: bool) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(vec![]);

    if include_header {
        writer.write_record(EXPORT_HEADERS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }

    writer
        .into_inner()
        .map_err(|e| PhishsimError::serialization(format!("Failed to finalize CSV: {}", e.error())))
}

/// 一行解析结果（行号从 1 开始，表头为第 1 行）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTargetRow {
    pub row: usize,
    pub result: std::result::Result<NewTarget, String>,
}

fn normalize_header(header: &str) -> String {
    header
        .trim()
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .replace([' ', '-'], "_")
}

fn column_for(header: &str) -> Option<&'static str> {
    match normalize_header(header).as_str() {
        "email" | "target_email" | "email_address" => Some("email"),
        "first_name" | "firstname" => Some("first_name"),
        "last_name" | "lastname" => Some("last_name"),
        "department" | "dept" => Some("department"),
        _ => None,
    }
}

/// 解析目标列表 CSV
///
/// 缺少 email 列时整个文件无效；单行格式错误只影响该行。
/// 此处不校验邮箱格式，交给导入校验。
pub fn parse_target_csv(data: &[u8]) -> Result<Vec<ParsedTargetRow>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(Cursor::new(data));

    let headers = reader
        .headers()
        .map_err(|e| PhishsimError::csv_parse(format!("Failed to read CSV header: {}", e)))?
        .clone();

    let mut columns: HashMap<&'static str, usize> = HashMap::new();
    for (idx, header) in headers.iter().enumerate() {
        if let Some(name) = column_for(header) {
            columns.entry(name).or_insert(idx);
        }
    }

    let Some(&email_idx) = columns.get("email") else {
        return Err(PhishsimError::validation(
            "CSV must contain an 'email' column",
        ));
    };

    let optional = |record: &csv::StringRecord, name: &str| -> Option<String> {
        columns
            .get(name)
            .and_then(|&idx| record.get(idx))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let mut rows = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let row = row_idx + 2;
        let result = match record {
            Ok(record) => Ok(NewTarget {
                email: record.get(email_idx).unwrap_or("").to_string(),
                first_name: optional(&record, "first_name"),
                last_name: optional(&record, "last_name"),
                department: optional(&record, "department"),
            }),
            Err(e) => Err(format!("CSV parse error: {}", e)),
        };
        rows.push(ParsedTargetRow { row, result });
    }

    Ok(rows)
}
