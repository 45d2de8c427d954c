//! Email template service
//!
//! 模板增删改查、变量校验与渲染。模板只允许引用固定的一组变量，
//! 渲染结果总是带有模拟演练水印与 `X-Phishing-Simulation` 头。

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::config::StaticConfig;
use crate::errors::{PhishsimError, Result};
use crate::storage::{EmailTemplate, SeaOrmStorage, Target, TemplateDraft};

use super::audit_service::{Actor, AuditAction, AuditService};
use super::import_validation::{is_valid_email, normalize_email};
use super::indicators::{PhishingIndicator, template_indicators};
use super::mail::{MailTransport, OutgoingMail};
use super::token_issuer::generate_token;

pub const ALLOWED_VARIABLES: &[&str] = &[
    "first_name",
    "last_name",
    "email",
    "department",
    "company",
    "click_url",
    "tracking_pixel",
    "tracking_number",
    "campaign_name",
    "sender_name",
    "sender_email",
];

pub const SIMULATION_HEADER: &str = "X-Phishing-Simulation";

const WATERMARK: &str = concat!(
    "<!-- PHISHING SIMULATION: security awareness training exercise -->\n",
    "<div style=\"background-color:#fff3cd;border:1px solid #ffeaa7;padding:10px;",
    "margin-bottom:20px;font-family:Arial,sans-serif;font-size:12px;color:#856404;\">",
    "<strong>SECURITY TRAINING TEST</strong> - This is a simulated phishing email ",
    "for security awareness training.</div>\n",
);

const NAME_MIN_LEN: usize = 3;
const NAME_MAX_LEN: usize = 100;
const SUBJECT_MAX_LEN: usize = 200;

static VARIABLE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").ok());

/// 文本中引用的、不在允许列表里的变量（去重、排序）
pub fn unknown_variables(text: &str) -> Vec<String> {
    let Some(re) = VARIABLE_RE.as_ref() else {
        return Vec::new();
    };
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|name| !ALLOWED_VARIABLES.contains(name))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn validate_draft(draft: &TemplateDraft) -> Result<()> {
    let name_len = draft.name.trim().chars().count();
    if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&name_len) {
        return Err(PhishsimError::validation(format!(
            "Template name must be between {} and {} characters",
            NAME_MIN_LEN, NAME_MAX_LEN
        )));
    }
    if draft.subject.trim().is_empty() {
        return Err(PhishsimError::validation("Email subject is required"));
    }
    if draft.subject.chars().count() > SUBJECT_MAX_LEN {
        return Err(PhishsimError::validation(format!(
            "Email subject must be {} characters or less",
            SUBJECT_MAX_LEN
        )));
    }
    if draft.html_content.trim().is_empty() {
        return Err(PhishsimError::validation("HTML content is required"));
    }

    let mut unknown = unknown_variables(&draft.subject);
    unknown.extend(unknown_variables(&draft.html_content));
    unknown.sort();
    unknown.dedup();
    if !unknown.is_empty() {
        return Err(PhishsimError::validation(format!(
            "Unknown template variables: {}",
            unknown.join(", ")
        )));
    }
    Ok(())
}

/// 渲染所需的全局设置
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub base_url: String,
    pub company_name: String,
    pub sender_name: String,
    pub sender_email: String,
}

impl RenderSettings {
    pub fn from_config(config: &StaticConfig) -> Self {
        Self {
            base_url: config.campaign.base_url.trim_end_matches('/').to_string(),
            company_name: config.mail.company_name.clone(),
            sender_name: config.mail.sender_name.clone(),
            sender_email: config.mail.default_sender.clone(),
        }
    }
}

/// 单个收件人的变量表
#[derive(Debug, Clone, Default)]
pub struct TemplateVariables(HashMap<&'static str, String>);

impl TemplateVariables {
    pub fn for_recipient(
        settings: &RenderSettings,
        campaign_name: &str,
        target: &Target,
        token: &str,
    ) -> Self {
        let click_url = format!("{}/track/click/{}", settings.base_url, token);
        let pixel_url = format!("{}/track/open/{}", settings.base_url, token);
        let tracking_number: String = token.chars().take(8).collect::<String>().to_uppercase();

        let mut vars = HashMap::with_capacity(ALLOWED_VARIABLES.len());
        vars.insert(
            "first_name",
            target.first_name.clone().unwrap_or_else(|| "User".to_string()),
        );
        vars.insert("last_name", target.last_name.clone().unwrap_or_default());
        vars.insert("email", target.email.clone());
        vars.insert(
            "department",
            target
                .department
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
        );
        vars.insert("company", settings.company_name.clone());
        vars.insert("campaign_name", campaign_name.to_string());
        vars.insert("sender_name", settings.sender_name.clone());
        vars.insert("sender_email", settings.sender_email.clone());
        vars.insert("tracking_number", tracking_number);
        vars.insert("click_url", click_url);
        vars.insert(
            "tracking_pixel",
            format!(
                "<img src=\"{}\" width=\"1\" height=\"1\" style=\"display:none;\" alt=\"\">",
                pixel_url
            ),
        );
        Self(vars)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    fn substitute(&self, text: &str) -> String {
        match VARIABLE_RE.as_ref() {
            Some(re) => re
                .replace_all(text, |caps: &regex::Captures<'_>| {
                    let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                    match self.get(name) {
                        Some(value) => value.to_string(),
                        None => caps
                            .get(0)
                            .map(|m| m.as_str().to_string())
                            .unwrap_or_default(),
                    }
                })
                .into_owned(),
            None => text.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub headers: Vec<(String, String)>,
}

pub fn render(template: &EmailTemplate, vars: &TemplateVariables) -> RenderedEmail {
    let body = vars.substitute(&template.html_content);
    RenderedEmail {
        subject: vars.substitute(&template.subject),
        html: format!("{}{}", WATERMARK, body),
        headers: vec![(SIMULATION_HEADER.to_string(), "true".to_string())],
    }
}

/// 测试发送时的占位活动名
pub const TEST_CAMPAIGN_NAME: &str = "Template preview";

/// 测试发送的收件人
#[derive(Debug, Clone, Deserialize)]
pub struct TestRecipient {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestSendReport {
    pub template_id: i64,
    pub recipient: String,
    pub subject: String,
    pub transport: &'static str,
}

#[derive(Clone)]
struct TestMailer {
    transport: Arc<dyn MailTransport>,
    settings: RenderSettings,
}

#[derive(Clone)]
pub struct TemplateService {
    storage: Arc<SeaOrmStorage>,
    audit: AuditService,
    mailer: Option<TestMailer>,
}

impl TemplateService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self {
            audit: AuditService::new(storage.clone()),
            storage,
            mailer: None,
        }
    }

    /// 启用模板测试发送
    pub fn with_mailer(
        mut self,
        transport: Arc<dyn MailTransport>,
        settings: RenderSettings,
    ) -> Self {
        self.mailer = Some(TestMailer {
            transport,
            settings,
        });
        self
    }

    pub async fn list(&self) -> Result<Vec<EmailTemplate>> {
        self.storage.list_templates().await
    }

    pub async fn get(&self, id: i64) -> Result<EmailTemplate> {
        self.storage.require_template(id).await
    }

    pub async fn create(&self, draft: TemplateDraft, actor: &Actor) -> Result<EmailTemplate> {
        let draft = normalize(draft);
        validate_draft(&draft)?;

        let template = self.storage.create_template(&draft, actor.user_id).await?;
        self.audit
            .log(
                actor,
                AuditAction::TemplateCreated,
                Some(("template", template.id)),
                Some(json!({ "name": template.name })),
            )
            .await;
        Ok(template)
    }

    pub async fn update(
        &self,
        id: i64,
        draft: TemplateDraft,
        actor: &Actor,
    ) -> Result<EmailTemplate> {
        let draft = normalize(draft);
        validate_draft(&draft)?;

        let template = self.storage.update_template(id, &draft).await?;
        self.audit
            .log(
                actor,
                AuditAction::TemplateUpdated,
                Some(("template", id)),
                Some(json!({ "name": template.name })),
            )
            .await;
        Ok(template)
    }

    /// 被活动引用的模板不能删除
    pub async fn delete(&self, id: i64, actor: &Actor) -> Result<()> {
        let template = self.storage.require_template(id).await?;

        let in_use = self.storage.count_campaigns_using_template(id).await?;
        if in_use > 0 {
            return Err(PhishsimError::conflict(format!(
                "Template '{}' is used by {} campaign(s)",
                template.name, in_use
            )));
        }

        if !self.storage.delete_template(id).await? {
            return Err(PhishsimError::not_found(format!("Template {} not found", id)));
        }

        info!("Template deleted: {} ({})", id, template.name);
        self.audit
            .log(
                actor,
                AuditAction::TemplateDeleted,
                Some(("template", id)),
                Some(json!({ "name": template.name })),
            )
            .await;
        Ok(())
    }

    /// 向单个地址发送模板预览
    ///
    /// 使用一次性的未登记 token 渲染，追踪链接命中时不会产生事件；
    /// 不创建活动、收件人或目标记录。
    pub async fn send_test(
        &self,
        id: i64,
        recipient: TestRecipient,
        actor: &Actor,
    ) -> Result<TestSendReport> {
        let Some(mailer) = &self.mailer else {
            return Err(PhishsimError::mail_transport("Mail transport is not configured"));
        };

        let email = normalize_email(&recipient.email);
        if !is_valid_email(&email) {
            return Err(PhishsimError::validation(format!(
                "Invalid email format: {}",
                recipient.email
            )));
        }
        let template = self.storage.require_template(id).await?;

        let target = Target {
            id: 0,
            email: email.clone(),
            first_name: recipient.first_name.or_else(|| Some("Test".to_string())),
            last_name: recipient.last_name.or_else(|| Some("User".to_string())),
            department: recipient.department.or_else(|| Some("IT".to_string())),
            is_active: true,
            created_at: chrono::Utc::now(),
        };
        let vars = TemplateVariables::for_recipient(
            &mailer.settings,
            TEST_CAMPAIGN_NAME,
            &target,
            &generate_token(),
        );
        let rendered = render(&template, &vars);
        let mail = OutgoingMail {
            to: email.clone(),
            from_name: mailer.settings.sender_name.clone(),
            from_email: mailer.settings.sender_email.clone(),
            subject: rendered.subject,
            html: rendered.html,
            headers: rendered.headers,
        };

        mailer.transport.send(&mail).await?;
        info!("Template {} test email sent to {}", id, email);
        self.audit
            .log(
                actor,
                AuditAction::TemplateTestSent,
                Some(("template", id)),
                Some(json!({ "recipient": email })),
            )
            .await;

        Ok(TestSendReport {
            template_id: id,
            recipient: email,
            subject: mail.subject,
            transport: mailer.transport.name(),
        })
    }

    pub async fn indicators(&self, id: i64) -> Result<Vec<PhishingIndicator>> {
        let template = self.storage.require_template(id).await?;
        Ok(template_indicators(&template))
    }
}

fn normalize(mut draft: TemplateDraft) -> TemplateDraft {
    draft.name = draft.name.trim().to_string();
    draft.subject = draft.subject.trim().to_string();
    draft.description = draft
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    draft
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Campaign, CampaignStatus};
    use chrono::Utc;

    #[test]
    fn test_variable_pattern_compiles() {
        assert!(VARIABLE_RE.is_some());
        assert_eq!(unknown_variables("Hi {{ssn}}"), vec!["ssn".to_string()]);
    }

    fn draft(subject: &str, html: &str) -> TemplateDraft {
        TemplateDraft {
            name: "Password reset".to_string(),
            subject: subject.to_string(),
            html_content: html.to_string(),
            is_active: true,
            ..Default::default()
        }
    }

    fn settings() -> RenderSettings {
        RenderSettings {
            base_url: "https://training.example.com".to_string(),
            company_name: "Acme".to_string(),
            sender_name: "IT Desk".to_string(),
            sender_email: "it@acme.example".to_string(),
        }
    }

    fn campaign() -> Campaign {
        Campaign {
            id: 1,
            name: "Q1 drill".to_string(),
            description: None,
            template_id: 1,
            status: CampaignStatus::Active,
            consent_verified: true,
            created_by: None,
            created_at: Utc::now(),
            scheduled_at: None,
            started_at: None,
            completed_at: None,
        }
    }

    fn target(first_name: Option<&str>) -> Target {
        Target {
            id: 7,
            email: "bob@acme.example".to_string(),
            first_name: first_name.map(str::to_string),
            last_name: None,
            department: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn template(subject: &str, html: &str) -> EmailTemplate {
        EmailTemplate {
            id: 1,
            name: "Password reset".to_string(),
            description: None,
            subject: subject.to_string(),
            html_content: html.to_string(),
            is_active: true,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_known_variables_accepted() {
        let d = draft(
            "Hi {{first_name}}",
            "<a href=\"{{click_url}}\">{{company}}</a>{{tracking_pixel}}",
        );
        assert!(validate_draft(&d).is_ok());
    }

    #[test]
    fn test_unknown_variable_rejected() {
        let d = draft("Hello", "<p>{{password}} and {{first_name}}</p>");
        let err = validate_draft(&d).unwrap_err();
        assert!(matches!(err, PhishsimError::Validation(_)));
        assert!(err.message().contains("password"));
    }

    #[test]
    fn test_length_rules() {
        let mut d = draft("Subject", "<p>x</p>");
        d.name = "ab".to_string();
        assert!(validate_draft(&d).is_err());

        let d = draft(&"s".repeat(201), "<p>x</p>");
        assert!(validate_draft(&d).is_err());

        let d = draft("Subject", "   ");
        assert!(validate_draft(&d).is_err());
    }

    #[test]
    fn test_render_substitutes_and_watermarks() {
        let token = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQ";
        let vars = TemplateVariables::for_recipient(&settings(), &campaign().name, &target(None), token);
        let rendered = render(
            &template(
                "{{company}} notice for {{first_name}}",
                "<p>Dear {{first_name}} ({{department}})</p><a href=\"{{click_url}}\">{{tracking_number}}</a>",
            ),
            &vars,
        );

        assert_eq!(rendered.subject, "Acme notice for User");
        assert!(rendered.html.starts_with("<!-- PHISHING SIMULATION"));
        assert!(rendered.html.contains("Dear User (Unknown)"));
        assert!(rendered.html.contains(&format!(
            "https://training.example.com/track/click/{}",
            token
        )));
        assert!(rendered.html.contains("ABCDEFGH"));
        assert_eq!(
            rendered.headers,
            vec![(SIMULATION_HEADER.to_string(), "true".to_string())]
        );
    }

    #[test]
    fn test_tracking_pixel_points_to_open_endpoint() {
        let vars = TemplateVariables::for_recipient(&settings(), &campaign().name, &target(Some("Bob")), "tok");
        let pixel = vars.get("tracking_pixel").unwrap();
        assert!(pixel.contains("https://training.example.com/track/open/tok"));
        assert_eq!(vars.get("first_name"), Some("Bob"));
    }
}
