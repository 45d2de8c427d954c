//! 模板钓鱼特征分析（用于培训讲解）

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::storage::EmailTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhishingIndicator {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub description: String,
    pub severity: Severity,
}

const URGENCY_WORDS: &[&str] = &[
    "urgent",
    "immediate",
    "action required",
    "immediately",
    "hurry",
    "limited time",
];

const THREAT_WORDS: &[&str] = &[
    "suspend",
    "terminate",
    "delete",
    "close account",
    "security alert",
    "unusual activity",
];

const GENERIC_GREETINGS: &[&str] = &["dear user", "dear customer", "hello user", "valued customer"];

const URL_SHORTENERS: &[&str] = &["bit.ly", "tinyurl", "short.link"];

const SECURITY_THEMED_URL_PARTS: &[&str] = &["secure-", "verify-", "account-", "login-"];

static URL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"{}|\\^`\[\]]+"#).ok());

/// 分析主题与正文，未发现任何特征时返回通用提示
pub fn extract_indicators(subject: &str, html_content: &str) -> Vec<PhishingIndicator> {
    let content = html_content.to_lowercase();
    let subject = subject.to_lowercase();
    let mut indicators = Vec::new();

    for word in URGENCY_WORDS {
        if content.contains(word) || subject.contains(word) {
            indicators.push(PhishingIndicator {
                kind: "Urgency",
                description: format!("Creates false urgency: \"{}\"", word),
                severity: Severity::High,
            });
        }
    }

    for word in THREAT_WORDS {
        if content.contains(word) || subject.contains(word) {
            indicators.push(PhishingIndicator {
                kind: "Threat",
                description: format!("Contains threat language: \"{}\"", word),
                severity: Severity::High,
            });
        }
    }

    for greeting in GENERIC_GREETINGS {
        if content.contains(greeting) {
            indicators.push(PhishingIndicator {
                kind: "Generic Greeting",
                description: format!("Uses generic greeting: \"{}\"", greeting),
                severity: Severity::Medium,
            });
        }
    }

    if let Some(url_re) = URL_RE.as_ref() {
        for url in url_re.find_iter(&content).map(|m| m.as_str()) {
            if URL_SHORTENERS.iter().any(|s| url.contains(s)) {
                indicators.push(PhishingIndicator {
                    kind: "Suspicious Link",
                    description: format!("Contains URL shortener: {}", url),
                    severity: Severity::High,
                });
            } else if SECURITY_THEMED_URL_PARTS.iter().any(|s| url.contains(s)) {
                indicators.push(PhishingIndicator {
                    kind: "Suspicious Link",
                    description: format!("Contains security-themed URL: {}", url),
                    severity: Severity::Medium,
                });
            }
        }
    }

    if subject.contains("security") && content.contains("verification") {
        indicators.push(PhishingIndicator {
            kind: "Sender Mismatch",
            description: "Claims to be from security team but requires verification via link"
                .to_string(),
            severity: Severity::High,
        });
    }

    if indicators.is_empty() {
        indicators.push(PhishingIndicator {
            kind: "Suspicious Email",
            description: "This email contains elements commonly found in phishing attempts"
                .to_string(),
            severity: Severity::Medium,
        });
    }

    indicators
}

pub fn template_indicators(template: &EmailTemplate) -> Vec<PhishingIndicator> {
    extract_indicators(&template.subject, &template.html_content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_pattern_compiles() {
        assert!(URL_RE.is_some());
    }

    fn kinds(indicators: &[PhishingIndicator]) -> Vec<&'static str> {
        indicators.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_urgency_and_threat_detected() {
        let found = extract_indicators(
            "URGENT: Action Required",
            "<p>Your account will be suspended.</p>",
        );
        let kinds = kinds(&found);
        assert!(kinds.contains(&"Urgency"));
        assert!(kinds.contains(&"Threat"));
        assert!(found.iter().all(|i| i.severity == Severity::High));
    }

    #[test]
    fn test_links_classified() {
        let found = extract_indicators(
            "Hello",
            r#"<a href="https://bit.ly/abc">x</a> <a href="https://secure-login.example.com/x">y</a>"#,
        );
        let links: Vec<_> = found.iter().filter(|i| i.kind == "Suspicious Link").collect();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].severity, Severity::High);
        assert_eq!(links[1].severity, Severity::Medium);
    }

    #[test]
    fn test_sender_mismatch() {
        let found = extract_indicators("Security notice", "Complete the verification below");
        assert!(kinds(&found).contains(&"Sender Mismatch"));
    }

    #[test]
    fn test_fallback_when_nothing_found() {
        let found = extract_indicators("Lunch menu", "<p>Tacos on Friday</p>");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, "Suspicious Email");
        assert_eq!(found[0].severity, Severity::Medium);
    }
}
