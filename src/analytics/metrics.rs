//! 活动指标计算
//!
//! 只有每个收件人某类型的第一条事件计入去重指标；重复事件只影响时间线。
//! 所有比率为百分比，保留两位小数，分母为 0 时为 0。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::storage::UNASSIGNED_DEPARTMENT;
use crate::storage::models::{EmailEvent, EventType, RecipientActivity};

/// 每类事件的最早时间
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FirstEvents {
    pub sent: Option<DateTime<Utc>>,
    pub opened: Option<DateTime<Utc>>,
    pub clicked: Option<DateTime<Utc>>,
    pub submitted: Option<DateTime<Utc>>,
    pub bounced: Option<DateTime<Utc>>,
}

impl FirstEvents {
    /// 事件可以是任意顺序；同一时间戳按 id 取先写入的
    pub fn from_events(events: &[EmailEvent]) -> Self {
        let mut first: BTreeMap<EventType, (DateTime<Utc>, i64)> = BTreeMap::new();
        for event in events {
            let key = (event.timestamp, event.id);
            first
                .entry(event.event_type)
                .and_modify(|current| {
                    if key < *current {
                        *current = key;
                    }
                })
                .or_insert(key);
        }

        let at = |t: EventType| first.get(&t).map(|(ts, _)| *ts);
        FirstEvents {
            sent: at(EventType::Sent),
            opened: at(EventType::Opened),
            clicked: at(EventType::Clicked),
            submitted: at(EventType::Submitted),
            bounced: at(EventType::Bounced),
        }
    }

    pub fn stage(&self) -> RecipientStage {
        if self.submitted.is_some() {
            RecipientStage::Submitted
        } else if self.clicked.is_some() {
            RecipientStage::Clicked
        } else if self.opened.is_some() {
            RecipientStage::Opened
        } else if self.sent.is_some() {
            RecipientStage::Sent
        } else if self.bounced.is_some() {
            RecipientStage::Bounced
        } else {
            RecipientStage::Pending
        }
    }
}

/// 收件人到达的最远阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecipientStage {
    Pending,
    Bounced,
    Sent,
    Opened,
    Clicked,
    Submitted,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CampaignMetrics {
    pub total_targets: u64,
    pub delivered: u64,
    pub unique_opens: u64,
    pub unique_clicks: u64,
    pub unique_submissions: u64,
    pub bounced: u64,
    pub delivery_rate: f64,
    pub open_rate: f64,
    /// 点击人数 / 送达人数
    pub click_rate: f64,
    pub submission_rate: f64,
}

/// 百分比，两位小数
pub fn percentage(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    let raw = numerator as f64 * 100.0 / denominator as f64;
    (raw * 100.0).round() / 100.0
}

pub fn compute_metrics(recipients: &[RecipientActivity]) -> CampaignMetrics {
    let mut metrics = CampaignMetrics {
        total_targets: recipients.len() as u64,
        ..Default::default()
    };

    for recipient in recipients {
        let first = FirstEvents::from_events(&recipient.events);
        if first.sent.is_some() {
            metrics.delivered += 1;
        } else if first.bounced.is_some() {
            metrics.bounced += 1;
        }
        if first.opened.is_some() {
            metrics.unique_opens += 1;
        }
        if first.clicked.is_some() {
            metrics.unique_clicks += 1;
        }
        if first.submitted.is_some() {
            metrics.unique_submissions += 1;
        }
    }

    metrics.delivery_rate = percentage(metrics.delivered, metrics.total_targets);
    metrics.open_rate = percentage(metrics.unique_opens, metrics.delivered);
    metrics.click_rate = percentage(metrics.unique_clicks, metrics.delivered);
    metrics.submission_rate = percentage(metrics.unique_submissions, metrics.delivered);
    metrics
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentMetrics {
    pub department: String,
    #[serde(flatten)]
    pub metrics: CampaignMetrics,
}

/// 按部门分组计算，部门名排序
pub fn metrics_by_department(recipients: &[RecipientActivity]) -> Vec<DepartmentMetrics> {
    let mut groups: BTreeMap<String, Vec<RecipientActivity>> = BTreeMap::new();
    for recipient in recipients {
        let department = recipient
            .target
            .department
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| UNASSIGNED_DEPARTMENT.to_string());
        groups.entry(department).or_default().push(recipient.clone());
    }

    groups
        .into_iter()
        .map(|(department, members)| DepartmentMetrics {
            department,
            metrics: compute_metrics(&members),
        })
        .collect()
}

/// 从发送到首次打开/点击的耗时（秒）
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeToEngagement {
    /// 同时有 sent 和 opened 的收件人数
    pub open_samples: u64,
    pub mean_seconds_to_open: Option<f64>,
    pub median_seconds_to_open: Option<f64>,
    pub click_samples: u64,
    pub mean_seconds_to_click: Option<f64>,
}

pub fn time_to_engagement(recipients: &[RecipientActivity]) -> TimeToEngagement {
    let mut to_open = Vec::new();
    let mut to_click = Vec::new();

    for recipient in recipients {
        let first = FirstEvents::from_events(&recipient.events);
        let Some(sent) = first.sent else {
            continue;
        };
        if let Some(opened) = first.opened {
            let secs = (opened - sent).num_milliseconds() as f64 / 1000.0;
            // 打开早于发送记录（时钟偏差）的样本不计
            if secs >= 0.0 {
                to_open.push(secs);
            }
        }
        if let Some(clicked) = first.clicked {
            let secs = (clicked - sent).num_milliseconds() as f64 / 1000.0;
            if secs >= 0.0 {
                to_click.push(secs);
            }
        }
    }

    TimeToEngagement {
        open_samples: to_open.len() as u64,
        mean_seconds_to_open: mean(&to_open),
        median_seconds_to_open: median(&mut to_open),
        click_samples: to_click.len() as u64,
        mean_seconds_to_click: mean(&to_click),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(round2(values.iter().sum::<f64>() / values.len() as f64))
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    let value = if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    };
    Some(round2(value))
}


#[cfg(test)]
mod tests {
    use super::fixtures::recipient;
    use super::*;
    use EventType::*;

    #[test]
    fn test_percentage_rounding_and_zero_denominator() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(5, 0), 0.0);
    }

    #[test]
    fn test_two_recipients_one_engaged() {
        let recipients = vec![
            recipient(1, None, &[(Sent, 0), (Opened, 60), (Clicked, 120)]),
            recipient(2, None, &[(Sent, 0)]),
        ];
        let m = compute_metrics(&recipients);

        assert_eq!(m.delivered, 2);
        assert_eq!(m.delivery_rate, 100.0);
        assert_eq!(m.open_rate, 50.0);
        assert_eq!(m.click_rate, 50.0);
        assert_eq!(m.submission_rate, 0.0);
    }

    #[test]
    fn test_duplicate_opens_counted_once() {
        let recipients = vec![recipient(1, None, &[(Sent, 0), (Opened, 10), (Opened, 20)])];
        let m = compute_metrics(&recipients);
        assert_eq!(m.unique_opens, 1);
        assert_eq!(m.open_rate, 100.0);
    }

    #[test]
    fn test_empty_campaign_all_zero() {
        let m = compute_metrics(&[]);
        assert_eq!(m, CampaignMetrics::default());
    }

    #[test]
    fn test_bounced_not_delivered() {
        let recipients = vec![
            recipient(1, None, &[(Bounced, 0)]),
            recipient(2, None, &[(Sent, 0)]),
        ];
        let m = compute_metrics(&recipients);
        assert_eq!(m.delivered, 1);
        assert_eq!(m.bounced, 1);
        assert_eq!(m.delivery_rate, 50.0);
    }

    #[test]
    fn test_first_event_found_in_unsorted_input() {
        let r = recipient(1, None, &[(Opened, 90), (Sent, 0), (Opened, 30)]);
        let first = FirstEvents::from_events(&r.events);
        assert_eq!(first.opened, Some(r.events[2].timestamp));
        assert_eq!(first.sent, Some(r.events[1].timestamp));
    }

    #[test]
    fn test_stage_is_furthest_reached() {
        let r = recipient(1, None, &[(Sent, 0), (Clicked, 5)]);
        assert_eq!(
            FirstEvents::from_events(&r.events).stage(),
            RecipientStage::Clicked
        );
        let r = recipient(2, None, &[]);
        assert_eq!(
            FirstEvents::from_events(&r.events).stage(),
            RecipientStage::Pending
        );
        assert_eq!(RecipientStage::Bounced.to_string(), "bounced");
    }

    #[test]
    fn test_department_grouping_with_unassigned() {
        let recipients = vec![
            recipient(1, Some("Finance"), &[(Sent, 0), (Opened, 5)]),
            recipient(2, Some("Finance"), &[(Sent, 0)]),
            recipient(3, None, &[(Sent, 0), (Clicked, 9)]),
        ];
        let groups = metrics_by_department(&recipients);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].department, "Finance");
        assert_eq!(groups[0].metrics.open_rate, 50.0);
        assert_eq!(groups[1].department, "Unassigned");
        assert_eq!(groups[1].metrics.click_rate, 100.0);
    }

    #[test]
    fn test_time_to_engagement_mean_and_median() {
        let recipients = vec![
            recipient(1, None, &[(Sent, 0), (Opened, 60)]),
            recipient(2, None, &[(Sent, 0), (Opened, 120), (Clicked, 300)]),
            recipient(3, None, &[(Sent, 0), (Opened, 600)]),
        ];
        let tte = time_to_engagement(&recipients);

        assert_eq!(tte.open_samples, 3);
        assert_eq!(tte.mean_seconds_to_open, Some(260.0));
        assert_eq!(tte.median_seconds_to_open, Some(120.0));
        assert_eq!(tte.click_samples, 1);
        assert_eq!(tte.mean_seconds_to_click, Some(300.0));
    }

    #[test]
    fn test_click_without_open_excluded_from_time_to_open() {
        let recipients = vec![recipient(1, None, &[(Sent, 0), (Clicked, 45)])];
        let tte = time_to_engagement(&recipients);

        assert_eq!(tte.open_samples, 0);
        assert_eq!(tte.mean_seconds_to_open, None);
        assert_eq!(tte.median_seconds_to_open, None);
        assert_eq!(tte.mean_seconds_to_click, Some(45.0));
    }
}
