//! 事件时间线：按小时或天分桶，包含重复事件，空桶补零

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::models::{EmailEvent, EventType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Hour,
    Day,
}

impl Granularity {
    fn step_secs(self) -> i64 {
        match self {
            Granularity::Hour => 3600,
            Granularity::Day => 86_400,
        }
    }

    /// 截断到桶起点（UTC）
    pub fn bucket_start(self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let step = self.step_secs();
        let secs = ts.timestamp();
        let start = secs - secs.rem_euclid(step);
        DateTime::from_timestamp(start, 0).unwrap_or(ts)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimelinePoint {
    pub bucket_start: DateTime<Utc>,
    pub sent: u64,
    pub opened: u64,
    pub clicked: u64,
    pub submitted: u64,
    pub bounced: u64,
}

impl TimelinePoint {
    fn empty(bucket_start: DateTime<Utc>) -> Self {
        Self {
            bucket_start,
            ..Default::default()
        }
    }

    fn add(&mut self, event_type: EventType) {
        match event_type {
            EventType::Sent => self.sent += 1,
            EventType::Opened => self.opened += 1,
            EventType::Clicked => self.clicked += 1,
            EventType::Submitted => self.submitted += 1,
            EventType::Bounced => self.bounced += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.sent + self.opened + self.clicked + self.submitted + self.bounced
    }
}

pub fn build_timeline<'a, I>(events: I, granularity: Granularity) -> Vec<TimelinePoint>
where
    I: IntoIterator<Item = &'a EmailEvent>,
{
    let mut buckets: BTreeMap<DateTime<Utc>, TimelinePoint> = BTreeMap::new();
    for event in events {
        let start = granularity.bucket_start(event.timestamp);
        buckets
            .entry(start)
            .or_insert_with(|| TimelinePoint::empty(start))
            .add(event.event_type);
    }

    let (Some(first), Some(last)) = (
        buckets.keys().next().copied(),
        buckets.keys().next_back().copied(),
    ) else {
        return Vec::new();
    };

    let step = Duration::seconds(granularity.step_secs());
    let mut points = Vec::new();
    let mut cursor = first;
    while cursor <= last {
        points.push(
            buckets
                .remove(&cursor)
                .unwrap_or_else(|| TimelinePoint::empty(cursor)),
        );
        cursor += step;
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::metrics::fixtures::recipient;
    use EventType::*;

    #[test]
    fn test_duplicate_opens_both_counted() {
        let r = recipient(1, None, &[(Sent, 0), (Opened, 60), (Opened, 120)]);
        let points = build_timeline(&r.events, Granularity::Hour);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].opened, 2);
        assert_eq!(points[0].sent, 1);
        assert_eq!(points[0].total(), 3);
    }

    #[test]
    fn test_gaps_are_zero_filled() {
        let r = recipient(1, None, &[(Sent, 0), (Clicked, 3 * 3600 + 5)]);
        let points = build_timeline(&r.events, Granularity::Hour);

        assert_eq!(points.len(), 4);
        assert_eq!(points[1].total(), 0);
        assert_eq!(points[2].total(), 0);
        assert_eq!(points[3].clicked, 1);
        assert!(points.windows(2).all(|w| w[0].bucket_start < w[1].bucket_start));
    }

    #[test]
    fn test_day_granularity() {
        let r = recipient(
            1,
            None,
            &[(Sent, 0), (Opened, 3600), (Submitted, 2 * 86_400)],
        );
        let points = build_timeline(&r.events, Granularity::Day);

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].opened, 1);
        assert_eq!(points[2].submitted, 1);
        assert_eq!(points[0].bucket_start.timestamp() % 86_400, 0);
    }

    #[test]
    fn test_no_events_no_points() {
        assert!(build_timeline(&Vec::<EmailEvent>::new(), Granularity::Hour).is_empty());
    }
}
