//! 参与度统计
//!
//! `metrics` 与 `timeline` 是对已加载事件的纯计算，不访问数据库；
//! `retention` 负责过期数据清理。

pub mod metrics;
pub mod retention;
pub mod timeline;

pub use metrics::{
    CampaignMetrics, DepartmentMetrics, FirstEvents, RecipientStage, TimeToEngagement,
    compute_metrics, metrics_by_department, percentage, time_to_engagement,
};
pub use retention::{RetentionReport, RetentionTask};
pub use timeline::{Granularity, TimelinePoint, build_timeline};
