//! 发信队列
//!
//! 活动启动/恢复时把待发送的收件人放入无界队列，由单个 worker
//! 按限速依次渲染、发送并记录 sent/bounced 事件。

mod transport;
mod worker;

use tokio::sync::mpsc;

use crate::errors::{PhishsimError, Result};

pub use transport::{LogOnlyTransport, MailTransport, OutgoingMail, SmtpMailTransport, build_transport};
pub use worker::{DeliveryOutcome, MailWorker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailJob {
    pub campaign_target_id: i64,
}

/// 队列的发送端，可随服务一起克隆
#[derive(Clone)]
pub struct MailQueue {
    sender: mpsc::UnboundedSender<MailJob>,
}

impl MailQueue {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<MailJob>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn enqueue(&self, campaign_target_id: i64) -> Result<()> {
        self.sender
            .send(MailJob { campaign_target_id })
            .map_err(|_| PhishsimError::mail_transport("Mail queue is closed"))
    }

    /// 返回成功入队的数量
    pub fn enqueue_all(&self, ids: &[i64]) -> Result<usize> {
        for id in ids {
            self.enqueue(*id)?;
        }
        Ok(ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_jobs_arrive_in_order() {
        let (queue, mut rx) = MailQueue::channel();
        assert_eq!(queue.enqueue_all(&[3, 1, 2]).unwrap(), 3);

        let received: Vec<i64> = [rx.recv().await, rx.recv().await, rx.recv().await]
            .into_iter()
            .flatten()
            .map(|job| job.campaign_target_id)
            .collect();
        assert_eq!(received, vec![3, 1, 2]);
    }

    #[test]
    fn test_closed_queue_reports_error() {
        let (queue, rx) = MailQueue::channel();
        drop(rx);
        assert!(matches!(
            queue.enqueue(1),
            Err(PhishsimError::MailTransport(_))
        ));
    }
}
