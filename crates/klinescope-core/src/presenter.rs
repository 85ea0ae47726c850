//! Status line, busy indicator and the single notification slot.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::timer::{TimerHandle, TimerQueue};

/// Notification style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Danger,
}

impl Severity {
    /// `info` and `success` dismiss themselves; `danger` stays until replaced.
    pub const fn auto_dismisses(self) -> bool {
        matches!(self, Self::Info | Self::Success)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Danger => "danger",
        }
    }
}

/// Identity of a posted notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub severity: Severity,
    pub auto_dismiss_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub busy: bool,
}

struct Live {
    id: NotificationId,
    notification: Notification,
    timer: Option<TimerHandle>,
}

/// Owns everything the user reads outside the chart itself.
///
/// Posting a notification replaces the current one. Auto-dismiss expiry is
/// delivered as an event built by `expired`; an expiry for a notification that
/// has since been replaced is ignored.
pub struct StatusAndAlertPresenter<E> {
    status: StatusLine,
    live: Option<Live>,
    chart_info: Option<String>,
    dismiss_after: Duration,
    timers: TimerQueue<E>,
    expired: fn(NotificationId) -> E,
    next_id: u64,
}

impl<E: Send + 'static> StatusAndAlertPresenter<E> {
    pub fn new(tx: UnboundedSender<E>, dismiss_after: Duration, expired: fn(NotificationId) -> E) -> Self {
        Self {
            status: StatusLine::default(),
            live: None,
            chart_info: None,
            dismiss_after,
            timers: TimerQueue::new(tx),
            expired,
            next_id: 0,
        }
    }

    pub fn set_status(&mut self, text: impl Into<String>, busy: bool) {
        self.status = StatusLine {
            text: text.into(),
            busy,
        };
        debug!(status = %self.status.text, busy, "status updated");
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn is_busy(&self) -> bool {
        self.status.busy
    }

    /// Show `text`, replacing any current notification.
    pub fn notify(&mut self, text: impl Into<String>, severity: Severity) -> NotificationId {
        self.clear_notification();

        self.next_id += 1;
        let id = NotificationId(self.next_id);
        let auto_dismiss = severity.auto_dismisses().then_some(self.dismiss_after);
        let expired = self.expired;
        let timer = auto_dismiss.map(|delay| self.timers.schedule(delay, move |_| expired(id)));
        let notification = Notification {
            text: text.into(),
            severity,
            auto_dismiss_ms: auto_dismiss.map(|delay| u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)),
        };

        info!(severity = severity.as_str(), text = %notification.text, "notification");
        self.live = Some(Live {
            id,
            notification,
            timer,
        });
        id
    }

    /// Manual dismissal. Returns `false` if `id` is no longer shown.
    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        match &self.live {
            Some(live) if live.id == id => {
                self.clear_notification();
                true
            }
            _ => false,
        }
    }

    /// Dismiss whatever is showing.
    pub fn dismiss_current(&mut self) -> bool {
        let shown = self.live.is_some();
        self.clear_notification();
        shown
    }

    /// Auto-dismiss timer fired.
    pub fn expire(&mut self, id: NotificationId) -> bool {
        // The timer has already fired, so dropping its handle is enough.
        if let Some(live) = &mut self.live {
            if live.id == id {
                live.timer = None;
            }
        }
        let dismissed = self.dismiss(id);
        if !dismissed {
            debug!(?id, "ignoring expiry of replaced notification");
        }
        dismissed
    }

    pub fn clear_notification(&mut self) {
        if let Some(live) = self.live.take() {
            if let Some(timer) = live.timer {
                self.timers.cancel(timer);
            }
        }
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.live.as_ref().map(|live| &live.notification)
    }

    pub fn notification_id(&self) -> Option<NotificationId> {
        self.live.as_ref().map(|live| live.id)
    }

    /// `"N只股票 + <index>"`; hidden when no stocks were charted.
    pub fn set_chart_info(&mut self, stock_count: usize, index_name: &str) {
        self.chart_info = (stock_count > 0).then(|| format!("{stock_count}只股票 + {index_name}"));
    }

    pub fn clear_chart_info(&mut self) {
        self.chart_info = None;
    }

    pub fn chart_info(&self) -> Option<&str> {
        self.chart_info.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn presenter() -> (
        StatusAndAlertPresenter<NotificationId>,
        mpsc::UnboundedReceiver<NotificationId>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (StatusAndAlertPresenter::new(tx, Duration::from_secs(3), |id| id), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn success_dismisses_itself_after_three_seconds() {
        let (mut presenter, mut rx) = presenter();
        let id = presenter.notify("图表生成成功！鼠标悬浮可查看详细数据", Severity::Success);
        assert_eq!(
            presenter.notification().and_then(|n| n.auto_dismiss_ms),
            Some(3_000)
        );

        let fired = rx.recv().await.expect("expiry");
        assert_eq!(fired, id);
        assert!(presenter.expire(fired));
        assert!(presenter.notification().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn danger_persists_and_replaces_pending_info() {
        let (mut presenter, mut rx) = presenter();
        presenter.notify("表单已重置", Severity::Info);
        tokio::time::sleep(Duration::from_secs(1)).await;
        presenter.notify("数据加载失败，请刷新页面重试", Severity::Danger);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err(), "replaced info timer was cancelled");
        let shown = presenter.notification().expect("danger stays");
        assert_eq!(shown.severity, Severity::Danger);
        assert_eq!(shown.auto_dismiss_ms, None);
    }

    #[tokio::test]
    async fn expiry_of_replaced_notification_is_ignored() {
        let (mut presenter, _rx) = presenter();
        let old = presenter.notify("first", Severity::Info);
        let new = presenter.notify("second", Severity::Info);

        assert!(!presenter.expire(old));
        assert_eq!(presenter.notification_id(), Some(new));
        assert!(presenter.dismiss(new));
        assert!(!presenter.dismiss(new));
    }

    #[tokio::test]
    async fn chart_info_hidden_for_zero_stocks() {
        let (mut presenter, _rx) = presenter();
        presenter.set_chart_info(2, "上证指数");
        assert_eq!(presenter.chart_info(), Some("2只股票 + 上证指数"));
        presenter.set_chart_info(0, "");
        assert_eq!(presenter.chart_info(), None);
    }
}
