use crate::domain::ports::{Channel, Notification, Notifier};
use tracing::{info, warn};

/// Delivers notifications as structured log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, channel: Channel, notification: &Notification) {
        match notification {
            Notification::PayoutsProcessed {
                processed,
                total_amount,
            } => {
                info!(%channel, processed, %total_amount, "payouts processed");
            }
            Notification::AwaitingConfirmation { flights } => {
                info!(%channel, ?flights, "payouts awaiting confirmation");
            }
            Notification::CycleFailed { attempts, error } => {
                warn!(%channel, attempts, %error, "auto-pay cycle failed");
            }
        }
    }
}
