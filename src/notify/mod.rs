// =============================================================================
// Notification Dispatcher — fan-out with per-channel failure isolation
// =============================================================================
//
// Every channel implements the same one-method capability. Channels are
// constructed at startup from whatever credentials are present; a channel
// with missing credentials simply does not exist. Delivery failures are
// logged and never propagate past the failing channel, so one broken
// provider cannot silence the others or abort a poll cycle.
// =============================================================================

pub mod callmebot;
pub mod telegram;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::config::Config;
use callmebot::CallMeBotNotifier;
use telegram::TelegramNotifier;

/// A single delivery channel for plain-text alert messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name for log lines.
    fn name(&self) -> &'static str;

    /// Attempt delivery of `message`. A non-success provider response is an
    /// error; the caller decides what failure means.
    async fn send(&self, message: &str) -> anyhow::Result<()>;
}

/// Build the list of enabled channels from the configuration.
///
/// Each channel requires its full credential pair; anything less disables
/// that channel only.
pub fn build_notifiers(config: &Config) -> Vec<Box<dyn Notifier>> {
    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();

    match (&config.telegram_bot_token, &config.telegram_chat_id) {
        (Some(token), Some(chat_id)) => {
            notifiers.push(Box::new(TelegramNotifier::new(token.clone(), chat_id.clone())));
        }
        _ => debug!("telegram credentials not set, channel disabled"),
    }

    match (&config.callmebot_phone, &config.callmebot_apikey) {
        (Some(phone), Some(apikey)) => {
            notifiers.push(Box::new(CallMeBotNotifier::new(phone.clone(), apikey.clone())));
        }
        _ => debug!("callmebot credentials not set, channel disabled"),
    }

    info!(count = notifiers.len(), "notification channels enabled");
    notifiers
}

/// Deliver `message` through every channel, tolerating individual failures.
pub async fn dispatch(notifiers: &[Box<dyn Notifier>], message: &str) {
    for notifier in notifiers {
        if let Err(e) = notifier.send(message).await {
            error!(channel = notifier.name(), error = %e, "notification delivery failed");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn base_config() -> Config {
        Config::from_lookup(|_| None).unwrap()
    }

    #[test]
    fn no_credentials_means_no_channels() {
        assert!(build_notifiers(&base_config()).is_empty());
    }

    #[test]
    fn partial_credentials_disable_the_channel() {
        let mut config = base_config();
        config.telegram_bot_token = Some("token".into());
        // chat id missing: telegram stays disabled.
        assert!(build_notifiers(&config).is_empty());
    }

    #[test]
    fn full_pairs_enable_their_channels_independently() {
        let mut config = base_config();
        config.telegram_bot_token = Some("token".into());
        config.telegram_chat_id = Some("42".into());
        let notifiers = build_notifiers(&config);
        assert_eq!(notifiers.len(), 1);
        assert_eq!(notifiers[0].name(), "telegram");

        config.callmebot_phone = Some("+1555".into());
        config.callmebot_apikey = Some("key".into());
        let notifiers = build_notifiers(&config);
        assert_eq!(notifiers.len(), 2);
        assert_eq!(notifiers[1].name(), "whatsapp");
    }

    /// Appends its id to a shared log on every send; optionally fails.
    struct Probe {
        id: &'static str,
        fail: bool,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Notifier for Probe {
        fn name(&self) -> &'static str {
            self.id
        }

        async fn send(&self, _message: &str) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(self.id);
            if self.fail {
                anyhow::bail!("simulated provider outage");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatch_continues_past_a_failing_channel() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let notifiers: Vec<Box<dyn Notifier>> = vec![
            Box::new(Probe {
                id: "first",
                fail: true,
                log: log.clone(),
            }),
            Box::new(Probe {
                id: "second",
                fail: false,
                log: log.clone(),
            }),
        ];

        dispatch(&notifiers, "hello").await;

        // Both channels were attempted despite the first one failing.
        assert_eq!(log.lock().unwrap().as_slice(), ["first", "second"]);
    }
}
