// =============================================================================
// WhatsApp channel — CallMeBot click-to-send API
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::Notifier;

/// Request timeout for delivery attempts.
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Sends alerts to a WhatsApp number via the CallMeBot gateway.
pub struct CallMeBotNotifier {
    phone: String,
    apikey: String,
    client: reqwest::Client,
}

impl CallMeBotNotifier {
    pub fn new(phone: String, apikey: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("failed to build reqwest client");

        Self {
            phone,
            apikey,
            client,
        }
    }
}

#[async_trait]
impl Notifier for CallMeBotNotifier {
    fn name(&self) -> &'static str {
        "whatsapp"
    }

    async fn send(&self, message: &str) -> Result<()> {
        let resp = self
            .client
            .get("https://api.callmebot.com/whatsapp.php")
            .query(&[
                ("phone", self.phone.as_str()),
                ("text", message),
                ("apikey", self.apikey.as_str()),
                ("source", "rsi-sentinel"),
            ])
            .send()
            .await
            .context("callmebot request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("callmebot returned {}: {}", status, body);
        }

        debug!(phone = %self.phone, "whatsapp message delivered");
        Ok(())
    }
}

impl std::fmt::Debug for CallMeBotNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallMeBotNotifier")
            .field("phone", &self.phone)
            .field("apikey", &"<redacted>")
            .finish()
    }
}
