use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{DeliveryError, SmsCarrier};
use crate::config::TwilioConfig;

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    message: String,
}

/// Sends SMS through Twilio's Messages REST resource.
pub struct TwilioCarrier {
    http: Client,
    config: TwilioConfig,
}

impl TwilioCarrier {
    pub fn new(config: TwilioConfig) -> Result<Self, DeliveryError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DeliveryError::Network(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl SmsCarrier for TwilioCarrier {
    async fn send(&self, to: &str, body: &str) -> Result<String, DeliveryError> {
        let params = [("To", to), ("From", self.config.from_number.as_str()), ("Body", body)];

        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<TwilioErrorBody>(&text)
                .map(|b| b.message)
                .unwrap_or(text);
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let created: CreatedMessage =
            serde_json::from_str(&text).map_err(|e| DeliveryError::Malformed(e.to_string()))?;
        Ok(created.sid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_url() {
        let carrier = TwilioCarrier::new(TwilioConfig {
            account_sid: "AC123".to_string(),
            api_base: "https://api.twilio.com/".to_string(),
            ..TwilioConfig::default()
        })
        .unwrap();
        assert_eq!(
            carrier.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }
}
