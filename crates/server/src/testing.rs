//! Test doubles for the external collaborators, plus seeding helpers.

use async_trait::async_trait;
use shared::{Volunteer, DEFAULT_LANGUAGE};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU32, Ordering},
        Mutex,
    },
};

use crate::{
    db::Database,
    delivery::{DeliveryError, SmsCarrier},
    translate::{TranslationEngine, TranslationError},
};

/// Scriptable translation engine.
///
/// Detection answers with the configured raw string (English by default).
/// Translation uses the configured table and otherwise tags the text with the
/// target language.
#[derive(Default)]
pub struct FakeEngine {
    detect: Option<String>,
    translations: HashMap<String, String>,
    fail_detection: bool,
    fail_translation: bool,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a network error.
    pub fn failing() -> Self {
        Self {
            fail_detection: true,
            fail_translation: true,
            ..Self::default()
        }
    }

    pub fn detect_with(mut self, raw: &str) -> Self {
        self.detect = Some(raw.to_string());
        self
    }

    pub fn translate_with(mut self, input: &str, output: &str) -> Self {
        self.translations.insert(input.to_string(), output.to_string());
        self
    }

    pub fn fail_translation(mut self) -> Self {
        self.fail_translation = true;
        self
    }
}

#[async_trait]
impl TranslationEngine for FakeEngine {
    async fn detect_language(&self, _text: &str) -> Result<String, TranslationError> {
        if self.fail_detection {
            return Err(TranslationError::Network("simulated outage".to_string()));
        }
        Ok(self.detect.clone().unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()))
    }

    async fn translate(
        &self,
        text: &str,
        _source: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        if self.fail_translation {
            return Err(TranslationError::Network("simulated outage".to_string()));
        }
        Ok(self
            .translations
            .get(text)
            .cloned()
            .unwrap_or_else(|| format!("[{}] {}", target, text)))
    }
}

/// Carrier that fails its first `fail_first` sends, then succeeds.
pub struct FakeCarrier {
    fail_first: u32,
    attempts: AtomicU32,
    sent: Mutex<Vec<(String, String)>>,
}

impl FakeCarrier {
    pub fn reliable() -> Self {
        Self::failing_times(0)
    }

    pub fn failing_times(fail_first: u32) -> Self {
        Self {
            fail_first,
            attempts: AtomicU32::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Total `send` calls, successful or not.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Successfully sent (to, body) pairs.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmsCarrier for FakeCarrier {
    async fn send(&self, to: &str, body: &str) -> Result<String, DeliveryError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.fail_first {
            return Err(DeliveryError::Network(format!(
                "simulated outage (attempt {})",
                attempt
            )));
        }
        self.sent.lock().unwrap().push((to.to_string(), body.to_string()));
        Ok(format!("SM-fake-{}", attempt))
    }
}

/// Register and approve a volunteer.
pub async fn approved_volunteer(db: &Database, email: &str) -> Volunteer {
    let volunteer = db.create_volunteer(email, "Test Volunteer", "hash").await.unwrap();
    db.approve_volunteer(&volunteer.id).await.unwrap();
    db.get_volunteer(&volunteer.id).await.unwrap().unwrap()
}

/// Register, approve and promote a volunteer to admin.
pub async fn admin_volunteer(db: &Database, email: &str) -> Volunteer {
    approved_volunteer(db, email).await;
    db.promote_admin(email).await.unwrap()
}
