use std::sync::Arc;

use crate::{
    approval::ApprovalWorkflow,
    config::Config,
    db::Database,
    delivery::{DeliveryError, RetryPolicy, SmsCarrier, TwilioCarrier},
    gate::Gate,
    pipeline::{InboundPipeline, OutboundPipeline},
    signature::SignatureVerifier,
    translate::{AnthropicEngine, DisabledEngine, TranslationEngine, TranslationError, Translator},
};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub gate: Gate,
    pub inbound: InboundPipeline,
    pub outbound: OutboundPipeline,
    pub approval: ApprovalWorkflow,
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("translation engine: {0}")]
    Translation(#[from] TranslationError),

    #[error("sms carrier: {0}")]
    Carrier(#[from] DeliveryError),
}

impl AppState {
    /// Build state with the production engines from config.
    pub fn new(db: Database, config: Config) -> Result<Self, StartupError> {
        let engine: Arc<dyn TranslationEngine> = if config.translation.api_key.is_empty() {
            tracing::warn!("No translation API key configured; messages will not be translated");
            Arc::new(DisabledEngine)
        } else {
            Arc::new(AnthropicEngine::new(config.translation.clone())?)
        };

        if config.twilio.auth_token.is_empty() {
            tracing::warn!("No Twilio auth token configured; every webhook will be rejected");
        }
        let carrier: Arc<dyn SmsCarrier> = Arc::new(TwilioCarrier::new(config.twilio.clone())?);

        Ok(Self::with_collaborators(db, config, engine, carrier))
    }

    pub fn with_collaborators(
        db: Database,
        config: Config,
        engine: Arc<dyn TranslationEngine>,
        carrier: Arc<dyn SmsCarrier>,
    ) -> Self {
        let gate = Gate::new(db.clone());
        let translator = Translator::new(engine);

        let inbound = InboundPipeline::new(
            db.clone(),
            translator.clone(),
            SignatureVerifier::new(config.twilio.auth_token.clone()),
        );
        let outbound = OutboundPipeline::new(
            db.clone(),
            gate.clone(),
            translator,
            carrier,
            RetryPolicy::with_backoff_unit(config.delivery.backoff_unit()),
        );
        let approval = ApprovalWorkflow::new(db.clone(), gate.clone());

        Self {
            db,
            config,
            gate,
            inbound,
            outbound,
            approval,
        }
    }
}
