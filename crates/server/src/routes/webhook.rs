//! Carrier webhook for inbound SMS
//! POST /api/webhook

use axum::{
    extract::{rejection::FormRejection, OriginalUri, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Form,
};

use crate::{
    error::AppError,
    pipeline::{InboundWebhook, TWIML_ACK},
    state::AppState,
};

const SIGNATURE_HEADER: &str = "x-twilio-signature";

pub async fn receive_sms(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Form(params) = form.map_err(|e| {
        tracing::debug!("Unreadable webhook body: {}", e);
        AppError::Validation("Expected a form-encoded body".to_string())
    })?;

    let url = match &state.config.twilio.webhook_url {
        Some(url) => url.clone(),
        None => {
            let proto = header_str(&headers, "x-forwarded-proto").unwrap_or("https");
            let host = header_str(&headers, header::HOST.as_str()).unwrap_or_default();
            let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
            format!("{}://{}{}", proto, host, path)
        }
    };

    let webhook = InboundWebhook {
        url,
        signature: header_str(&headers, SIGNATURE_HEADER).map(str::to_string),
        params,
    };
    state.inbound.receive(webhook).await?;

    Ok(([(header::CONTENT_TYPE, "text/xml")], TWIML_ACK))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
