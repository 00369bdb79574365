use super::{to_minor_units, CheckoutRequest, CheckoutSession, CheckoutStatus, PaymentError, PaymentProvider};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

/// Stripe Checkout over the form-encoded REST API
pub struct Stripe {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SessionObject {
    id: String,
    url: Option<String>,
    status: Option<String>,
    payment_status: Option<String>,
}

impl Stripe {
    pub fn new(api_base: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn session_form(request: &CheckoutRequest) -> Result<Vec<(String, String)>, PaymentError> {
        let unit_amount = to_minor_units(request.amount)
            .ok_or_else(|| PaymentError::InvalidResponse(format!("amount out of range: {}", request.amount)))?;

        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("line_items[0][price_data][currency]".to_string(), request.currency.clone()),
            ("line_items[0][price_data][unit_amount]".to_string(), unit_amount.to_string()),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                request.product_name.clone(),
            ),
        ];
        form.extend(
            request
                .metadata
                .iter()
                .map(|(key, value)| (format!("metadata[{key}]"), value.clone())),
        );
        Ok(form)
    }

    async fn parse(response: reqwest::Response) -> Result<SessionObject, PaymentError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(PaymentError::Api {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| PaymentError::InvalidResponse(format!("{e}; body={body}")))
    }
}

#[async_trait]
impl PaymentProvider for Stripe {
    #[instrument(skip(self, request), fields(amount = %request.amount), err)]
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, PaymentError> {
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.api_key)
            .form(&Self::session_form(request)?)
            .send()
            .await?;

        let session = Self::parse(response).await?;
        let url = session
            .url
            .ok_or_else(|| PaymentError::InvalidResponse(format!("session {} has no url", session.id)))?;

        debug!(session_id = %session.id, "checkout session created");
        Ok(CheckoutSession {
            session_id: session.id,
            url,
        })
    }

    #[instrument(skip(self), err)]
    async fn checkout_status(&self, session_id: &str) -> Result<CheckoutStatus, PaymentError> {
        let response = self
            .client
            .get(format!("{}/v1/checkout/sessions/{session_id}", self.api_base))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let session = Self::parse(response).await?;

        Ok(match (session.payment_status.as_deref(), session.status.as_deref()) {
            (Some("paid"), _) => CheckoutStatus::Paid,
            (_, Some("expired")) => CheckoutStatus::Expired,
            _ => CheckoutStatus::Open,
        })
    }
}
