//! ModelGateway implementations for Quillpad.
//!
//! Model identifiers are classified by prefix family ([`ProviderKind`]) and
//! routed to the matching gateway. There is no default provider; an
//! unrecognized model is an error at request time.

pub mod anthropic;
pub mod kind;
pub mod openai;

pub use anthropic::AnthropicGateway;
pub use kind::ProviderKind;
pub use openai::OpenAiGateway;

use std::sync::Arc;

use quillpad_config::AppConfig;
use quillpad_core::{ModelError, ModelGateway};

/// Build the gateway responsible for `model`, using provider settings from
/// config. Fails when the model is unrecognized or the provider has no key.
pub fn gateway_for(
    model: &str,
    config: &AppConfig,
) -> Result<Arc<dyn ModelGateway>, ModelError> {
    let kind = ProviderKind::classify(model)?;
    let provider_config = config.providers.get(kind.config_key());

    let api_key = provider_config
        .and_then(|p| p.api_key.clone())
        .ok_or_else(|| {
            ModelError::AuthenticationFailed(format!(
                "no API key configured for provider {}",
                kind.config_key()
            ))
        })?;

    let gateway: Arc<dyn ModelGateway> = match kind {
        ProviderKind::OpenAi => {
            let mut g = OpenAiGateway::new(api_key);
            if let Some(url) = provider_config.and_then(|p| p.api_url.clone()) {
                g = g.with_base_url(url);
            }
            Arc::new(g)
        }
        ProviderKind::Anthropic => {
            let mut g = AnthropicGateway::new(api_key);
            if let Some(url) = provider_config.and_then(|p| p.api_url.clone()) {
                g = g.with_base_url(url);
            }
            Arc::new(g)
        }
    };

    Ok(gateway)
}
