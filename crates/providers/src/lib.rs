//! Model provider implementations for Stepwise.
//!
//! All providers implement the `stepwise_core::Provider` trait.

pub mod anthropic;

pub use anthropic::AnthropicProvider;

use stepwise_config::AppConfig;
use stepwise_core::error::ProviderError;

/// Build the configured provider.
pub fn build_from_config(config: &AppConfig) -> Result<AnthropicProvider, ProviderError> {
    let api_key = config.api_key.as_deref().ok_or_else(|| {
        ProviderError::NotConfigured(
            "no API key; set STEPWISE_API_KEY or ANTHROPIC_API_KEY, or run `stepwise onboard`".into(),
        )
    })?;

    let provider = AnthropicProvider::new(api_key);
    Ok(match &config.provider.base_url {
        Some(url) => provider.with_base_url(url),
        None => provider,
    })
}
