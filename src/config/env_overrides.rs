//! Plain environment variables applied after the file layers.

use super::CarechatConfig;
use crate::error::ApiError;
use crate::provider::ProviderKind;
use tracing::debug;

/// Apply the process environment.
pub fn apply_env_overrides(config: CarechatConfig) -> Result<CarechatConfig, ApiError> {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

/// Apply provider keys and URLs, `PORT`, and `CARECHAT_ENV` from `lookup`.
///
/// Blank values are treated as unset.
pub fn apply_env_overrides_with<F>(
    mut config: CarechatConfig,
    lookup: F,
) -> Result<CarechatConfig, ApiError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    for kind in ProviderKind::ALL {
        if let Some(key) = get(kind.api_key_env_var()) {
            debug!(provider = %kind, "API key taken from environment");
            config
                .providers
                .entry(kind.as_str().to_string())
                .or_default()
                .api_key = Some(key);
        }
        if let Some(url) = get(kind.endpoint_env_var()) {
            let (endpoint, model) = split_legacy_url(kind, &url);
            debug!(provider = %kind, endpoint = %endpoint, "endpoint taken from environment");
            let provider = config
                .providers
                .entry(kind.as_str().to_string())
                .or_default();
            provider.endpoint = Some(endpoint);
            if provider.model.is_none() {
                provider.model = model;
            }
        }
    }

    if let Some(port) = get("PORT") {
        config.server.port = port
            .trim()
            .parse()
            .map_err(|_| ApiError::ConfigError(format!("Invalid PORT: {}", port)))?;
    }

    if let Some(env) = get("CARECHAT_ENV") {
        config.server.environment = env;
    }

    Ok(config)
}

/// Reduce a `*_URL` value to the API base the clients append their path to.
///
/// These variables may hold the full request URL
/// (`.../v1/chat/completions`, or `.../models/{model}:generateContent?key=`
/// for Gemini). A Gemini URL also yields the model it names.
fn split_legacy_url(kind: ProviderKind, url: &str) -> (String, Option<String>) {
    let url = url.trim();
    let url = url.split_once('?').map_or(url, |(path, _)| path);
    let url = url.trim_end_matches('/');
    match kind {
        ProviderKind::Gemini => match url.rsplit_once("/models/") {
            Some((base, rest)) => {
                let model = rest
                    .split(':')
                    .next()
                    .filter(|m| !m.is_empty())
                    .map(str::to_string);
                (base.to_string(), model)
            }
            None => (url.to_string(), None),
        },
        _ => (
            url.strip_suffix("/chat/completions").unwrap_or(url).to_string(),
            None,
        ),
    }
}
