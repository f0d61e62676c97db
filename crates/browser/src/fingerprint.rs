//! Fingerprint profile applied to every rendering context.

use tracing::warn;

use crate::{engine::RenderingContext, error::BrowserError, types::Viewport};

/// Client-identifying signals presented to target sites.
#[derive(Debug, Clone)]
pub struct FingerprintProfile {
    pub user_agent: String,
    pub accept_language: String,
    pub timezone: String,
    pub viewport: Viewport,
    pub navigator_languages: Vec<String>,
    pub navigator_platform: String,
}

impl Default for FingerprintProfile {
    fn default() -> Self {
        Self::from(&readproxy_config::FingerprintConfig::default())
    }
}

impl From<&readproxy_config::FingerprintConfig> for FingerprintProfile {
    fn from(cfg: &readproxy_config::FingerprintConfig) -> Self {
        Self {
            user_agent: cfg.user_agent.clone(),
            accept_language: cfg.accept_language.clone(),
            timezone: cfg.timezone.clone(),
            viewport: Viewport {
                width: cfg.viewport_width,
                height: cfg.viewport_height,
                device_scale_factor: cfg.device_scale_factor,
            },
            navigator_languages: cfg.navigator_languages.clone(),
            navigator_platform: cfg.navigator_platform.clone(),
        }
    }
}

impl FingerprintProfile {
    /// Script overriding `navigator.languages` and `navigator.platform`
    /// before any page script runs.
    pub fn init_script(&self) -> String {
        let languages =
            serde_json::to_string(&self.navigator_languages).unwrap_or_else(|_| "[]".into());
        let platform = serde_json::to_string(&self.navigator_platform)
            .unwrap_or_else(|_| "\"\"".into());
        format!(
            "Object.defineProperty(navigator, 'languages', {{ get: () => {languages} }});\n\
             Object.defineProperty(navigator, 'platform', {{ get: () => {platform} }});"
        )
    }

    /// Apply the profile to a freshly opened context. Only the timezone is
    /// best-effort; every other failure is returned.
    pub async fn apply(&self, ctx: &mut dyn RenderingContext) -> Result<(), BrowserError> {
        ctx.set_user_agent(
            &self.user_agent,
            &self.accept_language,
            &self.navigator_platform,
        )
        .await?;
        ctx.set_viewport(self.viewport).await?;
        ctx.set_extra_headers(&[("Accept-Language", self.accept_language.as_str())])
            .await?;
        if let Err(e) = ctx.set_timezone(&self.timezone).await {
            warn!(timezone = %self.timezone, error = %e, "failed to set timezone");
        }
        ctx.add_init_script(&self.init_script()).await
    }
}
