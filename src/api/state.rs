//! Shared state injected into handlers.

use secrecy::SecretString;
use std::{sync::Arc, time::Duration};

use super::error::GateError;
use crate::{
    contract::{ContractRenderer, LogMailer, Mailer, TextContractRenderer},
    rate_limit::RateLimiter,
    report::{AbuseAlerts, Event, Reporter, TracingReporter},
    session::SessionStore,
    verifier::PasswordVerifier,
    APP_USER_AGENT,
};

pub const DEFAULT_RESOURCE: &str = "adb";
pub const DEFAULT_VOICE_API_URL: &str = "https://api.elevenlabs.io";
const VOICE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct VoiceConfig {
    agent_id: Option<String>,
    api_key: Option<SecretString>,
    api_url: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            agent_id: None,
            api_key: None,
            api_url: DEFAULT_VOICE_API_URL.to_string(),
        }
    }
}

impl VoiceConfig {
    #[must_use]
    pub fn new(agent_id: Option<String>, api_key: Option<SecretString>, api_url: String) -> Self {
        Self {
            agent_id: agent_id.filter(|id| !id.trim().is_empty()),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn agent_id(&self) -> Option<&str> {
        self.agent_id.as_deref()
    }

    #[must_use]
    pub fn api_key(&self) -> Option<&SecretString> {
        self.api_key.as_ref()
    }

    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[derive(Clone, Debug)]
pub struct GateConfig {
    default_resource: String,
    mail_from: Option<String>,
    voice: VoiceConfig,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            default_resource: DEFAULT_RESOURCE.to_string(),
            mail_from: None,
            voice: VoiceConfig::default(),
        }
    }
}

impl GateConfig {
    #[must_use]
    pub fn with_default_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.default_resource = resource_id.into();
        self
    }

    #[must_use]
    pub fn with_mail_from(mut self, mail_from: Option<String>) -> Self {
        self.mail_from = mail_from.filter(|from| !from.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_voice(mut self, voice: VoiceConfig) -> Self {
        self.voice = voice;
        self
    }

    #[must_use]
    pub fn default_resource(&self) -> &str {
        &self.default_resource
    }

    #[must_use]
    pub fn mail_from(&self) -> Option<&str> {
        self.mail_from.as_deref()
    }

    #[must_use]
    pub fn voice(&self) -> &VoiceConfig {
        &self.voice
    }
}

pub struct AppState {
    sessions: Arc<dyn SessionStore>,
    limiter: Arc<RateLimiter>,
    verifier: PasswordVerifier,
    reporter: Arc<dyn Reporter>,
    alerts: AbuseAlerts,
    renderer: Arc<dyn ContractRenderer>,
    mailer: Arc<dyn Mailer>,
    http: reqwest::Client,
    config: GateConfig,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("limiter", &self.limiter)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// # Errors
    /// Returns an error if the outbound HTTP client cannot be built.
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        limiter: Arc<RateLimiter>,
        verifier: PasswordVerifier,
        config: GateConfig,
    ) -> anyhow::Result<Self> {
        let reporter: Arc<dyn Reporter> = Arc::new(TracingReporter);
        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(VOICE_TIMEOUT)
            .build()?;

        Ok(Self {
            sessions,
            limiter,
            verifier,
            alerts: AbuseAlerts::new(reporter.clone()),
            reporter,
            renderer: Arc::new(TextContractRenderer),
            mailer: Arc::new(LogMailer),
            http,
            config,
        })
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.alerts = AbuseAlerts::new(reporter.clone());
        self.reporter = reporter;
        self
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn ContractRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    #[must_use]
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn verifier(&self) -> &PasswordVerifier {
        &self.verifier
    }

    pub fn alerts(&self) -> &AbuseAlerts {
        &self.alerts
    }

    pub fn renderer(&self) -> &dyn ContractRenderer {
        self.renderer.as_ref()
    }

    pub fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Hand reportable failures to the reporter, then give the error back
    /// for rendering.
    pub fn report(&self, error: GateError, component: &'static str) -> GateError {
        if let Some(kind) = error.report_kind() {
            self.reporter
                .capture(Event::new(kind, error.to_string()).tag("component", component));
        }
        error
    }
}
