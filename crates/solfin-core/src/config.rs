// ── Client configuration ──
//
// Resolved runtime settings for an `AppContext`. Built by `solfin-config`
// from files and environment; core never touches the filesystem.

use std::time::Duration;

use url::Url;

use crate::notify::NotificationConfig;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    /// Per-request transport timeout.
    pub timeout: Duration,
    /// Upper bound on a single credential refresh.
    pub refresh_timeout: Duration,
    pub user_agent: Option<String>,
    pub notifications: NotificationConfig,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(30),
            refresh_timeout: Duration::from_secs(15),
            user_agent: None,
            notifications: NotificationConfig::default(),
        }
    }

    pub(crate) fn transport(&self) -> solfin_api::TransportConfig {
        let mut transport =
            solfin_api::TransportConfig::new(self.base_url.clone()).with_timeout(self.timeout);
        if let Some(agent) = &self.user_agent {
            transport.user_agent.clone_from(agent);
        }
        transport
    }
}
