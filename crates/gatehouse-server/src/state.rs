//! Shared application state.

use crate::config::{PdpConfig, PdpMode, ServerConfig};
use crate::store::{Contact, ContactStore, CONTACT_KIND};
use anyhow::Context;
use gatehouse_authz::pdp::{HttpDecisionClient, HttpPdpConfig, LocalDecisionClient, RolePolicy};
use gatehouse_authz::{AuthzGateway, DecisionClient, GatewayConfig, PrincipalBuilder};
use gatehouse_common_http::HttpConfig;
use std::sync::Arc;
use tracing::info;

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub gateway: AuthzGateway<Contact>,
    pub contacts: Arc<ContactStore>,
}

impl AppState {
    /// Build state from configuration, seeding the contact store.
    pub fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        let client = decision_client(&config.pdp)?;
        info!(client = client.name(), mode = ?config.pdp.mode, "Decision client ready");
        Ok(Self::with_client(config, client, Arc::new(ContactStore::seeded())))
    }

    /// Build state around an existing decision client and store.
    pub fn with_client(
        config: &ServerConfig,
        client: Arc<dyn DecisionClient>,
        contacts: Arc<ContactStore>,
    ) -> Self {
        let gateway = AuthzGateway::new(
            client,
            contacts.clone(),
            PrincipalBuilder::new(config.auth.default_roles.iter().cloned()),
            GatewayConfig::new(CONTACT_KIND)
                .with_list_strategy(config.pdp.list_strategy)
                .with_decision_timeout(config.pdp.timeout()),
        );

        Self { gateway, contacts }
    }
}

fn decision_client(pdp: &PdpConfig) -> anyhow::Result<Arc<dyn DecisionClient>> {
    match pdp.mode {
        PdpMode::Local => Ok(Arc::new(LocalDecisionClient::new(RolePolicy::standard(
            CONTACT_KIND,
        )))),
        PdpMode::Http => {
            let config = HttpPdpConfig {
                base_url: pdp.base_url.clone(),
                check_path: pdp.check_path.clone(),
                batch_path: pdp.batch_path.clone(),
                playground_instance: pdp.playground_instance.clone(),
                http: HttpConfig {
                    connect_timeout: pdp.connect_timeout(),
                    request_timeout: pdp.timeout(),
                    ..HttpConfig::default()
                },
            };
            let client = HttpDecisionClient::new(config).context("Failed to build PDP client")?;
            Ok(Arc::new(client))
        }
    }
}
