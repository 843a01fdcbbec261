//! Service wiring: credential store, chat provider and the use-case
//! services built on them.

use std::sync::Arc;

use chatgate_auth::TokenService;
use chatgate_infra::provider::{ChatProvider, StreamChatClient};
use chatgate_infra::services::{DirectoryService, IdentityService, MessagingService};
use chatgate_infra::store::{CredentialStore, InMemoryCredentialStore, PostgresCredentialStore};
use chatgate_infra::{AppConfig, MembershipCoordinator, ServiceResult};

#[derive(Clone)]
pub struct AppServices {
    pub identity: IdentityService,
    pub directory: DirectoryService,
    pub membership: MembershipCoordinator,
    pub messaging: MessagingService,
}

impl AppServices {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        provider: Arc<dyn ChatProvider>,
        tokens: Arc<TokenService>,
    ) -> Self {
        let membership = MembershipCoordinator::new(store.clone(), provider.clone());
        Self {
            identity: IdentityService::new(store.clone(), provider.clone(), tokens),
            directory: DirectoryService::new(store.clone(), provider.clone(), membership.clone()),
            messaging: MessagingService::new(store, provider, membership.clone()),
            membership,
        }
    }
}

/// Wire production services from `config`.
///
/// Without `DATABASE_URL` the store is in-memory and every restart loses it.
pub async fn build_services(config: &AppConfig, tokens: Arc<TokenService>) -> ServiceResult<AppServices> {
    let store: Arc<dyn CredentialStore> = match &config.database_url {
        Some(url) => {
            let pg = PostgresCredentialStore::connect(url).await?;
            if config.migrate_db {
                pg.migrate().await?;
            }
            Arc::new(pg)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory credential store");
            Arc::new(InMemoryCredentialStore::new())
        }
    };

    let provider: Arc<dyn ChatProvider> = StreamChatClient::shared(&config.stream)?;

    Ok(AppServices::new(store, provider, tokens))
}
