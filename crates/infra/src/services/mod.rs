//! Use-case services composed from the store, the provider and the sagas.
//!
//! Callers are identified by a verified [`Principal`](chatgate_auth::Principal);
//! tenant scoping happens here, role checks happen at the HTTP edge.

pub mod directory;
pub mod identity;
pub mod messaging;

pub use directory::{DirectoryService, NewUserInput};
pub use identity::{AuthSession, IdentityService, ProviderToken, RegisterInput};
pub use messaging::MessagingService;

use chatgate_auth::User;

use crate::error::{ServiceError, ServiceResult};
use crate::provider::{ChatProvider, ProviderIdentity};
use crate::store::CredentialStore;

/// Insert `user` locally, then mirror it on the provider.
///
/// Compensating action: delete the local row if the provider rejects the
/// identity, so no user exists that cannot chat.
pub(crate) async fn provision_user(
    store: &dyn CredentialStore,
    provider: &dyn ChatProvider,
    user: &User,
) -> ServiceResult<()> {
    store.create_user(user).await?;

    if let Err(err) = provider.upsert_identity(&ProviderIdentity::for_user(user)).await {
        tracing::warn!(
            tenant_id = %user.tenant_id,
            user_id = %user.id,
            error = %err,
            "provider identity upsert failed; deleting local user"
        );
        if let Err(undo) = store.delete_user(user.id, user.tenant_id).await {
            tracing::error!(user_id = %user.id, error = %undo, "compensation failed; user left without provider identity");
        }
        return Err(ServiceError::RemoteSyncFailed(err.to_string()));
    }
    Ok(())
}
