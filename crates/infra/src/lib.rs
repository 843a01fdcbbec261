//! Infrastructure layer: configuration, credential store, chat provider,
//! tenant scoping and the membership sagas.

pub mod config;
pub mod error;
pub mod provider;
pub mod saga;
pub mod scope;
pub mod services;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use error::{ServiceError, ServiceResult};
pub use saga::MembershipCoordinator;
pub use scope::TenantScope;
