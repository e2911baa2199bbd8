//! Application state.

use std::sync::Arc;

use jobdesk_firestore::{FirestoreClient, JobsRepo, UsersRepo};

use crate::auth::TokenService;
use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub firestore: Arc<FirestoreClient>,
    pub users: UsersRepo,
    pub jobs: JobsRepo,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let firestore = FirestoreClient::from_env().await?;
        let users = UsersRepo::new(firestore.clone());
        let jobs = JobsRepo::new(firestore.clone());
        let tokens = TokenService::new(&config.jwt_secret, config.token_expiry_hours);

        Ok(Self {
            config,
            firestore: Arc::new(firestore),
            users,
            jobs,
            tokens: Arc::new(tokens),
        })
    }
}
