//! Identity provider seam.
//!
//! Credential issuance belongs to an external identity service. The
//! `LocalIdentity` backend keeps accounts in memory so the server runs
//! stand-alone and tests have something to sign in against.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::password::validate_password;
use super::{constant_time_eq, AuthError};
use crate::types::Principal;

/// A principal plus the bearer token issued for this sign-in
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub principal: Principal,
    pub token: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account and sign it in
    async fn register(&self, name: &str, email: &str, password: &str) -> Result<SignedIn, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, AuthError>;

    /// Resolve a bearer token issued by this provider
    async fn principal_for_token(&self, token: &str) -> Option<Principal>;

    async fn sign_out(&self, token: &str);
}

struct Account {
    principal: Principal,
    salt: String,
    digest: String,
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// In-memory identity backend
#[derive(Clone, Default)]
pub struct LocalIdentity {
    /// Keyed by lower-cased email
    accounts: Arc<RwLock<HashMap<String, Account>>>,
    tokens: Arc<RwLock<HashMap<String, Principal>>>,
}

impl LocalIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    async fn issue_token(&self, principal: Principal) -> SignedIn {
        let token = ulid::Ulid::new().to_string();
        self.tokens
            .write()
            .await
            .insert(token.clone(), principal.clone());
        SignedIn { principal, token }
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    async fn register(&self, name: &str, email: &str, password: &str) -> Result<SignedIn, AuthError> {
        let name = name.trim();
        let email = email.trim();

        if name.chars().count() < 3 {
            return Err(AuthError::InvalidName);
        }
        if !email.contains('@') {
            return Err(AuthError::InvalidEmail);
        }
        validate_password(password, name, email)?;

        let key = email.to_lowercase();
        let principal = {
            let mut accounts = self.accounts.write().await;
            if accounts.contains_key(&key) {
                return Err(AuthError::EmailInUse);
            }

            let principal = Principal {
                id: ulid::Ulid::new().to_string(),
                email: email.to_string(),
                display_name: name.to_string(),
            };
            let salt = ulid::Ulid::new().to_string();
            let account = Account {
                principal: principal.clone(),
                digest: digest(&salt, password),
                salt,
            };
            accounts.insert(key, account);
            principal
        };

        tracing::info!(principal = %principal.id, "Registered new account");
        Ok(self.issue_token(principal).await)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, AuthError> {
        let key = email.trim().to_lowercase();
        let principal = {
            let accounts = self.accounts.read().await;
            let account = accounts.get(&key).ok_or(AuthError::InvalidCredentials)?;
            let attempt = digest(&account.salt, password);
            if !constant_time_eq(attempt.as_bytes(), account.digest.as_bytes()) {
                return Err(AuthError::InvalidCredentials);
            }
            account.principal.clone()
        };

        Ok(self.issue_token(principal).await)
    }

    async fn principal_for_token(&self, token: &str) -> Option<Principal> {
        self.tokens.read().await.get(token).cloned()
    }

    async fn sign_out(&self, token: &str) {
        self.tokens.write().await.remove(token);
    }
}
