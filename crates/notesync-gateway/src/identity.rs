//! Identity provider backed by a fixed, already-authenticated user.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use notesync_core::{Error, IdentityProvider, Result, UserIdentity};

/// Identity handed over by whatever performed the sign-in.
///
/// After [`IdentityProvider::sign_out`] every `identity()` call fails with
/// `Error::Unauthorized`.
pub struct StaticIdentity {
    current: RwLock<Option<UserIdentity>>,
}

impl StaticIdentity {
    pub fn new(identity: UserIdentity) -> Self {
        Self {
            current: RwLock::new(Some(identity)),
        }
    }

    /// A provider with nobody signed in.
    pub fn signed_out() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// Read the identity from `NOTESYNC_USER_IDENTITY`.
    pub fn from_env() -> Result<Self> {
        let raw = std::env::var("NOTESYNC_USER_IDENTITY").map_err(|_| {
            Error::Unauthorized("NOTESYNC_USER_IDENTITY is not set".to_string())
        })?;
        Ok(Self::new(UserIdentity::new(raw)?))
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn identity(&self) -> Result<UserIdentity> {
        self.current
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::Unauthorized("no user is signed in".to_string()))
    }

    async fn sign_out(&self) -> Result<()> {
        if let Some(user) = self.current.write().await.take() {
            info!(user = %user, "Signed out");
        }
        Ok(())
    }
}
