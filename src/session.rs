// Session token, fetched once per run and shared read-only afterwards

use crate::booking::{Credentials, SessionToken};
use crate::contract::ContractViolation;
use crate::harness::ContractHarness;
use tokio::sync::OnceCell;
use tracing::info;

pub struct Session {
    token: OnceCell<SessionToken>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Usable in a `static`, so one token can serve a whole test binary.
    pub const fn new() -> Self {
        Self {
            token: OnceCell::const_new(),
        }
    }

    /// Authenticates on first use; later calls return the cached token.
    /// A failed attempt leaves the cell empty so the next caller retries.
    pub async fn token(
        &self,
        harness: &ContractHarness,
        credentials: &Credentials,
    ) -> Result<&SessionToken, ContractViolation> {
        self.token
            .get_or_try_init(|| async {
                let token = harness
                    .authenticate(&credentials.username, &credentials.password)
                    .await?;
                info!(username = %credentials.username, "session token acquired");
                Ok::<_, ContractViolation>(token)
            })
            .await
    }

    pub fn cached(&self) -> Option<&SessionToken> {
        self.token.get()
    }
}
