use async_trait::async_trait;
use uuid::Uuid;

use crate::CoreResult;

/// Resolves a bearer credential to the customer it was issued for. The
/// booking workflow trusts the returned id as given.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, bearer_token: &str) -> CoreResult<Uuid>;
}
