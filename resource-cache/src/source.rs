use async_trait::async_trait;

use crate::envelope::Bundle;

/// The expensive data source: produce a fresh full replacement bundle or
/// fail. Called under the distributed refill lock, so at most one worker per
/// resource runs it at a time; it must tolerate being called repeatedly on
/// retry.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self) -> anyhow::Result<Bundle>;
}
