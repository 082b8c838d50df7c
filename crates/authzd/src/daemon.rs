//! Background refresh-daemon contract.
//!
//! Each collaborator daemon (public keys, JWKs, policies) keeps a local
//! replica current off the request path. The engine warms them up once,
//! then supervises their refresh loops and fans their outcome channels
//! into a single caller-visible error stream.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::errors::BoxError;

/// Outcome of one refresh attempt; `Ok(())` on success.
pub type RefreshOutcome = Result<(), BoxError>;

/// A background refresher with a blocking warm-up.
#[async_trait]
pub trait Daemon: Send + Sync {
    /// Fetch and verify the replicated material once, blocking until done.
    /// Used for the synchronous warm-up; cancelled by dropping the future.
    async fn update(&self) -> Result<(), BoxError>;

    /// Spawn the refresh loop.
    ///
    /// Every attempt's outcome is written to the returned channel. The
    /// loop must not exit on a failed attempt; it terminates exactly when
    /// `shutdown` is cancelled, closing the channel.
    fn start(&self, shutdown: CancellationToken) -> mpsc::Receiver<RefreshOutcome>;
}
