//! Executor: build → call → reconcile for one dance at a time

use crate::builder::DanceBuilder;
use crate::error::{Error, Result};
use crate::events::SessionEvent;
use crate::reconcile::{reconcile, Reconciliation};
use crate::session::Session;
use crate::transport::Transport;
use holons_core::HolonError;
use holons_wire::DanceRequest;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on a single remote call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Runs dances against a [`Session`] over a [`Transport`]
///
/// Every dance holds the session's in-flight guard from build until the
/// swap. On any error the session state is exactly what it was before.
pub struct Executor<T> {
    transport: T,
    session: Arc<Session>,
    timeout: Duration,
}

impl<T: Transport> Executor<T> {
    /// Create an executor with the default timeout
    pub fn new(transport: T, session: Arc<Session>) -> Self {
        Self::with_timeout(transport, session, DEFAULT_TIMEOUT)
    }

    /// Create an executor with an explicit timeout
    pub fn with_timeout(transport: T, session: Arc<Session>, timeout: Duration) -> Self {
        Executor {
            transport,
            session,
            timeout,
        }
    }

    /// The session
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// The transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Configured call timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build a request with `build` and run it
    ///
    /// `build` sees the state as of acquiring the in-flight guard. If it
    /// fails, nothing is sent.
    pub async fn execute<F>(&self, build: F) -> Result<Reconciliation>
    where
        F: FnOnce(DanceBuilder<'_>) -> std::result::Result<DanceRequest, HolonError>,
    {
        self.execute_with(build, |_| Some(())).await.map(|(r, ())| r)
    }

    /// Like [`execute`](Self::execute), extracting a typed result first
    ///
    /// `extract` runs on the reconciliation before the swap. If it returns
    /// `None` the response has the wrong shape: the dance fails with
    /// [`Error::Internal`] and the session is left as it was.
    pub async fn execute_with<F, X, R>(&self, build: F, extract: X) -> Result<(Reconciliation, R)>
    where
        F: FnOnce(DanceBuilder<'_>) -> std::result::Result<DanceRequest, HolonError>,
        X: FnOnce(&Reconciliation) -> Option<R>,
    {
        let _guard = self.session.begin().await;
        let snapshot = self.session.snapshot();
        let request = build(DanceBuilder::new(&snapshot, self.session.space()))?;
        let seq = self.session.next_seq();
        let dance = request.name.0.clone();

        tracing::info!(dance = %dance, seq, tx = %snapshot.tx_id, "dispatching dance");

        let response = match tokio::time::timeout(self.timeout, self.transport.call(request)).await {
            Ok(result) => result?,
            Err(_) => {
                let elapsed_ms = self.timeout.as_millis() as u64;
                tracing::warn!(dance = %dance, seq, elapsed_ms, "dance timed out; outcome unknown");
                return Err(Error::Timeout { dance, elapsed_ms });
            }
        };

        if !self.session.is_current(seq) {
            tracing::warn!(dance = %dance, seq, "discarding response for cancelled dance");
            return Err(Error::Cancelled { seq });
        }

        let reconciliation = match reconcile(&dance, seq, &snapshot, response) {
            Ok(reconciliation) => reconciliation,
            Err(Error::Rejected {
                dance,
                status,
                description,
            }) => {
                tracing::warn!(dance = %dance, seq, %status, %description, "dance rejected");
                self.session.emit(SessionEvent::Rejected {
                    tx_id: snapshot.tx_id,
                    seq,
                    dance: dance.clone(),
                    status,
                });
                return Err(Error::Rejected {
                    dance,
                    status,
                    description,
                });
            }
            Err(e) => {
                tracing::error!(dance = %dance, seq, error = %e, "response could not be reconciled");
                return Err(e);
            }
        };

        let extracted = match extract(&reconciliation) {
            Some(extracted) => extracted,
            None => {
                let reason = format!("Unexpected body for {}", dance);
                tracing::error!(dance = %dance, seq, body = %reconciliation.body.summarize(), "{}", reason);
                return Err(Error::Internal { reason });
            }
        };

        if !self.session.install(seq, reconciliation.state.clone()) {
            tracing::warn!(dance = %dance, seq, "dance cancelled before swap");
            return Err(Error::Cancelled { seq });
        }

        tracing::info!(
            dance = %dance,
            seq,
            status = %reconciliation.status,
            staged = reconciliation.state.staged_holons.len(),
            committed = reconciliation.committed.len(),
            "dance reconciled"
        );
        self.session.emit(SessionEvent::Reconciled {
            tx_id: reconciliation.state.tx_id,
            seq,
            dance,
            transient: reconciliation.state.transient_holons.len(),
            staged: reconciliation.state.staged_holons.len(),
            committed: reconciliation.committed.len(),
        });
        Ok((reconciliation, extracted))
    }
}
