//! Multi-session interview service.
//!
//! The service owns one orchestrator per session and the collaborators they
//! share: the evaluation pipeline (cache, evaluator, ledger, store), the
//! gate policy and the directive channel. Each session sits behind
//! its own async mutex, so turns of one session are handled in order while
//! different sessions run in parallel.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::directive::{DirectiveSender, PhaseDirective};
use super::gating::GatePolicy;
use super::orchestrator::{Orchestrator, OrchestratorContext, SessionCommand, SessionMetrics};
use super::persistence::EvaluationStore;
use super::request::{EvaluationRequest, TurnReport};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::evaluation::{EvaluationPipeline, TelemetrySnapshot};
use crate::interview::{InterviewPhase, SessionId};
use crate::provider::ReasoningProvider;

/// Entry point for inbound requests.
///
/// # Example
///
/// ```ignore
/// use catalyst::orchestration::{EvaluationRequest, InterviewService, NullStore};
///
/// let (service, mut directives) =
///     InterviewService::new(&config, Arc::new(KeywordProvider::new()), Arc::new(NullStore));
/// let id = service.start_session(Some("s1".into()))?;
/// let report = service.handle_request(EvaluationRequest::new("s1", "...")).await?;
/// ```
pub struct InterviewService {
    sessions: DashMap<SessionId, Arc<Mutex<Orchestrator>>>,
    ctx: OrchestratorContext,
    shutdown: CancellationToken,
}

impl InterviewService {
    /// Build a service from configuration. The receiver yields every
    /// directive issued by any session.
    pub fn new(
        config: &Config,
        provider: Arc<dyn ReasoningProvider>,
        store: Arc<dyn EvaluationStore>,
    ) -> (Self, mpsc::UnboundedReceiver<PhaseDirective>) {
        let (directives, rx) = DirectiveSender::channel();
        let ctx = OrchestratorContext {
            pipeline: Arc::new(EvaluationPipeline::from_config(config, provider).with_store(store)),
            gates: Arc::new(GatePolicy::new(config.gating.clone())),
            settings: config.orchestrator.clone(),
            directives,
        };
        (Self::with_context(ctx), rx)
    }

    pub fn with_context(ctx: OrchestratorContext) -> Self {
        Self {
            sessions: DashMap::new(),
            ctx,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn pipeline(&self) -> &EvaluationPipeline {
        &self.ctx.pipeline
    }

    /// Create a session and move it into Scoping.
    ///
    /// A fresh id is minted when `id` is `None`.
    pub fn start_session(&self, id: Option<SessionId>) -> Result<SessionId> {
        self.ensure_running()?;
        let id = id.unwrap_or_default();
        match self.sessions.entry(id.clone()) {
            Entry::Occupied(_) => Err(Error::SessionExists(id.to_string())),
            Entry::Vacant(slot) => {
                let mut orchestrator = Orchestrator::new(id.clone(), self.ctx.clone());
                orchestrator.command(SessionCommand::Start)?;
                slot.insert(Arc::new(Mutex::new(orchestrator)));
                info!(session = %id, "session started");
                Ok(id)
            }
        }
    }

    /// Route one inbound request to its session.
    pub async fn handle_request(&self, request: EvaluationRequest) -> Result<TurnReport> {
        self.ensure_running()?;
        request.validate()?;
        let orchestrator = self.orchestrator(&request.session_id())?;
        let mut orchestrator = orchestrator.lock().await;
        tokio::select! {
            _ = self.shutdown.cancelled() => Err(Error::ShuttingDown),
            report = orchestrator.handle_turn(&request) => report,
        }
    }

    pub async fn command(&self, id: &SessionId, command: SessionCommand) -> Result<InterviewPhase> {
        self.ensure_running()?;
        let orchestrator = self.orchestrator(id)?;
        let mut orchestrator = orchestrator.lock().await;
        orchestrator.command(command)
    }

    pub async fn session_metrics(&self, id: &SessionId) -> Result<SessionMetrics> {
        let orchestrator = self.orchestrator(id)?;
        let orchestrator = orchestrator.lock().await;
        Ok(orchestrator.metrics())
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.ctx.pipeline.telemetry()
    }

    /// Wait until every evaluation stored so far has been written.
    ///
    /// Call before the runtime is dropped, or pending writes are lost.
    pub async fn flush(&self) {
        self.ctx.pipeline.flush().await;
        debug!("pending evaluation writes flushed");
    }

    /// Remove a finished session and return its final metrics.
    ///
    /// Only sessions in a terminal phase can be closed.
    pub async fn close_session(&self, id: &SessionId) -> Result<SessionMetrics> {
        let orchestrator = self.orchestrator(id)?;
        let metrics = orchestrator.lock().await.metrics();
        if !metrics.phase.is_terminal() {
            return Err(Error::Validation(format!(
                "session {id} is still active ({})",
                metrics.phase
            )));
        }
        self.sessions.remove(id);
        debug!(session = %id, "session closed");
        Ok(metrics)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|r| r.key().clone()).collect()
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Stop accepting work. In-flight evaluations still populate the cache.
    pub fn shutdown(&self) {
        info!(sessions = self.sessions.len(), "interview service shutting down");
        self.shutdown.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    fn ensure_running(&self) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(Error::ShuttingDown);
        }
        Ok(())
    }

    fn orchestrator(&self, id: &SessionId) -> Result<Arc<Mutex<Orchestrator>>> {
        self.sessions
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }
}
