//! Process-wide evaluation cache with single-flight computation.
//!
//! Every fingerprint maps to its own `OnceCell`, so concurrent requests for
//! one fingerprint share a single computation while unrelated fingerprints
//! never contend on a common lock. The computation runs in a spawned task:
//! a caller that gives up (timeout, dropped future) does not cancel it, and
//! its result still lands in the cache for the next attempt.
//!
//! A failed or panicked computation leaves the cell empty. The next caller
//! for that fingerprint runs its own computation.

use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::result::EvaluationResult;
use crate::assessment::{ComplexityLevel, ReasoningStrategy};
use crate::error::{Error, Result};
use crate::interview::{InterviewPhase, SessionId, Turn};

/// Hex characters of the content digest kept in the display form.
const DIGEST_DISPLAY_LEN: usize = 12;

/// Key identifying one unit of evaluation work.
///
/// Includes the session id, so sessions never share results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Fingerprint {
    session_id: SessionId,
    phase: InterviewPhase,
    complexity: ComplexityLevel,
    strategy: ReasoningStrategy,
    /// Response length in bytes.
    response_len: usize,
    /// SHA-256 of the response text, when content addressing is on.
    content_digest: Option<String>,
}

impl Fingerprint {
    pub fn new(
        turn: &Turn,
        complexity: ComplexityLevel,
        strategy: ReasoningStrategy,
        content_addressed: bool,
    ) -> Self {
        let content_digest = content_addressed.then(|| {
            let mut hasher = Sha256::new();
            hasher.update(turn.response.as_bytes());
            hex::encode(hasher.finalize())
        });
        Self {
            session_id: turn.session_id.clone(),
            phase: turn.phase,
            complexity,
            strategy,
            response_len: turn.response.len(),
            content_digest,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn strategy(&self) -> ReasoningStrategy {
        self.strategy
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}_{}",
            self.session_id, self.phase, self.complexity, self.strategy, self.response_len
        )?;
        if let Some(digest) = &self.content_digest {
            write!(f, "_{}", &digest[..DIGEST_DISPLAY_LEN.min(digest.len())])?;
        }
        Ok(())
    }
}

/// Fingerprint-keyed store of evaluation results.
///
/// Entries live for the process lifetime.
// TODO: bound the map with LRU eviction behind get_or_compute once session
// volume makes process-lifetime retention too costly.
#[derive(Debug, Default)]
pub struct EvaluationCache {
    entries: DashMap<Fingerprint, Arc<OnceCell<EvaluationResult>>>,
    populated: Arc<AtomicUsize>,
}

impl EvaluationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the stored result for `fingerprint`, computing it at most once.
    ///
    /// The boolean is true when `compute` did not run for this call. Hits
    /// return a copy flagged `cache_hit`; the stored result is never
    /// modified.
    pub async fn get_or_compute<F, Fut>(
        &self,
        fingerprint: &Fingerprint,
        compute: F,
    ) -> Result<(EvaluationResult, bool)>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<EvaluationResult>> + Send + 'static,
    {
        // Clone the cell out so no shard lock is held across an await.
        let cell = self.entries.entry(fingerprint.clone()).or_default().clone();

        if let Some(stored) = cell.get() {
            debug!(fingerprint = %fingerprint, "cache hit");
            return Ok((stored.as_cache_hit(), true));
        }

        let ran = Arc::new(AtomicBool::new(false));
        let task = {
            let cell = Arc::clone(&cell);
            let ran = Arc::clone(&ran);
            let populated = Arc::clone(&self.populated);
            tokio::spawn(async move {
                cell.get_or_try_init(move || async move {
                    ran.store(true, Ordering::SeqCst);
                    let result = compute().await?;
                    populated.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Error>(result)
                })
                .await
                .cloned()
            })
        };

        match task.await {
            Ok(Ok(result)) => {
                if ran.load(Ordering::SeqCst) {
                    debug!(fingerprint = %fingerprint, "cache populated");
                    Ok((result, false))
                } else {
                    debug!(fingerprint = %fingerprint, "joined in-flight computation");
                    Ok((result.as_cache_hit(), true))
                }
            }
            Ok(Err(e)) => {
                debug!(fingerprint = %fingerprint, error = %e, "computation failed, entry left empty");
                Err(e)
            }
            Err(join) if join.is_panic() => {
                warn!(fingerprint = %fingerprint, "evaluation computation panicked");
                Err(Error::ComputationPanicked(fingerprint.to_string()))
            }
            Err(join) => Err(Error::TaskJoin(join.to_string())),
        }
    }

    /// Stored result for `fingerprint`, without computing.
    pub fn peek(&self, fingerprint: &Fingerprint) -> Option<EvaluationResult> {
        self.entries
            .get(fingerprint)
            .and_then(|cell| cell.get().cloned())
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.peek(fingerprint).is_some()
    }

    /// Number of populated entries.
    pub fn len(&self) -> usize {
        self.populated.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
