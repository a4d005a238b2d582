//! Job submission and bounded, cancellable status polling.
//!
//! [`JobPollEngine::start_polling`] returns a [`JobPoll`], a `Stream` of
//! status checks:
//!
//! ```text
//! t = 0          check #1  ──▶ Ok(Pending)
//! t = 1·interval check #2  ──▶ Err(ServerError)   transient, keep going
//! t = 2·interval check #3  ──▶ Ok(Succeeded)      terminal, stream ends
//! ```
//!
//! The stream is sequential: a check is only issued once the previous one has
//! resolved and been consumed, so at most one request is in flight. Ticks
//! missed while a slow check was running are delayed rather than bursted.
//!
//! The stream ends after a terminal status, after `NotFound`, after the
//! attempt budget is spent (yielding `PollExhausted` first), or after
//! [`PollHandle::cancel`]. Dropping the stream cancels it too.

use crate::api::{CreateJobRequest, JobStatus, JobTicket, RemoteApi};
use crate::error::SessionError;
use futures::stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_stream::Stream;
use tracing::{debug, info, warn};

/// Cadence and budget of one poll session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            max_attempts: 300,
        }
    }
}

/// Observes and cancels a running poll. Clones share the same session.
#[derive(Debug, Clone)]
pub struct PollHandle {
    job_id: Arc<str>,
    interval: Duration,
    max_attempts: u32,
    attempts_made: Arc<AtomicU32>,
    active: Arc<AtomicBool>,
}

impl PollHandle {
    fn new(job_id: &str, options: PollOptions) -> Self {
        Self {
            job_id: Arc::from(job_id),
            interval: options.interval,
            max_attempts: options.max_attempts,
            attempts_made: Arc::new(AtomicU32::new(0)),
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Status checks issued so far.
    pub fn attempts_made(&self) -> u32 {
        self.attempts_made.load(Ordering::SeqCst)
    }

    /// False once the poll finished, gave up or was cancelled.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Stop polling. No further checks are issued and a check already in
    /// flight is discarded when it resolves. Idempotent.
    pub fn cancel(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            debug!("Poll of job {} cancelled", self.job_id);
        }
    }

    fn finish(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

type StatusStream = Pin<Box<dyn Stream<Item = Result<JobStatus, SessionError>> + Send>>;

/// A running poll session.
///
/// Yields each status check; see the module docs for when it ends.
pub struct JobPoll {
    inner: StatusStream,
    handle: PollHandle,
}

impl JobPoll {
    pub fn handle(&self) -> PollHandle {
        self.handle.clone()
    }
}

impl Stream for JobPoll {
    type Item = Result<JobStatus, SessionError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for JobPoll {
    fn drop(&mut self) {
        self.handle.finish();
    }
}

/// Creates jobs and polls them through a [`RemoteApi`].
#[derive(Clone)]
pub struct JobPollEngine {
    api: Arc<dyn RemoteApi>,
}

impl JobPollEngine {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    /// Create a job over the inclusive page range `from..=to`.
    pub async fn submit(
        &self,
        document_id: &str,
        from: u32,
        to: u32,
    ) -> Result<JobTicket, SessionError> {
        let request = CreateJobRequest {
            pdf_id: document_id.to_string(),
            from_page: from,
            to_page: to,
        };
        let ticket = self.api.create_job(&request).await?;
        info!(
            "Job {} created for {} pages {}-{}",
            ticket.job_id, document_id, from, to
        );
        Ok(ticket)
    }

    /// Start polling `job_id`. The first check is issued as soon as the
    /// returned stream is first polled.
    pub fn start_polling(&self, job_id: &str, options: PollOptions) -> JobPoll {
        let handle = PollHandle::new(job_id, options);
        let state = PollState {
            api: self.api.clone(),
            handle: handle.clone(),
            ticker: None,
            done: false,
        };
        JobPoll {
            inner: Box::pin(stream::unfold(state, poll_step)),
            handle,
        }
    }
}

struct PollState {
    api: Arc<dyn RemoteApi>,
    handle: PollHandle,
    ticker: Option<Interval>,
    done: bool,
}

async fn poll_step(
    mut st: PollState,
) -> Option<(Result<JobStatus, SessionError>, PollState)> {
    if st.done || !st.handle.is_active() {
        st.handle.finish();
        return None;
    }

    let max_attempts = st.handle.max_attempts;
    if st.handle.attempts_made() >= max_attempts {
        st.done = true;
        st.handle.finish();
        warn!(
            "Job {} not finished after {} checks, giving up",
            st.handle.job_id, max_attempts
        );
        let err = SessionError::PollExhausted {
            job_id: st.handle.job_id.to_string(),
            attempts: max_attempts,
        };
        return Some((Err(err), st));
    }

    // Interval panics on a zero period.
    let period = st.handle.interval.max(Duration::from_millis(1));
    let ticker = st.ticker.get_or_insert_with(|| {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });
    ticker.tick().await;
    if !st.handle.is_active() {
        return None;
    }

    let attempt = st.handle.attempts_made.fetch_add(1, Ordering::SeqCst) + 1;
    let result = st.api.job_status(&st.handle.job_id).await;
    if !st.handle.is_active() {
        debug!(
            "Discarding check #{} of job {}: poll cancelled",
            attempt, st.handle.job_id
        );
        return None;
    }

    match result {
        Ok(status) => {
            debug!(
                "Job {} check #{}: {}",
                st.handle.job_id, attempt, status.state
            );
            if status.state.is_terminal() {
                info!("Job {} finished: {}", st.handle.job_id, status.state);
                st.done = true;
                st.handle.finish();
            }
            Some((Ok(status), st))
        }
        Err(e) if e.stops_polling() => {
            warn!("Job {} is gone: {}", st.handle.job_id, e);
            st.done = true;
            st.handle.finish();
            Some((Err(e), st))
        }
        Err(e) => {
            warn!("Job {} check #{} failed: {}", st.handle.job_id, attempt, e);
            Some((Err(e), st))
        }
    }
}
