//! Worker-pool-backed upstream DNS source. A bounded channel feeds
//! `min_workers..=max_workers` tasks; the pool grows past `min_workers`
//! only when the channel is momentarily full, and idle workers above
//! `min_workers` exit after `idle_timeout`. Each query tries its
//! configured upstreams in order. On any transport error the source backs
//! off for `backoff`, refusing further work for that whole window rather
//! than merely pausing the call that hit the error.

use super::SourceAdapter;
use crate::forwarding::{build_query, parse_response};
use crate::transport::create_transport;
use async_trait::async_trait;
use gudgeon_domain::{DomainError, Question, Response, Upstream, WorkerPoolConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, warn};

struct Job {
    question: Question,
    respond: oneshot::Sender<Result<Response, DomainError>>,
}

/// Tracks the instant a source is allowed to accept work again after an
/// upstream error. Checked before a job is even queued, so a backed-off
/// source never opens a new connection during its window.
struct Backoff {
    until: StdMutex<Option<Instant>>,
}

impl Backoff {
    fn new() -> Self {
        Self {
            until: StdMutex::new(None),
        }
    }

    fn is_active(&self) -> bool {
        match *self.until.lock().unwrap() {
            Some(until) => Instant::now() < until,
            None => false,
        }
    }

    fn trigger(&self, duration: std::time::Duration) {
        *self.until.lock().unwrap() = Some(Instant::now() + duration);
    }
}

pub struct DnsSource {
    upstreams: Vec<Upstream>,
    recursion_desired: bool,
    pool: WorkerPoolConfig,
    tx: mpsc::Sender<Job>,
    rx: Arc<Mutex<mpsc::Receiver<Job>>>,
    active_workers: Arc<AtomicUsize>,
    backoff: Arc<Backoff>,
}

impl DnsSource {
    pub fn new(upstreams: Vec<Upstream>, recursion_desired: bool, pool: WorkerPoolConfig) -> Self {
        let (tx, rx) = mpsc::channel(pool.queue_depth);
        let source = Self {
            upstreams,
            recursion_desired,
            pool,
            tx,
            rx: Arc::new(Mutex::new(rx)),
            active_workers: Arc::new(AtomicUsize::new(0)),
            backoff: Arc::new(Backoff::new()),
        };

        for _ in 0..pool.min_workers {
            source.spawn_worker(false);
        }

        source
    }

    fn spawn_worker(&self, can_idle_out: bool) {
        let rx = Arc::clone(&self.rx);
        let upstreams = self.upstreams.clone();
        let recursion_desired = self.recursion_desired;
        let pool = self.pool;
        let active_workers = Arc::clone(&self.active_workers);
        let backoff = Arc::clone(&self.backoff);

        active_workers.fetch_add(1, Ordering::Relaxed);
        tokio::spawn(async move {
            loop {
                let job = {
                    let mut rx = rx.lock().await;
                    if can_idle_out {
                        match tokio::time::timeout(pool.idle_timeout, rx.recv()).await {
                            Ok(Some(job)) => job,
                            Ok(None) | Err(_) => break,
                        }
                    } else {
                        match rx.recv().await {
                            Some(job) => job,
                            None => break,
                        }
                    }
                };

                let result = query_upstreams(&upstreams, recursion_desired, &job.question, pool).await;
                if result.is_err() {
                    backoff.trigger(pool.backoff);
                }
                let _ = job.respond.send(result);
            }
            active_workers.fetch_sub(1, Ordering::Relaxed);
        });
    }

    async fn submit(&self, question: Question) -> Result<Response, DomainError> {
        if !question.recursion_desired {
            return Err(DomainError::RecursionNotDesired);
        }

        if self.backoff.is_active() {
            debug!("source backing off after a recent upstream error, refusing work");
            return Err(DomainError::Transport("source is backing off".into()));
        }

        let (respond, rx) = oneshot::channel();
        let job = Job { question, respond };

        match self.tx.try_send(job) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(job)) => {
                if self.active_workers.load(Ordering::Relaxed) < self.pool.max_workers {
                    self.spawn_worker(true);
                }
                self.tx
                    .send(job)
                    .await
                    .map_err(|_| DomainError::Transport("worker channel closed".into()))?;
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                return Err(DomainError::Transport("worker channel closed".into()))
            }
        }

        rx.await
            .map_err(|_| DomainError::Transport("worker dropped response channel".into()))?
    }
}

async fn query_upstreams(
    upstreams: &[Upstream],
    recursion_desired: bool,
    question: &Question,
    pool: WorkerPoolConfig,
) -> Result<Response, DomainError> {
    let query_bytes = build_query(question, recursion_desired)?;

    let mut last_err = DomainError::SourcesExhausted;
    for upstream in upstreams {
        let transport = match create_transport(&upstream.protocol) {
            Ok(t) => t,
            Err(e) => {
                last_err = e;
                continue;
            }
        };

        let deadline = pool.write_deadline + pool.read_deadline;
        match transport.send(&query_bytes, deadline).await {
            Ok(raw) => match parse_response(&raw.bytes) {
                Ok((response, truncated)) => {
                    if truncated {
                        debug!(server = %upstream.protocol, "response truncated, accepting as-is (no TCP retry upstream)");
                    }
                    return Ok(response);
                }
                Err(e) => {
                    last_err = e;
                }
            },
            Err(e) => {
                warn!(server = %upstream.protocol, error = ?e, "upstream query failed");
                last_err = e;
            }
        }
    }

    Err(last_err)
}

#[async_trait]
impl SourceAdapter for DnsSource {
    async fn resolve(&self, question: &Question) -> Result<Response, DomainError> {
        self.submit(question.clone()).await
    }
}
