//! Named in-process work queues.
//!
//! Each queue owns a worker pool with a concurrency bound and a fixed number
//! of attempts per job. The job id doubles as the deduplication key: a second
//! submission with the same id within its TTL is dropped, which is also the
//! sole mechanism preventing duplicate work for the same intent. Handler
//! errors are logged and consume an attempt; handlers signal "not worth
//! doing" by returning `Ok`.

use {
    futures::future::BoxFuture,
    std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicU64, Ordering},
            Arc,
            Mutex,
        },
        time::Duration,
    },
    tokio::{
        sync::{mpsc, Semaphore},
        time::Instant,
    },
};

#[derive(Clone, Copy, Debug)]
pub struct Options {
    /// The number of jobs processed concurrently.
    pub concurrency: usize,
    /// How often a job is tried before it is dropped.
    pub attempts: u32,
    /// The pause between attempts.
    pub retry_delay: Duration,
}

/// A unit of work together with its attempt counter.
#[derive(Clone, Debug)]
pub struct Job<T> {
    pub id: String,
    pub payload: T,
    pub attempt: u32,
}

pub type Handler<T> = Arc<dyn Fn(Job<T>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

pub struct Queue<T> {
    name: &'static str,
    options: Options,
    sender: mpsc::UnboundedSender<Job<T>>,
    state: Arc<State>,
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            options: self.options,
            sender: self.sender.clone(),
            state: self.state.clone(),
        }
    }
}

#[derive(Default)]
struct State {
    /// Job ids currently claimed, with the instant their claim expires.
    active: Mutex<HashMap<String, Instant>>,
    submitted: AtomicU64,
    deduplicated: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
}

/// A point-in-time view of a queue for the admin surface.
#[derive(Debug, serde::Serialize)]
pub struct Snapshot {
    pub name: &'static str,
    pub active: usize,
    pub submitted: u64,
    pub deduplicated: u64,
    pub completed: u64,
    pub failed: u64,
    pub retried: u64,
}

impl<T: Clone + Send + 'static> Queue<T> {
    /// Creates the queue and spawns its worker pool.
    pub fn new(name: &'static str, options: Options, handler: Handler<T>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job<T>>();
        let state = Arc::new(State::default());

        let queue = Self {
            name,
            options,
            sender: sender.clone(),
            state: state.clone(),
        };

        let semaphore = Arc::new(Semaphore::new(options.concurrency));
        tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    break;
                };
                let handler = handler.clone();
                let sender = sender.clone();
                let state = state.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    let id = job.id.clone();
                    let attempt = job.attempt;
                    let retry = job.clone();
                    match handler(job).await {
                        Ok(()) => {
                            state.finish(&id);
                            state.completed.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(err) => {
                            tracing::warn!(%id, attempt, ?err, queue = name, "job failed");
                            if attempt < options.attempts {
                                state.retried.fetch_add(1, Ordering::Relaxed);
                                tokio::time::sleep(options.retry_delay).await;
                                let _ = sender.send(Job {
                                    attempt: attempt + 1,
                                    ..retry
                                });
                            } else {
                                state.finish(&id);
                                state.failed.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                });
            }
        });

        queue
    }

    /// Enqueues a job unless one with the same id is already claimed. Returns
    /// whether the job was accepted.
    pub fn submit(&self, id: impl Into<String>, ttl: Duration, payload: T) -> bool {
        self.submit_inner(id.into(), ttl, None, payload)
    }

    /// Enqueues a job that only starts processing after the specified delay.
    /// The deduplication claim is taken immediately.
    pub fn submit_delayed(
        &self,
        id: impl Into<String>,
        ttl: Duration,
        delay: Duration,
        payload: T,
    ) -> bool {
        self.submit_inner(id.into(), ttl, Some(delay), payload)
    }

    fn submit_inner(&self, id: String, ttl: Duration, delay: Option<Duration>, payload: T) -> bool {
        {
            let mut active = self.state.active.lock().unwrap();
            let now = Instant::now();
            active.retain(|_, expiry| *expiry > now);
            if active.contains_key(&id) {
                self.state.deduplicated.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%id, queue = self.name, "duplicate job dropped");
                return false;
            }
            active.insert(id.clone(), now + ttl);
        }
        self.state.submitted.fetch_add(1, Ordering::Relaxed);

        let job = Job {
            id,
            payload,
            attempt: 1,
        };
        match delay {
            None => {
                let _ = self.sender.send(job);
            }
            Some(delay) => {
                let sender = self.sender.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = sender.send(job);
                });
            }
        }
        true
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            name: self.name,
            active: self.state.active.lock().unwrap().len(),
            submitted: self.state.submitted.load(Ordering::Relaxed),
            deduplicated: self.state.deduplicated.load(Ordering::Relaxed),
            completed: self.state.completed.load(Ordering::Relaxed),
            failed: self.state.failed.load(Ordering::Relaxed),
            retried: self.state.retried.load(Ordering::Relaxed),
        }
    }
}

impl State {
    fn finish(&self, id: &str) {
        self.active.lock().unwrap().remove(id);
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        futures::FutureExt,
        std::sync::atomic::AtomicU32,
    };

    fn options() -> Options {
        Options {
            concurrency: 2,
            attempts: 3,
            retry_delay: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn duplicate_ids_within_ttl_collapse_to_one_job() {
        let runs = Arc::new(AtomicU32::new(0));
        let handler = {
            let runs = runs.clone();
            Arc::new(move |_job: Job<u32>| {
                let runs = runs.clone();
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
                .boxed()
            })
        };
        let queue = Queue::new("test", options(), handler);

        assert!(queue.submit("intent:auth", Duration::from_secs(60), 1));
        assert!(!queue.submit("intent:auth", Duration::from_secs(60), 2));
        assert!(queue.submit("intent:other", Duration::from_secs(60), 3));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(queue.snapshot().deduplicated, 1);
    }

    #[tokio::test]
    async fn failing_jobs_consume_attempts_then_release_their_claim() {
        let runs = Arc::new(AtomicU32::new(0));
        let handler = {
            let runs = runs.clone();
            Arc::new(move |_job: Job<u32>| {
                let runs = runs.clone();
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    anyhow::bail!("no block for us")
                }
                .boxed()
            })
        };
        let queue = Queue::new("test", options(), handler);
        queue.submit("intent", Duration::from_secs(60), 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        let snapshot = queue.snapshot();
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.retried, 2);
        assert_eq!(snapshot.active, 0);
    }

    #[tokio::test]
    async fn expired_claims_allow_resubmission() {
        let handler = Arc::new(|_job: Job<u32>| async { Ok(()) }.boxed());
        let queue = Queue::new("test", options(), handler);

        assert!(queue.submit("intent", Duration::from_millis(1), 1));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(queue.submit("intent", Duration::from_secs(60), 2));
    }
}
