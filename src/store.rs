#![allow(async_fn_in_trait)]

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use tokio::{
    sync::mpsc,
    time::{Instant, MissedTickBehavior},
};

use crate::{broker::Broker, event::Event};

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Deadlines further out than this are clamped, which keeps `now + ttl`
/// from overflowing.
const MAX_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("OTP not found")]
    NotFound,
    #[error("OTP expired")]
    Expired,
    #[error("store failure")]
    Internal(#[from] anyhow::Error),
}

/// Storage for the one outstanding code per user.
pub trait OtpStore: Send + Sync {
    /// Stores `code` for `user`, replacing any previous code, valid for `ttl`.
    async fn set(&self, user: &str, code: &str, ttl: Duration);

    /// Returns the current code for `user`. An expired code is removed and
    /// reported as [`StoreError::Expired`], never returned.
    async fn get(&self, user: &str) -> Result<String, StoreError>;

    /// Removes the code for `user`, if any.
    async fn delete(&self, user: &str);

    /// Removes the code for `user` only if it equals `code`, as one step.
    /// Returns `Ok(false)` and keeps the entry on a mismatch. Expired and
    /// missing entries are reported as in [`OtpStore::get`].
    async fn consume(&self, user: &str, code: &str) -> Result<bool, StoreError>;
}

#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    pub sweep_interval: Duration,
    pub queue_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug)]
struct Entry {
    code: String,
    deadline: Instant,
    /// Distinguishes successive `set` calls for the same user.
    issue: u64,
}

#[derive(Debug)]
struct ScheduledExpiry {
    user: String,
    at: Instant,
    issue: u64,
}

#[derive(Debug, Default)]
struct Entries {
    data: HashMap<String, Entry>,
    next_issue: u64,
}

type SharedEntries = Arc<RwLock<Entries>>;

fn read(entries: &SharedEntries) -> RwLockReadGuard<'_, Entries> {
    entries.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(entries: &SharedEntries) -> RwLockWriteGuard<'_, Entries> {
    entries.write().unwrap_or_else(PoisonError::into_inner)
}

/// Removes `user` only if the stored entry still belongs to `issue`.
fn remove_issue(entries: &SharedEntries, user: &str, issue: u64) -> bool {
    let mut entries = write(entries);
    match entries.data.get(user) {
        Some(entry) if entry.issue == issue => {
            entries.data.remove(user);
            true
        }
        _ => false,
    }
}

/// In-memory [`OtpStore`] with lazy expiry on read and a background sweeper
/// that removes and announces expired codes nobody asked for.
///
/// Must be constructed inside a Tokio runtime. The sweeper stops when the
/// store is dropped.
#[derive(Debug)]
pub struct MemoryStore {
    entries: SharedEntries,
    expiries: mpsc::Sender<ScheduledExpiry>,
    broker: Arc<Broker>,
}

impl MemoryStore {
    pub fn new(broker: Arc<Broker>) -> Self {
        Self::with_config(broker, StoreConfig::default())
    }

    pub fn with_config(broker: Arc<Broker>, config: StoreConfig) -> Self {
        let entries = SharedEntries::default();
        let (expiries, intake) = mpsc::channel(config.queue_capacity.max(1));
        tokio::spawn(sweep_expiries(
            entries.clone(),
            broker.clone(),
            intake,
            config.sweep_interval,
        ));
        MemoryStore {
            entries,
            expiries,
            broker,
        }
    }

    pub fn len(&self) -> usize {
        read(&self.entries).data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn announce_lazy_expiry(&self, user: &str) {
        tracing::info!(user, "removed expired OTP on read");
        self.broker.publish(Event::otp_expired(user));
    }
}

impl OtpStore for MemoryStore {
    async fn set(&self, user: &str, code: &str, ttl: Duration) {
        let at = Instant::now() + ttl.min(MAX_TTL);
        let issue = {
            let mut entries = write(&self.entries);
            let issue = entries.next_issue;
            entries.next_issue += 1;
            entries.data.insert(
                user.to_string(),
                Entry {
                    code: code.to_string(),
                    deadline: at,
                    issue,
                },
            );
            issue
        };

        let scheduled = ScheduledExpiry {
            user: user.to_string(),
            at,
            issue,
        };
        if self.expiries.send(scheduled).await.is_err() {
            tracing::warn!(user, "expiry sweeper is not running; expiry will be detected on read");
        }
    }

    async fn get(&self, user: &str) -> Result<String, StoreError> {
        let now = Instant::now();
        let issue = {
            let entries = read(&self.entries);
            let entry = entries.data.get(user).ok_or(StoreError::NotFound)?;
            if now <= entry.deadline {
                return Ok(entry.code.clone());
            }
            entry.issue
        };

        if remove_issue(&self.entries, user, issue) {
            self.announce_lazy_expiry(user);
        }
        Err(StoreError::Expired)
    }

    async fn delete(&self, user: &str) {
        write(&self.entries).data.remove(user);
    }

    async fn consume(&self, user: &str, code: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        {
            let mut entries = write(&self.entries);
            let entry = entries.data.get(user).ok_or(StoreError::NotFound)?;
            if now <= entry.deadline {
                if entry.code != code {
                    return Ok(false);
                }
                entries.data.remove(user);
                return Ok(true);
            }
            entries.data.remove(user);
        }

        self.announce_lazy_expiry(user);
        Err(StoreError::Expired)
    }
}

async fn sweep_expiries(
    entries: SharedEntries,
    broker: Arc<Broker>,
    mut intake: mpsc::Receiver<ScheduledExpiry>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut pending: Vec<ScheduledExpiry> = Vec::new();

    loop {
        tokio::select! {
            scheduled = intake.recv() => match scheduled {
                Some(expiry) => {
                    tracing::debug!(user = %expiry.user, issue = expiry.issue, "scheduled expiry");
                    pending.push(expiry);
                }
                None => break,
            },
            now = ticker.tick() => {
                pending.retain(|expiry| {
                    if expiry.at > now {
                        return true;
                    }
                    // Entries deleted or replaced since scheduling are left alone.
                    if remove_issue(&entries, &expiry.user, expiry.issue) {
                        tracing::info!(user = %expiry.user, "swept expired OTP");
                        broker.publish(Event::otp_expired(&expiry.user));
                    }
                    false
                });
            }
        }
    }

    tracing::debug!(dropped = pending.len(), "expiry sweeper stopped");
}
