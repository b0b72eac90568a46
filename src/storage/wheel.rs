//! Timing Wheel for Active Expiry
//!
//! This module implements the background scheduler that removes keys whose
//! TTL has run out even if nobody reads them again. It replaces per-key timers
//! with a single circular array of time slots.
//!
//! ## Design
//!
//! ```text
//!              current_slot
//!                   │
//!                   ▼
//!   ┌────┬────┬────┬────┬────┬────┬────┬────┐
//!   │ s0 │ s1 │ s2 │ s3 │ s4 │ s5 │ .. │ sN │   N = horizon / tick
//!   └────┴────┴────┴────┴────┴────┴────┴────┘
//!                        ▲
//!                        └── add(entry, ttl) lands at
//!                            current + min(ttl / tick, N - 1)
//! ```
//!
//! 1. `add` appends the entry to the slot `ttl / tick` positions ahead of the
//!    cursor. TTLs beyond the horizon are clamped to the last slot.
//! 2. Every tick the cursor moves one slot, and that slot's list is swapped
//!    out for an empty one under the lock.
//! 3. The lock is released, then the expiration callback runs once per due
//!    entry. The callback may take other locks; the wheel's is never held
//!    while it runs.
//!
//! An entry also remembers the instant it is due. Inserts happen mid-tick, so
//! the slot can come round slightly before that instant; such entries are
//! moved forward instead of fired. The result is that an entry fires no
//! earlier than its deadline and no later than one tick after it.

use crate::storage::config::ConfigError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// Smallest tick the wheel accepts.
pub const MIN_TICK: Duration = Duration::from_millis(1);

/// Smallest number of slots; one slot could never hold a future entry.
pub const MIN_WHEEL_SIZE: usize = 2;

/// Largest number of slots. A 100ms tick covers about five days.
pub const MAX_WHEEL_SLOTS: usize = 4 * 1024 * 1024;

/// Number of slots for `tick` and `horizon`: `horizon / tick`, rounded down.
pub fn wheel_slots(tick: Duration, horizon: Duration) -> Result<usize, ConfigError> {
    if tick.is_zero() {
        return Err(ConfigError::ZeroTick);
    }
    if tick < MIN_TICK {
        return Err(ConfigError::TickTooSmall { tick, min: MIN_TICK });
    }

    let slots = horizon.as_nanos() / tick.as_nanos();
    if slots < MIN_WHEEL_SIZE as u128 {
        return Err(ConfigError::HorizonTooShort { horizon, tick });
    }

    usize::try_from(slots)
        .ok()
        .filter(|&slots| slots <= MAX_WHEEL_SLOTS)
        .ok_or(ConfigError::TooManySlots {
            slots,
            max: MAX_WHEEL_SLOTS,
        })
}

/// An entry waiting in a slot.
#[derive(Debug)]
struct Scheduled<T> {
    fire_at: Instant,
    entry: T,
}

/// The slot array and cursor, without any clock or task.
///
/// All time comes in through the `now` arguments, which keeps the slot
/// arithmetic deterministic and testable.
#[derive(Debug)]
pub struct WheelCore<T> {
    tick: Duration,
    horizon: Duration,
    slots: Vec<Vec<Scheduled<T>>>,
    current: usize,
    pending: usize,
}

impl<T> WheelCore<T> {
    /// Creates a wheel with `horizon / tick` slots.
    ///
    /// The effective horizon is `size * tick`, which is `horizon` rounded
    /// down to a whole number of ticks.
    pub fn new(tick: Duration, horizon: Duration) -> Result<Self, ConfigError> {
        let size = wheel_slots(tick, horizon)?;
        let ticks = u32::try_from(size).map_err(|_| ConfigError::TooManySlots {
            slots: size as u128,
            max: MAX_WHEEL_SLOTS,
        })?;

        let mut slots = Vec::with_capacity(size);
        slots.resize_with(size, Vec::new);

        Ok(Self {
            tick,
            horizon: tick * ticks,
            slots,
            current: 0,
            pending: 0,
        })
    }

    /// Number of slots.
    #[inline]
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// `size * tick`: the longest delay the wheel schedules exactly.
    #[inline]
    pub fn horizon(&self) -> Duration {
        self.horizon
    }

    #[inline]
    pub fn current_slot(&self) -> usize {
        self.current
    }

    /// Entries waiting in any slot.
    #[inline]
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Number of slots ahead of the cursor a delay maps to.
    ///
    /// Never 0: the current slot was just drained and would only come round
    /// again after a full rotation.
    fn offset_for(&self, delay: Duration) -> usize {
        let ticks = delay.as_nanos() / self.tick.as_nanos();
        let last = (self.size() - 1) as u128;
        (ticks.min(last) as usize).max(1)
    }

    /// Schedules `entry` to fire `ttl` after `now`. Returns the slot index.
    pub fn add(&mut self, entry: T, ttl: Duration, now: Instant) -> usize {
        let fire_at = now + ttl.min(self.horizon);
        let slot = (self.current + self.offset_for(ttl)) % self.size();

        self.slots[slot].push(Scheduled { fire_at, entry });
        self.pending += 1;
        slot
    }

    /// Moves the cursor one slot and returns the entries that are due.
    ///
    /// The whole slot is taken. Entries not yet due as of `now` go back into
    /// a later slot for their remaining time.
    pub fn advance(&mut self, now: Instant) -> Vec<T> {
        let size = self.size();
        self.current = (self.current + 1) % size;
        let drained = std::mem::take(&mut self.slots[self.current]);

        let mut due = Vec::with_capacity(drained.len());
        for scheduled in drained {
            if scheduled.fire_at <= now {
                due.push(scheduled.entry);
            } else {
                let slot = (self.current + self.offset_for(scheduled.fire_at - now)) % size;
                self.slots[slot].push(scheduled);
            }
        }

        self.pending -= due.len();
        due
    }
}

/// A running timing wheel.
///
/// The background task is spawned by [`TimingWheel::start`] and stopped by
/// [`TimingWheel::stop`] or by dropping the wheel. A stopped wheel cannot be
/// restarted.
#[derive(Debug)]
pub struct TimingWheel<T> {
    core: Arc<Mutex<WheelCore<T>>>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> TimingWheel<T> {
    /// Creates the wheel and spawns its tick task on the current Tokio runtime.
    ///
    /// `on_expire` is called once for every due entry, outside the wheel's
    /// lock.
    ///
    /// Fails if the slot count is out of range or no runtime is running.
    pub fn start<F>(tick: Duration, horizon: Duration, on_expire: F) -> Result<Self, ConfigError>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;

        let core = WheelCore::new(tick, horizon)?;
        let size = core.size();
        let core = Arc::new(Mutex::new(core));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = runtime.spawn(ticker_loop(
            Arc::clone(&core),
            tick,
            on_expire,
            shutdown_rx,
        ));

        info!(
            tick_ms = tick.as_millis() as u64,
            slots = size,
            "Timing wheel started"
        );

        Ok(Self {
            core,
            shutdown_tx,
            task: Mutex::new(Some(task)),
        })
    }
}

impl<T> TimingWheel<T> {
    /// Schedules `entry` for expiration `ttl` from now.
    pub fn add(&self, entry: T, ttl: Duration) {
        self.core.lock().add(entry, ttl, Instant::now());
    }

    /// Stops the tick task. Later calls do nothing.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            let _ = self.shutdown_tx.send(true);
            task.abort();
            info!("Timing wheel stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    pub fn tick_duration(&self) -> Duration {
        self.core.lock().tick()
    }

    pub fn horizon(&self) -> Duration {
        self.core.lock().horizon()
    }

    pub fn size(&self) -> usize {
        self.core.lock().size()
    }

    /// Entries still waiting to fire.
    pub fn pending(&self) -> usize {
        self.core.lock().pending()
    }
}

impl<T> Drop for TimingWheel<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The tick loop.
async fn ticker_loop<T, F>(
    core: Arc<Mutex<WheelCore<T>>>,
    tick: Duration,
    on_expire: F,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    F: Fn(T),
{
    // The first tick of a plain `interval` completes immediately.
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + tick, tick);

    loop {
        tokio::select! {
            biased;
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Timing wheel received shutdown signal");
                    return;
                }
            }
            _ = interval.tick() => {}
        }

        // The guard is dropped at the end of this statement; callbacks may
        // re-enter the wheel.
        let due = core.lock().advance(Instant::now());

        if !due.is_empty() {
            trace!(due = due.len(), "Timing wheel slot drained");
        }

        for entry in due {
            on_expire(entry);
        }
    }
}
