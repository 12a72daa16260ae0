//! 定时器服务核心实现
//! Timer service core implementation
//!
//! 包含受单一互斥锁保护的注册表（槽位区 + ID表 + 到期索引）及其
//! 状态机、面向调用方的门面操作，以及两个后台线程的生命周期管理。
//!
//! Contains the registry (arena + id table + expiry index) guarded by a
//! single mutex together with its state machine, the caller-facing facade
//! operations, and lifecycle management for the two background threads.

use crate::arena::{TimerArena, TimerKey};
use crate::clock::{MonotonicClock, Tick};
use crate::config::TimerConfig;
use crate::error::{Error, Result};
use crate::index::ExpiryIndex;
use crate::record::{TimerCallback, TimerId, TimerRecord};
use crate::service::dispatcher::{self, DispatchQueue};
use crate::service::scheduler;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, trace};

/// The registry: every map the scheduler works against, guarded as one
/// unit by a single mutex in [`Shared`].
///
/// 注册表：调度器操作的全部映射，在 [`Shared`] 中由单一互斥锁
/// 作为整体保护。
#[derive(Debug, Default)]
pub(crate) struct TimerTable {
    /// Strong ownership of every live record.
    /// 所有存活记录的强所有权。
    arena: TimerArena,
    /// Caller-visible id to arena key, for O(1) cancellation.
    /// 调用方可见ID到槽位键的映射，用于O(1)取消。
    id_table: HashMap<TimerId, TimerKey>,
    /// Expiry tick to the weak keys due at that tick.
    /// 到期时刻到该时刻到期的弱键的映射。
    index: ExpiryIndex,
}

impl TimerTable {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: TimerArena::with_capacity(capacity),
            id_table: HashMap::with_capacity(capacity),
            index: ExpiryIndex::new(),
        }
    }

    /// Registers a record: one strong arena entry, one id-table entry, one
    /// index entry.
    ///
    /// 登记一条记录：一个强槽位区条目、一个ID表条目、一个索引条目。
    pub(crate) fn insert(&mut self, record: TimerRecord) {
        let id = record.id;
        let expiry = record.next_expiry;
        let key = self.arena.insert(record);
        self.id_table.insert(id, key);
        self.index.insert(expiry, key);
    }

    /// Drops the strong entry for `id`. The index is deliberately left
    /// alone: its key for this timer goes stale the same instant and is
    /// skipped when its bucket is next extracted.
    ///
    /// 丢弃 `id` 的强条目。索引刻意不动：其中指向该定时器的键即刻
    /// 失效，在所在桶下次被提取时被跳过。
    pub(crate) fn cancel(&mut self, id: TimerId) -> bool {
        match self.id_table.remove(&id) {
            Some(key) => self.arena.remove(key).is_some(),
            None => false,
        }
    }

    /// The earliest indexed expiry tick.
    /// 索引中最早的到期时刻。
    pub(crate) fn next_expiry(&self) -> Option<Tick> {
        self.index.next_expiry()
    }

    /// 存活定时器数 / Number of live timers.
    pub(crate) fn live_timers(&self) -> usize {
        self.arena.len()
    }

    /// Extracts every due bucket and advances the timers found there,
    /// returning the callbacks to dispatch in firing order (ascending
    /// expiry tick, bucket insertion order within a tick).
    ///
    /// A timer that is behind by several periods owes every missed firing:
    /// the catch-up loop queues one callback per missed period instead of
    /// collapsing them, so a repeating timer always fires exactly its
    /// repeat count in total. Repeats are re-indexed at their advanced
    /// *scheduled* expiry; exhausted timers are retired.
    ///
    /// 提取所有已到期的桶并推进其中的定时器，按触发顺序（到期时刻
    /// 升序，同一时刻内按桶插入顺序）返回待分发的回调。
    ///
    /// 落后多个周期的定时器欠下每一次错过的触发：补偿循环为每个
    /// 错过的周期排入一次回调而不是合并它们，因此重复定时器总计
    /// 恰好触发其重复次数。未完的定时器按推进后的*计划*到期时刻
    /// 重新入索引；已完成的定时器被注销。
    pub(crate) fn collect_due(&mut self, now: Tick) -> Vec<TimerCallback> {
        let mut fired = Vec::new();

        for (_tick, keys) in self.index.extract_due(now) {
            for key in keys {
                let Some(record) = self.arena.get_mut(key) else {
                    // Cancelled while indexed; this stale key was the last
                    // trace of it.
                    continue;
                };

                loop {
                    fired.push(record.callback.clone());
                    record.remaining_repeats -= 1;
                    record.next_expiry += record.period_ms;
                    if record.remaining_repeats == 0 || record.next_expiry > now {
                        break;
                    }
                }

                let id = record.id;
                let remaining = record.remaining_repeats;
                let next_expiry = record.next_expiry;
                if remaining > 0 {
                    self.index.insert(next_expiry, key);
                } else {
                    self.arena.remove(key);
                    self.id_table.remove(&id);
                }
            }
        }

        fired
    }
}

/// State shared between the facade and the two background threads.
/// 门面与两个后台线程之间共享的状态。
pub(crate) struct Shared {
    /// The registry, under the scheduler lock.
    /// 注册表，受调度锁保护。
    pub(crate) table: Mutex<TimerTable>,
    /// 待分发回调队列 / Pending-callback queue.
    pub(crate) queue: DispatchQueue,
    /// 时间基 / The time base.
    pub(crate) clock: MonotonicClock,
    /// 停止标志 / Stop flag.
    pub(crate) stop: AtomicBool,
    /// 下一个分配的定时器ID / Next timer id to allocate.
    next_id: AtomicU64,
    /// 调度器轮询间隔 / Scheduler poll interval.
    pub(crate) tick_interval: Duration,
    /// The scheduler's sleep gate. A condvar timed wait keeps wake latency
    /// tight where general-purpose sleeps can jitter by tens of
    /// milliseconds; shutdown notifies it so the scheduler exits promptly.
    ///
    /// 调度器的休眠闸门。条件变量定时等待使唤醒延迟保持紧凑，
    /// 而通用休眠可能有数十毫秒的抖动；关闭时会通知它，
    /// 使调度器尽快退出。
    sleep_lock: Mutex<()>,
    sleep_signal: Condvar,
    /// 已执行的回调数 / Callbacks executed so far.
    pub(crate) processed_callbacks: AtomicU64,
    /// 已取消的定时器数 / Timers cancelled so far.
    pub(crate) cancelled_timers: AtomicU64,
}

impl Shared {
    pub(crate) fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// One bounded scheduler pause, ended early by shutdown.
    /// 一次有界的调度器停顿，关闭时提前结束。
    pub(crate) fn sleep_tick(&self) {
        let mut guard = self.sleep_lock.lock();
        let _ = self.sleep_signal.wait_for(&mut guard, self.tick_interval);
    }
}

/// 定时器服务统计信息
/// Timer service statistics
#[derive(Debug, Clone)]
pub struct TimerServiceStats {
    /// 当前存活的定时器数 / Number of currently live timers.
    pub live_timers: usize,
    /// 已排队等待分发的回调数 / Callbacks queued for dispatch.
    pub pending_callbacks: usize,
    /// 已执行的回调数 / Callbacks executed so far.
    pub processed_callbacks: u64,
    /// 已取消的定时器数 / Timers cancelled so far.
    pub cancelled_timers: u64,
}

impl std::fmt::Display for TimerServiceStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TimerServiceStats {{ live: {}, pending: {}, processed: {}, cancelled: {} }}",
            self.live_timers,
            self.pending_callbacks,
            self.processed_callbacks,
            self.cancelled_timers
        )
    }
}

/// The timer service: one-shot and repeating callback timers scheduled by
/// a background thread and executed by a second one.
///
/// Dropping the service stops both threads. Callbacks still queued at
/// that point are dropped undispatched. The process-wide instance from
/// [`crate::service::global`] is never dropped.
///
/// 定时器服务：一次性与重复回调定时器，由一个后台线程调度、
/// 另一个后台线程执行。
///
/// 丢弃服务会停止两个线程；此时仍在队列中的回调不再分发。
/// [`crate::service::global`] 返回的进程级实例永远不会被丢弃。
pub struct TimerService {
    shared: Arc<Shared>,
    scheduler: Option<JoinHandle<()>>,
    dispatcher: Option<JoinHandle<()>>,
}

impl TimerService {
    /// Starts a timer service with the given configuration, spawning the
    /// scheduler and dispatcher threads.
    ///
    /// 以给定配置启动定时器服务，生成调度线程与分发线程。
    pub fn new(config: TimerConfig) -> Result<Self> {
        if config.tick_interval.is_zero() {
            return Err(Error::InvalidTickInterval);
        }

        let shared = Arc::new(Shared {
            table: Mutex::new(TimerTable::with_capacity(config.initial_capacity)),
            queue: DispatchQueue::new(),
            clock: MonotonicClock::new(),
            stop: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            tick_interval: config.tick_interval,
            sleep_lock: Mutex::new(()),
            sleep_signal: Condvar::new(),
            processed_callbacks: AtomicU64::new(0),
            cancelled_timers: AtomicU64::new(0),
        });

        let scheduler = thread::Builder::new().name("timer-scheduler".into()).spawn({
            let shared = Arc::clone(&shared);
            move || scheduler::run(shared)
        })?;
        let dispatcher = thread::Builder::new().name("timer-dispatcher".into()).spawn({
            let shared = Arc::clone(&shared);
            move || dispatcher::run(shared)
        })?;

        info!("Timer service started");
        Ok(Self {
            shared,
            scheduler: Some(scheduler),
            dispatcher: Some(dispatcher),
        })
    }

    /// Starts a timer service with the default configuration.
    /// 以默认配置启动定时器服务。
    pub fn with_defaults() -> Result<Self> {
        Self::new(TimerConfig::default())
    }

    /// Schedules `callback` to fire exactly once, `delay_ms` milliseconds
    /// from now. Returns the fresh timer id immediately; never blocks on
    /// callback execution.
    ///
    /// 调度 `callback` 在 `delay_ms` 毫秒后恰好触发一次。立即返回
    /// 新分配的定时器ID；绝不阻塞在回调执行上。
    pub fn create_timer(
        &self,
        delay_ms: u64,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> TimerId {
        self.schedule(delay_ms, 1, Arc::new(callback))
    }

    /// Schedules `callback` to fire `repeat` times, `delay_ms` milliseconds
    /// apart, each interval measured from the previous *scheduled* expiry
    /// so drift stays bounded over the whole run.
    ///
    /// # Errors
    /// [`Error::InvalidRepeatCount`] if `repeat` is zero.
    ///
    /// 调度 `callback` 触发 `repeat` 次，每次间隔 `delay_ms` 毫秒，
    /// 间隔从上一次*计划*到期时刻起算，使整个过程的漂移保持有界。
    ///
    /// `repeat` 为零时返回 [`Error::InvalidRepeatCount`]。
    pub fn create_repeat_timer(
        &self,
        delay_ms: u64,
        repeat: u32,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> Result<TimerId> {
        if repeat == 0 {
            return Err(Error::InvalidRepeatCount);
        }
        Ok(self.schedule(delay_ms, repeat, Arc::new(callback)))
    }

    /// Cancels a live timer. Returns `true` if a timer with that id existed
    /// and was removed, `false` for an unknown, already fired, or already
    /// cancelled id; safe and idempotent under concurrency.
    ///
    /// A firing that the scheduler has already queued for dispatch is not
    /// retracted: at most one extra callback may run after a successful
    /// cancel.
    ///
    /// 取消一个存活的定时器。若该ID的定时器存在且被移除则返回
    /// `true`；ID未知、已触发完或已被取消则返回 `false`。并发下
    /// 安全且幂等。
    ///
    /// 调度器已排入分发队列的触发不会被撤回：成功取消后最多还会
    /// 执行一次回调。
    pub fn cancel_timer(&self, id: TimerId) -> bool {
        let cancelled = self.shared.table.lock().cancel(id);
        if cancelled {
            self.shared.cancelled_timers.fetch_add(1, Ordering::Relaxed);
            trace!(timer_id = id, "Timer cancelled");
        } else {
            trace!(timer_id = id, "Timer not found for cancellation");
        }
        cancelled
    }

    /// 当前统计信息快照 / A snapshot of current statistics.
    pub fn stats(&self) -> TimerServiceStats {
        TimerServiceStats {
            live_timers: self.shared.table.lock().live_timers(),
            pending_callbacks: self.shared.queue.len(),
            processed_callbacks: self.shared.processed_callbacks.load(Ordering::Relaxed),
            cancelled_timers: self.shared.cancelled_timers.load(Ordering::Relaxed),
        }
    }

    fn schedule(&self, delay_ms: u64, repeat: u32, callback: TimerCallback) -> TimerId {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let next_expiry = self.shared.clock.now_ms().saturating_add(delay_ms);
        let record = TimerRecord {
            id,
            period_ms: delay_ms,
            remaining_repeats: repeat,
            next_expiry,
            callback,
        };

        self.shared.table.lock().insert(record);
        trace!(timer_id = id, delay_ms, repeat, "Timer created");
        id
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);

        // Scheduler first, then wake the dispatcher so it observes the stop
        // flag; anything still queued at that point is dropped undispatched.
        {
            let _gate = self.shared.sleep_lock.lock();
            self.shared.sleep_signal.notify_all();
        }
        if let Some(handle) = self.scheduler.take() {
            if handle.join().is_err() {
                error!("Scheduler thread panicked during shutdown");
            }
        }

        self.shared.queue.wake();
        if let Some(handle) = self.dispatcher.take() {
            if handle.join().is_err() {
                error!("Dispatcher thread panicked during shutdown");
            }
        }

        info!("Timer service shut down");
    }
}
