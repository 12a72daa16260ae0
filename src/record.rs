//! 定时器记录：可调度的基本单元。
//! Timer record: the schedulable unit.

use crate::clock::Tick;
use std::sync::Arc;

/// Caller-visible timer identifier. Allocated from an atomic counter,
/// monotonically increasing, never reused during the process lifetime.
///
/// 调用方可见的定时器标识符。由原子计数器分配，单调递增，
/// 进程生命周期内不复用。
pub type TimerId = u64;

/// The timer callback signature. A clone of the callback is pushed into the
/// dispatch queue for every firing, so all firings of a repeating timer
/// share one allocation.
///
/// 定时器回调签名。每次触发都会把回调的一个克隆推入分发队列，
/// 因此重复定时器的所有触发共享同一份分配。
pub type TimerCallback = Arc<dyn Fn() + Send + Sync + 'static>;

/// A scheduled timer.
/// 一个已调度的定时器。
pub struct TimerRecord {
    /// 定时器ID / Timer id.
    pub id: TimerId,
    /// The firing period in milliseconds. For a one-shot timer this holds
    /// the original delay and is never re-read after the first firing.
    ///
    /// 触发周期（毫秒）。对一次性定时器而言保存最初的延迟，
    /// 首次触发后不再读取。
    pub period_ms: u64,
    /// Firings left. A one-shot timer starts at 1.
    /// 剩余触发次数。一次性定时器从1开始。
    pub remaining_repeats: u32,
    /// The next scheduled expiry tick. Advanced by `period_ms` from the
    /// previous *scheduled* expiry, never from the actual firing time, so
    /// drift does not compound across firings.
    ///
    /// 下一次计划到期的时刻。每次都从上一次*计划*到期时刻推进
    /// `period_ms`，而不是从实际触发时刻推进，因此漂移不会逐次累积。
    pub next_expiry: Tick,
    /// 到期时运行的回调 / The callback run on expiry.
    pub callback: TimerCallback,
}

impl std::fmt::Debug for TimerRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerRecord")
            .field("id", &self.id)
            .field("period_ms", &self.period_ms)
            .field("remaining_repeats", &self.remaining_repeats)
            .field("next_expiry", &self.next_expiry)
            .finish_non_exhaustive()
    }
}
