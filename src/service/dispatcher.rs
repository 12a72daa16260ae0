//! 事件分发器：在调度临界区之外执行已触发的回调。
//! Event dispatcher: runs fired callbacks outside the scheduling critical
//! section.

use crate::record::TimerCallback;
use crate::service::core::Shared;
use parking_lot::{Condvar, Mutex};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{error, info, trace};

/// Pending-callback queue between the scheduler (producer) and the
/// dispatcher thread (consumer). Batches keep firing order: ascending
/// expiry tick, bucket insertion order within a tick.
///
/// 调度器（生产者）与分发线程（消费者）之间的待执行回调队列。
/// 批次保持触发顺序：到期时刻升序，同一时刻内按桶插入顺序。
pub(crate) struct DispatchQueue {
    pending: Mutex<Vec<TimerCallback>>,
    signal: Condvar,
}

impl DispatchQueue {
    pub(crate) fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            signal: Condvar::new(),
        }
    }

    /// Appends a batch and wakes the dispatcher.
    /// 追加一个批次并唤醒分发线程。
    pub(crate) fn push_batch(&self, mut batch: Vec<TimerCallback>) {
        let mut pending = self.pending.lock();
        pending.append(&mut batch);
        self.signal.notify_one();
    }

    /// 当前排队的回调数 / Number of callbacks currently queued.
    pub(crate) fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Wakes the dispatcher without queueing work, so it can observe the
    /// stop flag. The lock is taken so the notification cannot slip into
    /// the gap between the dispatcher's stop check and its wait.
    ///
    /// 在不入队任何工作的情况下唤醒分发线程，使其能观察到停止标志。
    /// 持锁通知，避免通知落入分发线程检查停止标志与进入等待之间的
    /// 间隙。
    pub(crate) fn wake(&self) {
        let _pending = self.pending.lock();
        self.signal.notify_one();
    }

    /// Blocks until shutdown or at least one callback is queued. Shutdown
    /// wins: queued callbacks are dropped undispatched. Otherwise takes
    /// ownership of the entire queue, leaving it empty.
    ///
    /// 阻塞直到关闭或至少有一个回调排队。关闭优先：已排队的回调
    /// 直接丢弃。否则取走整个队列的所有权，留下空队列。
    fn take_blocking(&self, should_stop: impl Fn() -> bool) -> Option<Vec<TimerCallback>> {
        let mut pending = self.pending.lock();
        loop {
            if should_stop() {
                return None;
            }
            if !pending.is_empty() {
                return Some(std::mem::take(&mut *pending));
            }
            self.signal.wait(&mut pending);
        }
    }
}

/// Runs until shutdown. Executes each taken batch sequentially in queued
/// order, with no lock held, so callbacks are free to create and cancel
/// timers themselves. Each callback runs isolated: a panicking callback is
/// logged and the rest of the batch still runs.
///
/// 运行直到关闭。按入队顺序依次执行取走的每个批次，执行期间不持有
/// 任何锁，因此回调自身可以自由地创建和取消定时器。每个回调隔离
/// 执行：回调 panic 会被记录，批次中其余回调照常运行。
pub(crate) fn run(shared: Arc<Shared>) {
    info!("Dispatcher thread started");

    while let Some(batch) = shared.queue.take_blocking(|| shared.is_stopped()) {
        trace!(count = batch.len(), "Dispatching callback batch");
        for callback in batch {
            if catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                error!("Timer callback panicked");
            }
            shared.processed_callbacks.fetch_add(1, Ordering::Relaxed);
        }
    }

    info!("Dispatcher thread stopped");
}
