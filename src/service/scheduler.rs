//! 调度循环：检测到期定时器的专用线程。
//! Scheduler loop: the dedicated thread that detects due timers.

use crate::service::core::Shared;
use std::sync::Arc;
use tracing::{debug, info};

/// Runs until the stop flag is set. Each iteration reads the current tick,
/// and if it has reached the earliest indexed expiry, extracts every due
/// bucket under the registry lock and hands the resolved callbacks to the
/// dispatch queue as one batch; then it waits out one tick interval on the
/// sleep gate.
///
/// The registry lock is released before the batch is queued, so a facade
/// call never waits behind dispatch handoff.
///
/// 运行直到停止标志被置位。每次迭代读取当前时刻，若已到达索引中
/// 最早的到期时刻，则在注册表锁内提取所有到期的桶，并把解析出的
/// 回调作为一个批次交给分发队列；随后在休眠闸门上等待一个轮询
/// 间隔。
///
/// 注册表锁在批次入队之前释放，因此门面调用不会被分发交接拖住。
pub(crate) fn run(shared: Arc<Shared>) {
    info!("Scheduler thread started");

    while !shared.is_stopped() {
        let now = shared.clock.now_ms();
        let fired = {
            let mut table = shared.table.lock();
            match table.next_expiry() {
                Some(expiry) if expiry <= now => table.collect_due(now),
                _ => Vec::new(),
            }
        };

        if !fired.is_empty() {
            debug!(count = fired.len(), "Queued due timer callbacks");
            shared.queue.push_batch(fired);
        }

        shared.sleep_tick();
    }

    info!("Scheduler thread stopped");
}
