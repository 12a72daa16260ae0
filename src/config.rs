//! 定义了定时器服务的可配置参数。
//! Defines configurable parameters for the timer service.

use std::time::Duration;

/// A structure containing all configurable parameters for the timer service.
///
/// 包含定时器服务所有可配置参数的结构体。
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// The upper bound on how long the scheduler waits between two polls of
    /// the expiry index. Smaller values tighten firing latency at the cost
    /// of more wakeups.
    ///
    /// 调度器两次轮询到期索引之间等待时间的上限。值越小触发延迟越低，
    /// 但唤醒越频繁。
    pub tick_interval: Duration,

    /// The number of timer slots to preallocate in the record arena.
    /// 在记录槽位区中预分配的定时器槽位数量。
    pub initial_capacity: usize,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(1),
            initial_capacity: 64,
        }
    }
}
