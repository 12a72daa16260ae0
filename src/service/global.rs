//! 进程级全局定时器服务实例。
//! Process-wide global timer service instance.

use crate::config::TimerConfig;
use crate::service::core::TimerService;
use std::sync::OnceLock;

static GLOBAL: OnceLock<TimerService> = OnceLock::new();

/// Returns the process-wide timer service, starting it on first use. The
/// instance lives for the process lifetime and its threads are never
/// joined. Hosts that want to own the lifetime construct a
/// [`TimerService`] directly instead.
///
/// # Panics
/// Panics if the service threads cannot be spawned on first use.
///
/// 返回进程级定时器服务，首次使用时启动。该实例在整个进程生命周期
/// 内存活，其线程不会被回收。需要自行管理生命周期的宿主应直接构造
/// [`TimerService`]。
///
/// 首次使用时若无法生成服务线程则 panic。
pub fn global() -> &'static TimerService {
    GLOBAL.get_or_init(|| match TimerService::new(TimerConfig::default()) {
        Ok(service) => service,
        Err(err) => panic!("failed to start global timer service: {err}"),
    })
}
