//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use thiserror::Error;

/// The primary error type for the timer service library.
/// 定时器服务库的主要错误类型。
#[derive(Debug, Error)]
pub enum Error {
    /// A repeating timer was requested with a repeat count of zero.
    /// This is rejected outright rather than clamped to one.
    ///
    /// 请求的重复定时器的重复次数为零。直接拒绝而不是收敛为一次。
    #[error("repeat count must be greater than zero")]
    InvalidRepeatCount,

    /// The configured scheduler tick interval is zero, which would turn the
    /// scheduler's bounded wait into a busy spin.
    ///
    /// 配置的调度器轮询间隔为零，这会把调度器的有界等待变成忙等。
    #[error("tick interval must be greater than zero")]
    InvalidTickInterval,

    /// An underlying I/O error occurred while spawning a service thread.
    /// 启动服务线程时发生了底层的I/O错误。
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;
