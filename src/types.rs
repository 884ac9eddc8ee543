// src/types.rs
use std::time::Duration;

// 渲染节拍 (每次 update 最多等待这么久再 tick)
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

// 常用波特率
pub const BAUD_RATES: [u32; 5] = [9600, 19200, 38400, 57600, 115200];
pub const DEFAULT_BAUD: u32 = 9600;

// 连接后的采集状态
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum RunState {
    Running,
    Paused,
}

// 连接状态
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum ConnectionState {
    Disconnected,
    Connected(RunState),
}

impl ConnectionState {
    pub fn is_running(self) -> bool {
        self == ConnectionState::Connected(RunState::Running)
    }
}

// 单次 tick 的统计
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub lines: usize,
    pub accepted: usize,
    pub rejected: usize,
}

impl TickReport {
    pub fn merge(&mut self, other: TickReport) {
        self.lines += other.lines;
        self.accepted += other.accepted;
        self.rejected += other.rejected;
    }
}
