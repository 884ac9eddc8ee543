// src/drivers/mod.rs
// 数据采集核心：字节 -> 行 -> 样本 -> 历史缓冲 -> 通道
pub mod buffer;
pub mod error;
pub mod ingest;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod source;
// 公开导出这些模块里的结构体，方便外部调用
pub use buffer::{HistoryBuffer, DEFAULT_MAX_POINTS, MAX_MAX_POINTS, MIN_MAX_POINTS};
pub use error::PlotterError;
pub use pipeline::SamplePipeline;
pub use registry::{Channel, SeriesRegistry, SeriesView};
pub use source::ByteSource;
