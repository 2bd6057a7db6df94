//! # Routines
//!
//! 挂在调度核心之外的协作组件。
//!
//! 负责：
//! - 类型化变换：`transform` / `filter` / `reduce`，类型不匹配时原样转发
//! - 编解码：line / JSON / blob
//! - 文件与标准输入输出的 source / sink
//! - `Script` 链式构建器
//!
//! None of these contain coordination logic; they only read and write
//! [`Message`]s through the [`Pipe`] contract.

pub mod codec;
pub mod collect;
pub mod file;
pub mod ops;
pub mod script;
pub mod stdio;
pub mod transform;

pub use codec::{BlobCodec, CsvCodec, JsonCodec, JsonMode, LineCodec, ReadCodec, WriteCodec};
pub use collect::{Collector, CollectorHandle};
pub use contracts::{CancellationToken, Message, Payload, PayloadType, Pipe, PipelineError, Stage};
pub use file::{FileMode, FileSink, FileSource};
pub use ops::build_op;
pub use script::{read_file, Script};
pub use stdio::{StdinSource, StdoutSink};
pub use transform::{filter, reduce, transform, Filter, Reduce, Transform};
