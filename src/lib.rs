//! texture-forge: compiles visual texture node graphs into fused HLSL
//! compute kernels, one dispatch entry point per output node.

pub mod codegen;
pub mod dispatch;
pub mod error;
pub mod graph;
pub mod nodes;
pub mod processor;
pub mod sort;

pub use dispatch::{ComputeDispatch, RecordingDispatch};
pub use error::CompileError;
pub use graph::Graph;
pub use processor::{ExecutionReport, GraphProcessor};
