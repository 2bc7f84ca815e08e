//! Compiler error taxonomy.
//!
//! Every failure the core can produce is a [`CompileError`] variant so the
//! build loop can react per sink (report a cycle differently from a bad
//! option value) without string-matching messages.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("circular dependency detected in graph involving node {0}")]
    CycleDetected(String),

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("unknown node type '{node_type}' for node {node_id}")]
    UnknownNodeType { node_id: String, node_type: String },

    #[error("port {node_id}.{port}: {detail}")]
    PortResolution {
        node_id: String,
        port: String,
        detail: String,
    },

    #[error("node {node_id} option '{option}': {detail}")]
    InvalidOption {
        node_id: String,
        option: String,
        detail: String,
    },

    #[error("no shader type mapping: {0}")]
    UnsupportedType(String),

    #[error("duplicate result name in instruction list: {0}")]
    DuplicateResult(String),

    #[error("invalid output path '{path}': {detail}")]
    InvalidOutputPath { path: String, detail: String },

    #[error("graph has not been built yet (call build_graph first)")]
    GraphNotBuilt,

    #[error("dispatch failed: {0}")]
    Dispatch(String),

    #[error("texture i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("image codec failed: {0}")]
    Image(#[from] image::ImageError),
}
