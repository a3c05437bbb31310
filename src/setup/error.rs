//! 场景配置错误
//!
//! 所有错误都在仿真开始前出现；行号从 1 开始。

use crate::net::TopologyError;

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: unknown section `{section}`")]
    UnknownSection { line: usize, section: String },
    #[error("line {line}: entry appears before any section header")]
    NoSection { line: usize },
    #[error("line {line}: {section} entry needs {expected} fields, found {found}")]
    BadFieldCount {
        line: usize,
        section: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: invalid {what} `{value}`")]
    BadNumber {
        line: usize,
        what: &'static str,
        value: String,
    },
    #[error("line {line}: unknown device `{name}`")]
    UnknownDevice { line: usize, name: String },
    #[error("line {line}: `{name}` is already defined")]
    DuplicateName { line: usize, name: String },
    #[error("line {line}: unknown routing algorithm `{tag}`")]
    UnknownRouting { line: usize, tag: String },
    #[error("line {line}: unknown congestion algorithm `{tag}`")]
    UnknownCongestion { line: usize, tag: String },
    #[error("line {line}: no {kind} named `{name}` to measure")]
    UnknownMeasurable {
        line: usize,
        kind: String,
        name: String,
    },
    #[error("line {line}: {source}")]
    Topology {
        line: usize,
        #[source]
        source: TopologyError,
    },
}
