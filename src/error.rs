use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading an edge list.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot read edge list {}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: expected at least {expected} fields, found {found}")]
    MalformedLine {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: {message}")]
    Parse { line: u64, message: String },
}

#[derive(Error, Debug, PartialEq)]
pub enum FitError {
    #[error("cannot fit a block model to a graph without vertices")]
    EmptyGraph,

    #[error("merge ratio must be greater than 1, got {0}")]
    InvalidMergeRatio(f64),
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("writing {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("graphviz engine `{engine}` could not be started")]
    EngineUnavailable {
        engine: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("graphviz engine `{engine}` exited with {status}")]
    EngineFailed {
        engine: &'static str,
        status: std::process::ExitStatus,
    },
}
