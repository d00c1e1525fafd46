//! 统一错误类型。
//!
//! 约定：
//! - 构造期错误（配置、参考语料）对 feature 构造是致命的，不产生“降级”模型
//! - 运行期的契约违背（例如 OVIX 类型表下溢）直接 panic，不走这里

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::search_step::MoveKind;

pub type Result<T, E = DocentError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DocentError {
    #[error("missing required parameter `{key}`")]
    MissingParameter { key: String },
    #[error("invalid value {value:?} for parameter `{key}`: {reason}")]
    InvalidParameter {
        key: String,
        value: String,
        reason: String,
    },
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corpus error: {0}")]
    Corpus(String),
    #[error("malformed model file {}: line {line}: {reason}", path.display())]
    ModelFormat {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("sentence {sentno}: {reason}")]
    InvalidSegmentation { sentno: usize, reason: String },
    #[error("sentence {sentno}: modification range {from}..{to} is out of bounds (segmentation has {len} phrase pairs)")]
    ModificationOutOfRange {
        sentno: usize,
        from: usize,
        to: usize,
        len: usize,
    },
    #[error("sentence {sentno}: modifications overlap at phrase pair {at}")]
    OverlappingModifications { sentno: usize, at: usize },
    #[error("step tagged {kind:?} changes the phrase pairs instead of only reordering them")]
    InvalidRearrangement { kind: MoveKind },
    #[error("document has {actual} sentences, feature `{feature}` expects {expected}")]
    SentenceCountMismatch {
        feature: String,
        expected: usize,
        actual: usize,
    },
    #[error("feature `{feature}` declares {declared} scores but {given} weights were given")]
    ArityMismatch {
        feature: String,
        declared: usize,
        given: usize,
    },
    #[error("proposal from generation {proposal} is stale (current generation {current})")]
    StaleProposal { proposal: u64, current: u64 },
    #[error("no document has been initialised")]
    NotInitialised,
    #[error("unknown feature type `{0}`")]
    UnknownFeature(String),
}

impl DocentError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
