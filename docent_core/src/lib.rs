//! `docent_core`：文档级局部搜索解码器的打分核心（纯逻辑层，不做 I/O）。
//!
//! 设计目标：
//! - **增量打分**：feature 持有自己的增量状态，评估候选编辑时不必从头重算
//! - **两阶段协议**：estimate（推测、可重复）-> accept（update + commit）
//! - **分层清晰**：model（文档）-> search_step（编辑）-> feature（契约）-> feature_set（编排）
pub mod error;
pub mod feature;
pub mod feature_set;
pub mod model;
pub mod parameters;
pub mod search_step;

pub use error::{DocentError, Result};
pub use feature::{FeatureFunction, Float};
pub use feature_set::{FeatureSet, Proposal};
pub use model::{AnchoredPhrasePair, DocumentState, Phrase, PhrasePair, PhraseSegmentation, Span, Word};
pub use parameters::Parameters;
pub use search_step::{Modification, MoveKind, SearchStep};
