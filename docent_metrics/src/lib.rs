//! `docent_metrics`：两个自带的文档级打分模型。
//!
//! - `bleu::BleuModel`：与参考译文的 n-gram 重合度（聚合计数的加减代数）
//! - `ovix::OvixModel`：词汇多样性（type/token 多重集合的增删维护）
pub mod bleu;
pub mod corpus;
pub mod ngram;
pub mod ovix;

pub use bleu::{BleuModel, Smoothing};
pub use ovix::OvixModel;
