//! `FeatureFunction`：每个打分模型都实现的契约。
//!
//! 生命周期（由搜索驱动编排，见 `feature_set`）：
//! - `init_document`：每个文档调用一次，从头计算增量状态与初始分数
//! - `estimate_score_update`：对候选 step 推测“提交后的状态与分数”，不得修改已提交状态；
//!   同一个状态上可以对不同候选反复调用
//! - `update_score`：只对最终被接受的 step 调用，可选的精化步骤（默认原样返回）
//! - `apply_state_modifications`：按值消费 modification，产出新的已提交状态
//!
//! 契约不变量：任意一串被接受的编辑，逐步 estimate + commit 得到的状态，
//! 必须与对编辑后的文档直接 `init_document` 得到的状态观测一致。

use crate::{error::Result, model::DocumentState, search_step::SearchStep};

pub type Float = f64;

pub trait FeatureFunction: Send + Sync {
    /// 已提交文档的增量摘要。
    type State: Clone + Send;
    /// 一次候选编辑之后的状态快照（尚未提交）。
    type Modifications: Send;

    /// 检查 `doc` 是否能被本模型打分（例如句数与参考译文一致）。
    fn check_document(&self, _doc: &DocumentState) -> Result<()> {
        Ok(())
    }

    /// 从头计算状态；分数写入 `scores`（长度等于 `number_of_scores`）。
    fn init_document(&self, doc: &DocumentState, scores: &mut [Float]) -> Self::State;

    /// 单句分数（仅用于报告）；只有文档级意义的模型写 0。
    fn compute_sentence_scores(&self, doc: &DocumentState, sentno: usize, scores: &mut [Float]);

    /// 推测应用 `step` 之后的状态与分数。
    ///
    /// `prev_scores` 是当前已提交的分数，`scores` 写入推测分数。
    fn estimate_score_update(
        &self,
        doc: &DocumentState,
        step: &SearchStep,
        state: &Self::State,
        prev_scores: &[Float],
        scores: &mut [Float],
    ) -> Self::Modifications;

    /// 对被接受的 step 做精化；estimate 已经精确的模型直接返回 `modifications`。
    fn update_score(
        &self,
        _doc: &DocumentState,
        _step: &SearchStep,
        _state: &Self::State,
        modifications: Self::Modifications,
        _prev_scores: &[Float],
        _scores: &mut [Float],
    ) -> Self::Modifications {
        modifications
    }

    /// 提交：把 modification 中预先算好的内容移交进状态。
    fn apply_state_modifications(
        &self,
        state: Self::State,
        modifications: Self::Modifications,
    ) -> Self::State;

    fn number_of_scores(&self) -> usize;
}
