//! `FeatureSet`：把多个 feature 与它们各自的已提交状态编排在一起。
//!
//! 约定：
//! - 每个 feature 在共享分数向量里占 `[offset, offset + arity)`，offset 按注册顺序分配
//! - 每个条目持有**自己类型**的状态，不做任何向下转型
//! - `estimate` 可以对同一个已提交状态反复调用；待定的 modification 归 `Proposal` 所有，
//!   丢掉 `Proposal` 即释放
//! - `accept` 之后，之前的 `Proposal` 全部作废

use std::{cell::RefCell, fmt, rc::Rc};

use tracing::{debug, trace};

use crate::{
    error::{DocentError, Result},
    feature::{FeatureFunction, Float},
    model::DocumentState,
    search_step::SearchStep,
};

/// 给 `FeatureSet` 用的对象安全接口（避免把每个 feature 的关联类型暴露到外层）。
trait FeatureSlot {
    fn name(&self) -> &str;
    fn arity(&self) -> usize;
    fn check_document(&self, doc: &DocumentState) -> Result<()>;
    fn init_document(&self, doc: &DocumentState, scores: &mut [Float]);
    fn sentence_scores(&self, doc: &DocumentState, sentno: usize, scores: &mut [Float]);
    /// 推测 `step`，返回一个可以稍后提交的待定结果。
    fn estimate(
        &self,
        doc: &DocumentState,
        step: &SearchStep,
        prev_scores: &[Float],
        scores: &mut [Float],
    ) -> Result<Box<dyn StagedCommit>>;
}

/// 某个 feature 对一个候选 step 的待定提交。
trait StagedCommit {
    /// 精化（`update_score`）并把 modification 移交进该 feature 的已提交状态。
    fn commit(
        self: Box<Self>,
        doc: &DocumentState,
        step: &SearchStep,
        prev_scores: &[Float],
        scores: &mut [Float],
    ) -> Result<()>;
}

struct Entry<F: FeatureFunction> {
    name: String,
    feature: Rc<F>,
    state: Rc<RefCell<Option<F::State>>>,
}

struct Staged<F: FeatureFunction> {
    feature: Rc<F>,
    state: Rc<RefCell<Option<F::State>>>,
    modifications: F::Modifications,
}

impl<F: FeatureFunction> StagedCommit for Staged<F> {
    fn commit(
        self: Box<Self>,
        doc: &DocumentState,
        step: &SearchStep,
        prev_scores: &[Float],
        scores: &mut [Float],
    ) -> Result<()> {
        let Staged {
            feature,
            state,
            modifications,
        } = *self;
        let mut slot = state.borrow_mut();
        let current = slot.take().ok_or(DocentError::NotInitialised)?;
        let modifications = feature.update_score(doc, step, &current, modifications, prev_scores, scores);
        *slot = Some(feature.apply_state_modifications(current, modifications));
        Ok(())
    }
}

impl<F> FeatureSlot for Entry<F>
where
    F: FeatureFunction + 'static,
    F::State: 'static,
    F::Modifications: 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> usize {
        self.feature.number_of_scores()
    }

    fn check_document(&self, doc: &DocumentState) -> Result<()> {
        self.feature.check_document(doc)
    }

    fn init_document(&self, doc: &DocumentState, scores: &mut [Float]) {
        let state = self.feature.init_document(doc, scores);
        *self.state.borrow_mut() = Some(state);
    }

    fn sentence_scores(&self, doc: &DocumentState, sentno: usize, scores: &mut [Float]) {
        self.feature.compute_sentence_scores(doc, sentno, scores);
    }

    fn estimate(
        &self,
        doc: &DocumentState,
        step: &SearchStep,
        prev_scores: &[Float],
        scores: &mut [Float],
    ) -> Result<Box<dyn StagedCommit>> {
        let state = self.state.borrow();
        let current = state.as_ref().ok_or(DocentError::NotInitialised)?;
        let modifications = self
            .feature
            .estimate_score_update(doc, step, current, prev_scores, scores);
        Ok(Box::new(Staged {
            feature: Rc::clone(&self.feature),
            state: Rc::clone(&self.state),
            modifications,
        }))
    }
}

/// 一次 `estimate` 的结果：候选 step、推测分数、每个 feature 的待定提交，以及它所属的“代”。
pub struct Proposal {
    generation: u64,
    step: SearchStep,
    scores: Vec<Float>,
    total: Float,
    /// 与注册顺序一一对应
    staged: Vec<Box<dyn StagedCommit>>,
}

impl Proposal {
    pub fn step(&self) -> &SearchStep {
        &self.step
    }

    pub fn scores(&self) -> &[Float] {
        &self.scores
    }

    /// 加权总分。
    pub fn total_score(&self) -> Float {
        self.total
    }
}

impl fmt::Debug for Proposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proposal")
            .field("generation", &self.generation)
            .field("step", &self.step)
            .field("scores", &self.scores)
            .field("total", &self.total)
            .finish_non_exhaustive()
    }
}

/// 一个文档的全部 feature 及其已提交状态。
#[derive(Default)]
pub struct FeatureSet {
    slots: Vec<Box<dyn FeatureSlot>>,
    offsets: Vec<usize>,
    weights: Vec<Float>,
    scores: Vec<Float>,
    /// 每次 init/accept/discard 都会推进；旧代的 proposal 失效
    generation: u64,
    initialised: bool,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个 feature；`weights` 的长度必须等于它声明的分数个数。
    pub fn register<F>(&mut self, name: impl Into<String>, feature: F, weights: Vec<Float>) -> Result<()>
    where
        F: FeatureFunction + 'static,
        F::State: 'static,
        F::Modifications: 'static,
    {
        let name = name.into();
        let declared = feature.number_of_scores();
        if declared != weights.len() {
            return Err(DocentError::ArityMismatch {
                feature: name,
                declared,
                given: weights.len(),
            });
        }
        debug!(feature = %name, offset = self.weights.len(), arity = declared, "feature registered");
        self.offsets.push(self.weights.len());
        self.weights.extend(weights);
        self.scores.resize(self.weights.len(), 0.0);
        self.slots.push(Box::new(Entry {
            name,
            feature: Rc::new(feature),
            state: Rc::new(RefCell::new(None)),
        }));
        self.initialised = false;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// `(name, offset, arity)`，按注册顺序。
    pub fn features(&self) -> impl Iterator<Item = (&str, usize, usize)> + '_ {
        self.slots
            .iter()
            .zip(&self.offsets)
            .map(|(slot, &offset)| (slot.name(), offset, slot.arity()))
    }

    pub fn weights(&self) -> &[Float] {
        &self.weights
    }

    /// 当前已提交的分数向量。
    pub fn scores(&self) -> &[Float] {
        &self.scores
    }

    pub fn total_score(&self) -> Float {
        weighted(&self.weights, &self.scores)
    }

    fn range(&self, i: usize) -> std::ops::Range<usize> {
        self.offsets[i]..self.offsets[i] + self.slots[i].arity()
    }

    /// 对一个新文档从头初始化所有 feature；任何一个 feature 拒绝该文档时不改变任何状态。
    pub fn init_document(&mut self, doc: &DocumentState) -> Result<&[Float]> {
        for slot in &self.slots {
            slot.check_document(doc)?;
        }
        let mut scores = vec![0.0; self.weights.len()];
        for (i, slot) in self.slots.iter().enumerate() {
            slot.init_document(doc, &mut scores[self.range(i)]);
        }
        self.scores = scores;
        self.generation += 1;
        self.initialised = true;
        debug!(
            sentences = doc.sentence_count(),
            total = self.total_score(),
            "document initialised"
        );
        Ok(&self.scores)
    }

    /// 报告用的单句分数。
    pub fn sentence_scores(&self, doc: &DocumentState, sentno: usize) -> Vec<Float> {
        let mut scores = vec![0.0; self.weights.len()];
        for (i, slot) in self.slots.iter().enumerate() {
            slot.sentence_scores(doc, sentno, &mut scores[self.range(i)]);
        }
        scores
    }

    /// 推测 `step` 的分数；不改变已提交状态，可对多个候选反复调用。
    pub fn estimate(&self, doc: &DocumentState, step: &SearchStep) -> Result<Proposal> {
        if !self.initialised {
            return Err(DocentError::NotInitialised);
        }
        step.validate(doc)?;
        let mut scores = vec![0.0; self.weights.len()];
        let mut staged = Vec::with_capacity(self.slots.len());
        for (i, slot) in self.slots.iter().enumerate() {
            let range = self.range(i);
            staged.push(slot.estimate(doc, step, &self.scores[range.clone()], &mut scores[range])?);
        }
        let total = weighted(&self.weights, &scores);
        trace!(kind = ?step.kind, total, "step estimated");
        Ok(Proposal {
            generation: self.generation,
            step: step.clone(),
            scores,
            total,
            staged,
        })
    }

    /// 接受一个 proposal：逐个 feature 精化并提交，然后把 step 写回文档。
    ///
    /// step 不能作用于 `doc` 时直接报错，任何状态都不改变。
    pub fn accept(&mut self, doc: &mut DocumentState, proposal: Proposal) -> Result<()> {
        if proposal.generation != self.generation {
            return Err(DocentError::StaleProposal {
                proposal: proposal.generation,
                current: self.generation,
            });
        }
        proposal.step.validate(doc)?;
        let Proposal {
            step,
            mut scores,
            staged,
            ..
        } = proposal;
        for (i, commit) in staged.into_iter().enumerate() {
            let range = self.range(i);
            commit.commit(doc, &step, &self.scores[range.clone()], &mut scores[range])?;
        }
        doc.apply_step(&step)?;
        self.scores = scores;
        self.generation += 1;
        debug!(
            kind = ?step.kind,
            description = %step.description,
            total = self.total_score(),
            "step accepted"
        );
        Ok(())
    }

    /// 作废当前代所有尚未接受的 proposal。
    pub fn discard_pending(&mut self) {
        self.generation += 1;
    }
}

impl fmt::Debug for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureSet")
            .field("features", &self.features().collect::<Vec<_>>())
            .field("weights", &self.weights)
            .field("scores", &self.scores)
            .field("generation", &self.generation)
            .finish()
    }
}

fn weighted(weights: &[Float], scores: &[Float]) -> Float {
    weights.iter().zip(scores).map(|(w, s)| w * s).sum()
}
