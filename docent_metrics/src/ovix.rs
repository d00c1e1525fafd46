//! `OvixModel`：词汇多样性（OVIX，type/token 比的对数形式）。
//!
//! 状态就是目标端词的多重集合：总 token 数 + “词 -> 出现次数”表。
//! 表中永远没有计数为 0 的条目，且 token 数恒等于所有计数之和。

use docent_core::{AnchoredPhrasePair, DocumentState, FeatureFunction, Float, SearchStep, Word};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OvixState {
    types: FxHashMap<Word, u32>,
    tokens: u32,
}

impl OvixState {
    pub fn tokens(&self) -> u32 {
        self.tokens
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn count(&self, word: &str) -> u32 {
        self.types.get(word).copied().unwrap_or(0)
    }

    pub fn types(&self) -> impl Iterator<Item = (&Word, u32)> + '_ {
        self.types.iter().map(|(w, &c)| (w, c))
    }

    /// `-log(T) / log(2 - log(V) / log(T + 1))`。
    ///
    /// T = 0 时没有定义，返回 0。V <= T 保证分母里的对数严格为正。
    pub fn score(&self) -> Float {
        if self.tokens == 0 {
            return 0.0;
        }
        let tokens = Float::from(self.tokens);
        let types = self.types.len() as Float;
        -tokens.ln() / (2.0 - types.ln() / (tokens + 1.0).ln()).ln()
    }

    pub fn add_word(&mut self, word: &Word) {
        self.tokens += 1;
        *self.types.entry(word.clone()).or_insert(0) += 1;
    }

    /// 删除一个当前存在的词。
    ///
    /// # Panics
    ///
    /// 词不在表中说明状态/modification 流已经错乱（契约违背），直接 panic。
    pub fn remove_word(&mut self, word: &Word) {
        let Some(count) = self.types.get_mut(word) else {
            panic!("ovix: removing {word:?} which is not in the document (corrupted state)");
        };
        *count -= 1;
        if *count == 0 {
            self.types.remove(word);
        }
        self.tokens -= 1;
    }

    pub fn add_phrase_pair(&mut self, app: &AnchoredPhrasePair) {
        for w in app.target() {
            self.add_word(w);
        }
    }

    pub fn remove_phrase_pair(&mut self, app: &AnchoredPhrasePair) {
        for w in app.target() {
            self.remove_word(w);
        }
    }
}

/// 只有文档级分数，没有参数。
#[derive(Debug, Clone, Copy, Default)]
pub struct OvixModel;

impl OvixModel {
    pub fn new() -> Self {
        Self
    }
}

impl FeatureFunction for OvixModel {
    type State = OvixState;
    /// 编辑后状态的完整快照。
    type Modifications = OvixState;

    fn init_document(&self, doc: &DocumentState, scores: &mut [Float]) -> OvixState {
        let mut state = OvixState::default();
        for app in doc.segmentations().iter().flatten() {
            state.add_phrase_pair(app);
        }
        scores[0] = state.score();
        state
    }

    fn compute_sentence_scores(&self, _doc: &DocumentState, _sentno: usize, scores: &mut [Float]) {
        scores[0] = 0.0;
    }

    fn estimate_score_update(
        &self,
        doc: &DocumentState,
        step: &SearchStep,
        state: &OvixState,
        _prev_scores: &[Float],
        scores: &mut [Float],
    ) -> OvixState {
        let mut next = state.clone();
        // 调序不改变短语对多重集合，对本模型没有影响
        if !step.kind.is_rearrangement() {
            for m in &step.modifications {
                for app in m.removed(doc.segmentation(m.sentno)) {
                    next.remove_phrase_pair(app);
                }
                for app in &m.proposal {
                    next.add_phrase_pair(app);
                }
            }
        }
        scores[0] = next.score();
        next
    }

    fn apply_state_modifications(&self, mut state: OvixState, modifications: OvixState) -> OvixState {
        state.types = modifications.types;
        state.tokens = modifications.tokens;
        state
    }

    fn number_of_scores(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(words: &[&str]) -> OvixState {
        let mut s = OvixState::default();
        for w in words {
            s.add_word(&Word::from(*w));
        }
        s
    }

    #[test]
    fn zero_entries_are_removed() {
        let mut s = state(&["a", "a", "b"]);
        s.remove_word(&Word::from("b"));
        assert_eq!(s.type_count(), 1);
        assert_eq!(s.count("b"), 0);
        assert_eq!(s.tokens(), 2);
    }

    #[test]
    #[should_panic(expected = "corrupted state")]
    fn removing_an_absent_word_panics() {
        let mut s = state(&["a"]);
        s.remove_word(&Word::from("z"));
    }

    #[test]
    fn degenerate_documents_score_zero() {
        assert_eq!(OvixState::default().score(), 0.0);
        assert_eq!(state(&["a"]).score(), 0.0);
    }
}
