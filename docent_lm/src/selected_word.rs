//! `SelectedWordLm`：只对“选中的词”组成的子序列打语言模型分。
//!
//! 每个 step 只重新计算受影响句子的整句分数（句内不做增量）；
//! 文档分数是各句 log10 概率之和。

use std::{fs, path::Path};

use docent_core::{DocentError, DocumentState, FeatureFunction, Float, Parameters, Result, SearchStep, Word};
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::NgramModel;

/// 决定哪些词参与语言模型打分。词表与正则都没配置时选中所有词；
/// 配置了但为空的词表不选中任何词。
#[derive(Debug, Clone, Default)]
pub struct WordSelector {
    words: Option<FxHashSet<Word>>,
    pattern: Option<Regex>,
}

impl WordSelector {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: Some(words.into_iter().map(|w| Word::from(w.as_ref())).collect()),
            pattern: None,
        }
    }

    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// - `selected-words`：词表文件，每行一个词（`#` 开头为注释）
    /// - `selection-pattern`：正则，整词匹配
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        let mut selector = match params.raw("selected-words") {
            Some(path) => Self::from_words(read_word_list(Path::new(path))?),
            None => Self::all(),
        };
        if let Some(pattern) = params.raw("selection-pattern") {
            let anchored = format!("^(?:{pattern})$");
            let regex = Regex::new(&anchored)
                .map_err(|e| DocentError::invalid("selection-pattern", pattern, e.to_string()))?;
            selector = selector.with_pattern(regex);
        }
        Ok(selector)
    }

    pub fn selects_all(&self) -> bool {
        self.words.is_none() && self.pattern.is_none()
    }

    pub fn selects(&self, word: &str) -> bool {
        self.selects_all()
            || self.words.as_ref().is_some_and(|words| words.contains(word))
            || self.pattern.as_ref().is_some_and(|re| re.is_match(word))
    }

    pub fn select<'a>(&self, words: impl IntoIterator<Item = &'a Word>) -> Vec<Word> {
        words.into_iter().filter(|w| self.selects(w)).cloned().collect()
    }
}

fn read_word_list(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|e| DocentError::io(path, e))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectedLmState {
    sentences: Vec<Float>,
    total: Float,
}

impl SelectedLmState {
    pub fn sentence(&self, sentno: usize) -> Float {
        self.sentences[sentno]
    }

    pub fn total(&self) -> Float {
        self.total
    }
}

#[derive(Debug, Clone)]
pub struct SelectedLmModifications {
    sentences: Vec<(usize, Float)>,
    total: Float,
}

pub struct SelectedWordLm<M> {
    model: M,
    selector: WordSelector,
}

impl<M: NgramModel> SelectedWordLm<M> {
    pub fn new(model: M, selector: WordSelector) -> Self {
        Self { model, selector }
    }

    pub fn selector(&self) -> &WordSelector {
        &self.selector
    }

    pub fn score_words(&self, words: &[Word]) -> Float {
        self.model.score_sentence(&self.selector.select(words))
    }
}

/// 按句子顺序求和，保证增量与从头计算得到完全相同的浮点结果。
fn sum_in_order(sentences: &[Float]) -> Float {
    sentences.iter().sum()
}

impl<M: NgramModel> FeatureFunction for SelectedWordLm<M> {
    type State = SelectedLmState;
    type Modifications = SelectedLmModifications;

    fn init_document(&self, doc: &DocumentState, scores: &mut [Float]) -> SelectedLmState {
        let sentences: Vec<Float> = (0..doc.sentence_count())
            .map(|sentno| self.score_words(&doc.target_words(sentno)))
            .collect();
        let total = sum_in_order(&sentences);
        scores[0] = total;
        SelectedLmState { sentences, total }
    }

    fn compute_sentence_scores(&self, doc: &DocumentState, sentno: usize, scores: &mut [Float]) {
        scores[0] = self.score_words(&doc.target_words(sentno));
    }

    fn estimate_score_update(
        &self,
        doc: &DocumentState,
        step: &SearchStep,
        state: &SelectedLmState,
        _prev_scores: &[Float],
        scores: &mut [Float],
    ) -> SelectedLmModifications {
        let changed: Vec<(usize, Float)> = step
            .affected_sentences()
            .into_iter()
            .map(|sentno| (sentno, self.score_words(&step.target_words_after(doc, sentno))))
            .collect();
        let mut sentences = state.sentences.clone();
        for &(sentno, score) in &changed {
            sentences[sentno] = score;
        }
        let total = sum_in_order(&sentences);
        scores[0] = total;
        SelectedLmModifications {
            sentences: changed,
            total,
        }
    }

    fn apply_state_modifications(
        &self,
        mut state: SelectedLmState,
        modifications: SelectedLmModifications,
    ) -> SelectedLmState {
        for (sentno, score) in modifications.sentences {
            state.sentences[sentno] = score;
        }
        state.total = modifications.total;
        state
    }

    fn number_of_scores(&self) -> usize {
        1
    }
}
