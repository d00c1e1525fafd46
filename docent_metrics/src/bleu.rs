//! `BleuModel`：与参考译文的 n-gram 重合度（BLEU 形式）。
//!
//! 增量策略：状态里保存每句的按阶统计量（截断匹配数 / 候选数 / 长度）以及全文档汇总；
//! 一个 step 只重算受影响的句子，汇总量做“减旧加新”，不重扫整个文档。
//!
//! 截断是逐句的（候选计数以该句参考计数为上限），所以最小的可加单位是句子，
//! 而不是被替换的短语区间。

use docent_core::{
    DocentError, DocumentState, FeatureFunction, Float, Parameters, Result, SearchStep, Word,
};
use tracing::info;

use crate::{
    corpus::{ReferenceSet, load_references},
    ngram::{NgramCounts, NgramStats, merge_max, ngram_counts},
};

pub const DEFAULT_MAX_ORDER: usize = 4;
pub const DEFAULT_SMOOTHING_FLOOR: Float = 0.1;

/// 某阶匹配数为 0 时的处理方式。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Smoothing {
    /// 匹配数 0 按一个固定的小值计
    Floor(Float),
    /// 2 阶及以上分子分母各加一；一阶只在匹配数为 0 时加一
    AddOne,
}

impl Smoothing {
    fn from_parameters(params: &Parameters) -> Result<Self> {
        let floor = params.get_or("smoothing-floor", DEFAULT_SMOOTHING_FLOOR)?;
        if !(floor > 0.0 && floor.is_finite()) {
            return Err(DocentError::invalid(
                "smoothing-floor",
                &floor.to_string(),
                "must be a positive number",
            ));
        }
        match params.raw("smoothing").unwrap_or("floor") {
            "floor" => Ok(Self::Floor(floor)),
            "add-one" => Ok(Self::AddOne),
            other => Err(DocentError::invalid(
                "smoothing",
                other,
                "expected one of: 'floor', 'add-one'",
            )),
        }
    }

    /// 第 `n` 阶（0 起）的精度；调用方保证 `total > 0`。
    fn precision(self, n: usize, matches: usize, total: usize) -> Float {
        let (m, t) = (matches as Float, total as Float);
        match self {
            Smoothing::Floor(floor) if matches == 0 => floor / t,
            Smoothing::Floor(_) => m / t,
            Smoothing::AddOne if n > 0 || matches == 0 => (m + 1.0) / (t + 1.0),
            Smoothing::AddOne => m / t,
        }
    }
}

/// 由按阶统计量与参考长度计算 BLEU。
///
/// - 候选长度为 0：返回 0（不代入公式）
/// - 全文档都没有某阶 n-gram（句子都比该阶短）：该阶不参与几何平均
pub fn bleu(stats: &NgramStats, reference_length: usize, smoothing: Smoothing) -> Float {
    if stats.length == 0 {
        return 0.0;
    }
    let mut log_sum = 0.0;
    let mut used = 0;
    for (n, (&m, &t)) in stats.matches.iter().zip(&stats.totals).enumerate() {
        if t == 0 {
            continue;
        }
        log_sum += smoothing.precision(n, m, t).ln();
        used += 1;
    }
    if used == 0 {
        return 0.0;
    }
    let ratio = reference_length as Float / stats.length as Float;
    let brevity_penalty = (1.0 - ratio).exp().min(1.0);
    brevity_penalty * (log_sum / used as Float).exp()
}

#[derive(Debug, Clone, PartialEq)]
pub struct BleuState {
    sentences: Vec<NgramStats>,
    totals: NgramStats,
}

impl BleuState {
    pub fn totals(&self) -> &NgramStats {
        &self.totals
    }

    pub fn sentence(&self, sentno: usize) -> &NgramStats {
        &self.sentences[sentno]
    }
}

/// 只携带变化的句子与新的汇总量；提交时整体移交。
#[derive(Debug, Clone)]
pub struct BleuModifications {
    sentences: Vec<(usize, NgramStats)>,
    totals: NgramStats,
}

pub struct BleuModel {
    max_order: usize,
    smoothing: Smoothing,
    reference_length: usize,
    reference_lengths: Vec<usize>,
    reference_ngram_counts: Vec<NgramCounts>,
}

impl BleuModel {
    /// 参数：
    /// - `reference-file`（必需，逗号分隔多份参考）
    /// - `max-order`（默认 4）
    /// - `smoothing`（`floor` | `add-one`）、`smoothing-floor`（默认 0.1）
    pub fn new(params: &Parameters) -> Result<Self> {
        let files = params.list("reference-file");
        if files.is_empty() {
            return Err(DocentError::MissingParameter {
                key: "reference-file".to_string(),
            });
        }
        let references = load_references(&files)?;
        let model = Self::from_references(
            references,
            params.get_or("max-order", DEFAULT_MAX_ORDER)?,
            Smoothing::from_parameters(params)?,
        )?;
        info!(
            files = files.len(),
            sentences = model.reference_lengths.len(),
            reference_length = model.reference_length,
            max_order = model.max_order,
            "bleu references loaded"
        );
        Ok(model)
    }

    /// 由内存中的参考译文构造（每句一组参考）。
    ///
    /// 多参考时：n-gram 上限取各参考的最大计数，参考长度取最短的一份。
    pub fn from_references(
        references: Vec<ReferenceSet>,
        max_order: usize,
        smoothing: Smoothing,
    ) -> Result<Self> {
        if max_order == 0 {
            return Err(DocentError::invalid("max-order", "0", "must be at least 1"));
        }
        let mut reference_lengths = Vec::with_capacity(references.len());
        let mut reference_ngram_counts = Vec::with_capacity(references.len());
        for (sentno, set) in references.iter().enumerate() {
            let Some(shortest) = set.iter().map(Vec::len).min() else {
                return Err(DocentError::Corpus(format!(
                    "sentence {sentno} has no reference translation"
                )));
            };
            let mut counts = NgramCounts::default();
            for reference in set {
                merge_max(&mut counts, ngram_counts(reference, max_order));
            }
            reference_lengths.push(shortest);
            reference_ngram_counts.push(counts);
        }
        Ok(Self {
            max_order,
            smoothing,
            reference_length: reference_lengths.iter().sum(),
            reference_lengths,
            reference_ngram_counts,
        })
    }

    pub fn max_order(&self) -> usize {
        self.max_order
    }

    pub fn reference_length(&self) -> usize {
        self.reference_length
    }

    /// 单句候选的截断统计。
    pub fn sentence_stats(&self, sentno: usize, words: &[Word]) -> NgramStats {
        NgramStats::for_sentence(words, &self.reference_ngram_counts[sentno], self.max_order)
    }

    pub fn score(&self, totals: &NgramStats) -> Float {
        bleu(totals, self.reference_length, self.smoothing)
    }
}

impl FeatureFunction for BleuModel {
    type State = BleuState;
    type Modifications = BleuModifications;

    fn check_document(&self, doc: &DocumentState) -> Result<()> {
        if doc.sentence_count() != self.reference_lengths.len() {
            return Err(DocentError::SentenceCountMismatch {
                feature: "bleu".to_string(),
                expected: self.reference_lengths.len(),
                actual: doc.sentence_count(),
            });
        }
        Ok(())
    }

    fn init_document(&self, doc: &DocumentState, scores: &mut [Float]) -> BleuState {
        let mut totals = NgramStats::zero(self.max_order);
        let sentences: Vec<NgramStats> = (0..doc.sentence_count())
            .map(|sentno| {
                let stats = self.sentence_stats(sentno, &doc.target_words(sentno));
                totals.add(&stats);
                stats
            })
            .collect();
        scores[0] = self.score(&totals);
        BleuState { sentences, totals }
    }

    fn compute_sentence_scores(&self, doc: &DocumentState, sentno: usize, scores: &mut [Float]) {
        let stats = self.sentence_stats(sentno, &doc.target_words(sentno));
        scores[0] = bleu(&stats, self.reference_lengths[sentno], self.smoothing);
    }

    // 调序 step 也照常重算：调序改变相邻关系，会影响 2 阶以上的匹配。
    fn estimate_score_update(
        &self,
        doc: &DocumentState,
        step: &SearchStep,
        state: &BleuState,
        _prev_scores: &[Float],
        scores: &mut [Float],
    ) -> BleuModifications {
        let mut totals = state.totals.clone();
        let sentences: Vec<(usize, NgramStats)> = step
            .affected_sentences()
            .into_iter()
            .map(|sentno| {
                let stats = self.sentence_stats(sentno, &step.target_words_after(doc, sentno));
                totals.subtract(&state.sentences[sentno]);
                totals.add(&stats);
                (sentno, stats)
            })
            .collect();
        scores[0] = self.score(&totals);
        BleuModifications { sentences, totals }
    }

    fn apply_state_modifications(&self, mut state: BleuState, modifications: BleuModifications) -> BleuState {
        for (sentno, stats) in modifications.sentences {
            state.sentences[sentno] = stats;
        }
        state.totals = modifications.totals;
        state
    }

    fn number_of_scores(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<Word> {
        text.split_whitespace().map(Word::from).collect()
    }

    #[test]
    fn zero_length_candidate_scores_zero() {
        assert_eq!(bleu(&NgramStats::zero(4), 3, Smoothing::Floor(0.1)), 0.0);
    }

    #[test]
    fn brevity_penalty_only_punishes_short_candidates() {
        let model = BleuModel::from_references(vec![vec![words("a b c d")]], 1, Smoothing::Floor(0.1)).unwrap();
        let short = model.sentence_stats(0, &words("a b"));
        let long = model.sentence_stats(0, &words("a b c d a"));
        assert!((bleu(&short, 4, Smoothing::Floor(0.1)) - (-1.0_f64).exp()).abs() < 1e-12);
        // 长候选：精度 4/5，无长度惩罚
        assert!((bleu(&long, 4, Smoothing::Floor(0.1)) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn add_one_smoothing_keeps_log_finite() {
        let model = BleuModel::from_references(vec![vec![words("x y z")]], 2, Smoothing::AddOne).unwrap();
        let stats = model.sentence_stats(0, &words("p q r"));
        let score = bleu(&stats, 3, Smoothing::AddOne);
        assert!(score.is_finite() && score > 0.0);
        // 一阶 (0+1)/(3+1)，二阶 (0+1)/(2+1)
        assert!((score - (0.25_f64 * (1.0 / 3.0)).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn multiple_references_clip_to_maximum_and_use_shortest_length() {
        let model = BleuModel::from_references(
            vec![vec![words("the the cat"), words("the cat sat on")]],
            1,
            Smoothing::Floor(0.1),
        )
        .unwrap();
        assert_eq!(model.reference_length(), 3);
        let stats = model.sentence_stats(0, &words("the the the"));
        assert_eq!(stats.matches, vec![2]);
    }

    #[test]
    fn bad_parameters_are_rejected() {
        assert!(matches!(
            BleuModel::new(&Parameters::new()),
            Err(DocentError::MissingParameter { .. })
        ));
        assert!(matches!(
            BleuModel::from_references(vec![vec![]], 4, Smoothing::AddOne),
            Err(DocentError::Corpus(_))
        ));
        let params = Parameters::new().with("smoothing", "laplace");
        assert!(matches!(
            Smoothing::from_parameters(&params),
            Err(DocentError::InvalidParameter { .. })
        ));
    }
}
