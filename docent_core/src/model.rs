//! 文档模型：句子 -> 短语切分 -> 锚定短语对 -> 目标词序列。
//!
//! 约定：
//! - `Span` 是源句词位置的半开区间 `[start, end)`
//! - 一个句子的 `PhraseSegmentation` 按目标语序排列，源区间互不重叠且覆盖整句
//! - `DocumentState` 归搜索驱动独占；feature 只通过 `&DocumentState` 读取

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    error::{DocentError, Result},
    search_step::SearchStep,
};

/// 目标词表中的一个词（共享字符串，clone 很便宜）。
pub type Word = Arc<str>;

/// 有序词序列。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Phrase(Vec<Word>);

impl Phrase {
    pub fn new(words: Vec<Word>) -> Self {
        Self(words)
    }

    /// 按空白切分文本。
    pub fn from_text(text: &str) -> Self {
        Self(text.split_whitespace().map(Word::from).collect())
    }

    pub fn words(&self) -> &[Word] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Phrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, w) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(w)?;
        }
        Ok(())
    }
}

/// 源短语 + 目标短语（翻译选项）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhrasePair {
    pub source: Phrase,
    pub target: Phrase,
}

impl PhrasePair {
    pub fn new(source: Phrase, target: Phrase) -> Self {
        Self { source, target }
    }
}

/// 源句词位置区间 `[start, end)`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// 锚定短语对：源句区间 + 当前选中的目标短语。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnchoredPhrasePair {
    pub span: Span,
    pub pair: Arc<PhrasePair>,
}

impl AnchoredPhrasePair {
    pub fn new(span: Span, pair: PhrasePair) -> Self {
        Self {
            span,
            pair: Arc::new(pair),
        }
    }

    pub fn target(&self) -> &[Word] {
        self.pair.target.words()
    }
}

/// 一个源句的短语切分。
pub type PhraseSegmentation = Vec<AnchoredPhrasePair>;

/// 检查切分不变量：各区间非空、互不重叠，合起来恰好覆盖 `[0, source_length)`。
///
/// 切分按目标语序排列，源区间可以乱序（调序），所以这里按 `start` 排序后再检查。
pub fn check_segmentation<'a, I>(sentno: usize, source_length: usize, segmentation: I) -> Result<()>
where
    I: IntoIterator<Item = &'a AnchoredPhrasePair>,
{
    let mut spans: Vec<(usize, Span)> = segmentation.into_iter().map(|app| app.span).enumerate().collect();
    spans.sort_by_key(|(_, span)| span.start);
    let mut expected = 0;
    for (i, span) in spans {
        if span.is_empty() {
            return Err(DocentError::InvalidSegmentation {
                sentno,
                reason: format!("phrase pair {i} has an empty source span"),
            });
        }
        if span.start != expected {
            return Err(DocentError::InvalidSegmentation {
                sentno,
                reason: format!(
                    "phrase pair {i} starts at {} but the covered prefix ends at {expected}",
                    span.start
                ),
            });
        }
        expected = span.end;
    }
    if expected != source_length {
        return Err(DocentError::InvalidSegmentation {
            sentno,
            reason: format!("phrase pairs cover {expected} of {source_length} source words"),
        });
    }
    Ok(())
}

/// 整个文档：每个源句一个短语切分。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentState {
    /// 每个源句的词数；编辑后的切分必须仍然恰好覆盖它
    source_lengths: Vec<usize>,
    segmentations: Vec<PhraseSegmentation>,
}

impl DocumentState {
    /// 源句长度取各切分覆盖到的最远位置。
    pub fn new(segmentations: Vec<PhraseSegmentation>) -> Result<Self> {
        let source_lengths = segmentations
            .iter()
            .map(|seg| seg.iter().map(|app| app.span.end).max().unwrap_or(0))
            .collect();
        Self::with_source_lengths(source_lengths, segmentations)
    }

    /// 显式给出源句长度（例如来自源语文件）。
    pub fn with_source_lengths(source_lengths: Vec<usize>, segmentations: Vec<PhraseSegmentation>) -> Result<Self> {
        if source_lengths.len() != segmentations.len() {
            return Err(DocentError::SentenceCountMismatch {
                feature: "document".to_string(),
                expected: source_lengths.len(),
                actual: segmentations.len(),
            });
        }
        for (sentno, (&len, seg)) in source_lengths.iter().zip(&segmentations).enumerate() {
            check_segmentation(sentno, len, seg)?;
        }
        Ok(Self {
            source_lengths,
            segmentations,
        })
    }

    /// 由已分词的目标句构造文档：每个词是一个单词短语对，源区间与目标位置一一对应。
    pub fn from_target_sentences<S: AsRef<str>>(sentences: &[S]) -> Self {
        let segmentations: Vec<PhraseSegmentation> = sentences
            .iter()
            .map(|s| {
                s.as_ref()
                    .split_whitespace()
                    .enumerate()
                    .map(|(i, w)| {
                        let phrase = Phrase::new(vec![Word::from(w)]);
                        AnchoredPhrasePair::new(
                            Span::new(i, i + 1),
                            PhrasePair::new(phrase.clone(), phrase),
                        )
                    })
                    .collect()
            })
            .collect();
        Self {
            source_lengths: segmentations.iter().map(Vec::len).collect(),
            segmentations,
        }
    }

    pub fn segmentations(&self) -> &[PhraseSegmentation] {
        &self.segmentations
    }

    pub fn segmentation(&self, sentno: usize) -> &[AnchoredPhrasePair] {
        &self.segmentations[sentno]
    }

    pub fn source_length(&self, sentno: usize) -> usize {
        self.source_lengths[sentno]
    }

    pub fn sentence_count(&self) -> usize {
        self.segmentations.len()
    }

    /// 某句当前的目标词序列。
    pub fn target_words(&self, sentno: usize) -> Vec<Word> {
        self.segmentations[sentno]
            .iter()
            .flat_map(|app| app.target().iter().cloned())
            .collect()
    }

    /// 文档侧提交：把一个已被接受的编辑写回文档。
    ///
    /// 先整体校验（`SearchStep::validate`），失败时文档保持不变。
    pub fn apply_step(&mut self, step: &SearchStep) -> Result<()> {
        step.validate(self)?;
        let rebuilt: Vec<(usize, PhraseSegmentation)> = step
            .affected_sentences()
            .into_iter()
            .map(|sentno| {
                let seg = step.sentence_after(self, sentno).into_iter().cloned().collect();
                (sentno, seg)
            })
            .collect();
        for (sentno, seg) in rebuilt {
            self.segmentations[sentno] = seg;
        }
        Ok(())
    }
}
