//! `SearchStep`：一次候选编辑的描述（由搜索驱动构造，feature 只读）。
//!
//! 约定：
//! - 每个 `Modification` 把某句切分中的 `[from, to)` 替换为 `proposal`
//! - 同一句的多个 modification 都以**编辑前**的切分为坐标，且互不重叠
//! - `MoveKind` 是封闭枚举，feature 通过穷尽匹配决定是否可以走捷径

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{
    error::{DocentError, Result},
    model::{AnchoredPhrasePair, DocumentState, Word, check_segmentation},
};

/// 编辑的语义类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoveKind {
    /// 替换某个短语对的目标翻译
    ChangeTranslation,
    /// 重新切分一段源句（短语对的集合会变）
    Resegment,
    /// 交换两个短语对的位置
    Swap,
    /// 在一个区间内重排短语对
    Permute,
}

impl MoveKind {
    /// 纯调序：整个 step 不改变文档中短语对的多重集合。
    pub fn is_rearrangement(self) -> bool {
        match self {
            MoveKind::Swap | MoveKind::Permute => true,
            MoveKind::ChangeTranslation | MoveKind::Resegment => false,
        }
    }
}

/// 原子修改：把 `sentno` 句切分中的 `[from, to)` 替换为 `proposal`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification {
    pub sentno: usize,
    pub from: usize,
    pub to: usize,
    pub proposal: Vec<AnchoredPhrasePair>,
}

impl Modification {
    pub fn new(sentno: usize, from: usize, to: usize, proposal: Vec<AnchoredPhrasePair>) -> Self {
        Self {
            sentno,
            from,
            to,
            proposal,
        }
    }

    /// 在 `segmentation` 中被替换掉的短语对。
    pub fn removed<'a>(&self, segmentation: &'a [AnchoredPhrasePair]) -> &'a [AnchoredPhrasePair] {
        &segmentation[self.from..self.to]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStep {
    pub kind: MoveKind,
    /// 仅用于日志/调试，不参与任何判断
    #[serde(default)]
    pub description: String,
    pub modifications: Vec<Modification>,
}

impl SearchStep {
    pub fn new(kind: MoveKind, modifications: Vec<Modification>) -> Self {
        Self {
            kind,
            description: String::new(),
            modifications,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// 受影响的句子编号（升序、去重）。
    pub fn affected_sentences(&self) -> Vec<usize> {
        self.modifications
            .iter()
            .map(|m| m.sentno)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// 某句的 modifications，按 `from` 排序（相同 `from` 保持原顺序）。
    fn sorted_for(&self, sentno: usize) -> Vec<&Modification> {
        let mut mods: Vec<&Modification> =
            self.modifications.iter().filter(|m| m.sentno == sentno).collect();
        mods.sort_by_key(|m| m.from);
        mods
    }

    /// 检查 step 是否能作用于 `doc`：句号与区间越界、同句区间重叠、
    /// 以及编辑后的切分不再覆盖整句，都会报错。
    pub fn validate(&self, doc: &DocumentState) -> Result<()> {
        for sentno in self.affected_sentences() {
            let len = doc.segmentations().get(sentno).map(Vec::len);
            let mut prev_to = 0;
            for m in self.sorted_for(sentno) {
                if len.filter(|&len| m.from <= m.to && m.to <= len).is_none() {
                    return Err(DocentError::ModificationOutOfRange {
                        sentno,
                        from: m.from,
                        to: m.to,
                        len: len.unwrap_or(0),
                    });
                }
                if m.from < prev_to {
                    return Err(DocentError::OverlappingModifications { sentno, at: m.from });
                }
                prev_to = m.to;
            }
            check_segmentation(sentno, doc.source_length(sentno), self.sentence_after(doc, sentno))?;
        }
        if self.kind.is_rearrangement() {
            self.check_rearrangement(doc)?;
        }
        Ok(())
    }

    /// 调序 step 放回的短语对必须恰好是它取走的那些（多重集合相等）。
    fn check_rearrangement(&self, doc: &DocumentState) -> Result<()> {
        let mut balance: FxHashMap<&AnchoredPhrasePair, isize> = FxHashMap::default();
        for m in &self.modifications {
            for app in m.removed(doc.segmentation(m.sentno)) {
                *balance.entry(app).or_default() += 1;
            }
            for app in &m.proposal {
                *balance.entry(app).or_default() -= 1;
            }
        }
        if balance.values().any(|&n| n != 0) {
            return Err(DocentError::InvalidRearrangement { kind: self.kind });
        }
        Ok(())
    }

    /// 应用本 step 之后 `sentno` 句的短语对序列（不修改文档）。
    ///
    /// 调用前 step 必须已通过 `validate`；否则区间越界会 panic。
    pub fn sentence_after<'a>(
        &'a self,
        doc: &'a DocumentState,
        sentno: usize,
    ) -> Vec<&'a AnchoredPhrasePair> {
        let seg = doc.segmentation(sentno);
        let mut out = Vec::with_capacity(seg.len());
        let mut cursor = 0;
        for m in self.sorted_for(sentno) {
            out.extend(&seg[cursor..m.from]);
            out.extend(&m.proposal);
            cursor = m.to;
        }
        out.extend(&seg[cursor..]);
        out
    }

    /// 应用本 step 之后 `sentno` 句的目标词序列。
    pub fn target_words_after(&self, doc: &DocumentState, sentno: usize) -> Vec<Word> {
        self.sentence_after(doc, sentno)
            .into_iter()
            .flat_map(|app| app.target().iter().cloned())
            .collect()
    }
}
