//! n-gram 计数与截断（clipping）。

use docent_core::Word;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// n-gram 键；阶数一般不超过 4，放在栈上。
pub type Ngram = SmallVec<[Word; 4]>;
pub type NgramCounts = FxHashMap<Ngram, usize>;

/// 统计 `words` 中 1..=max_order 阶的所有 n-gram。
pub fn ngram_counts(words: &[Word], max_order: usize) -> NgramCounts {
    let mut counts = NgramCounts::default();
    for n in 1..=max_order.min(words.len()) {
        for window in words.windows(n) {
            *counts.entry(window.iter().cloned().collect()).or_default() += 1;
        }
    }
    counts
}

/// 多参考译文：逐 n-gram 取最大计数。
pub fn merge_max(into: &mut NgramCounts, other: NgramCounts) {
    for (ngram, count) in other {
        let slot = into.entry(ngram).or_default();
        *slot = (*slot).max(count);
    }
}

/// 截断计数：候选计数以参考计数为上限；参考中没有的 n-gram 截断为 0（不出现在结果里）。
pub fn clip(candidate: &NgramCounts, reference: &NgramCounts) -> NgramCounts {
    candidate
        .iter()
        .filter_map(|(ngram, &count)| {
            let limit = reference.get(ngram).copied().unwrap_or(0);
            let clipped = count.min(limit);
            (clipped > 0).then(|| (ngram.clone(), clipped))
        })
        .collect()
}

/// 按阶汇总的统计量：截断后匹配数、候选 n-gram 总数、候选长度。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NgramStats {
    pub matches: Vec<usize>,
    pub totals: Vec<usize>,
    pub length: usize,
}

impl NgramStats {
    pub fn zero(max_order: usize) -> Self {
        Self {
            matches: vec![0; max_order],
            totals: vec![0; max_order],
            length: 0,
        }
    }

    /// 单句统计：`words` 对照该句参考 n-gram 表。
    pub fn for_sentence(words: &[Word], reference: &NgramCounts, max_order: usize) -> Self {
        let candidate = ngram_counts(words, max_order);
        let mut stats = Self::zero(max_order);
        stats.length = words.len();
        for (ngram, count) in &candidate {
            stats.totals[ngram.len() - 1] += count;
        }
        for (ngram, count) in clip(&candidate, reference) {
            stats.matches[ngram.len() - 1] += count;
        }
        stats
    }

    pub fn order(&self) -> usize {
        self.totals.len()
    }

    pub fn add(&mut self, other: &Self) {
        for (a, b) in self.matches.iter_mut().zip(&other.matches) {
            *a += b;
        }
        for (a, b) in self.totals.iter_mut().zip(&other.totals) {
            *a += b;
        }
        self.length += other.length;
    }

    /// 减去一个先前加进来的贡献。
    pub fn subtract(&mut self, other: &Self) {
        for (a, b) in self.matches.iter_mut().zip(&other.matches) {
            *a -= b;
        }
        for (a, b) in self.totals.iter_mut().zip(&other.totals) {
            *a -= b;
        }
        self.length -= other.length;
    }
}
