//! ARPA 文本格式的回退（back-off）n-gram 语言模型。
//!
//! 只实现查询所需的最小部分：`\data\` 头、各阶 `\N-grams:` 段、`\end\`。

use std::{fs, path::Path};

use docent_core::{DocentError, Float, Result, Word};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::info;

use crate::NgramModel;

pub const SENTENCE_START: &str = "<s>";
pub const SENTENCE_END: &str = "</s>";
pub const UNKNOWN: &str = "<unk>";
/// 模型里连 `<unk>` 都没有时，未知词的 log10 概率。
pub const UNKNOWN_LOG_PROB: Float = -100.0;

type Key = SmallVec<[Word; 4]>;

#[derive(Debug, Clone, Copy)]
struct Entry {
    log_prob: Float,
    backoff: Float,
}

#[derive(Debug, Default)]
pub struct ArpaModel {
    order: usize,
    entries: FxHashMap<Key, Entry>,
}

enum Section {
    Preamble,
    Data,
    Ngrams(usize),
    End,
}

impl ArpaModel {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| DocentError::io(path, e))?;
        let model = Self::parse(&text, path)?;
        info!(path = %path.display(), order = model.order, ngrams = model.entries.len(), "arpa model loaded");
        Ok(model)
    }

    /// 解析 ARPA 文本；`origin` 只用于错误信息。
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        let bad = |line: usize, reason: String| DocentError::ModelFormat {
            path: origin.to_path_buf(),
            line,
            reason,
        };
        let mut model = Self::default();
        let mut declared: Vec<(usize, usize)> = Vec::new();
        let mut section = Section::Preamble;

        for (idx, raw) in text.lines().enumerate() {
            let lineno = idx + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if line == "\\data\\" {
                section = Section::Data;
                continue;
            }
            if line == "\\end\\" {
                section = Section::End;
                continue;
            }
            if let Some(n) = line.strip_prefix('\\').and_then(|l| l.strip_suffix("-grams:")) {
                let n: usize = n
                    .parse()
                    .map_err(|_| bad(lineno, format!("bad section header {line:?}")))?;
                section = Section::Ngrams(n);
                continue;
            }
            match section {
                Section::Preamble | Section::End => {}
                Section::Data => {
                    let Some((n, count)) = line
                        .strip_prefix("ngram ")
                        .and_then(|rest| rest.split_once('='))
                    else {
                        return Err(bad(lineno, format!("expected `ngram N=count`, got {line:?}")));
                    };
                    let n = n.trim().parse::<usize>();
                    let count = count.trim().parse::<usize>();
                    let (Ok(n), Ok(count)) = (n, count) else {
                        return Err(bad(lineno, format!("bad ngram count line {line:?}")));
                    };
                    declared.push((n, count));
                }
                Section::Ngrams(n) => {
                    let fields: Vec<&str> = line.split_whitespace().collect();
                    if fields.len() != n + 1 && fields.len() != n + 2 {
                        return Err(bad(lineno, format!("expected {n} words, got {line:?}")));
                    }
                    let log_prob: Float = fields[0]
                        .parse()
                        .map_err(|_| bad(lineno, format!("bad probability {:?}", fields[0])))?;
                    let backoff: Float = match fields.get(n + 1) {
                        Some(b) => b
                            .parse()
                            .map_err(|_| bad(lineno, format!("bad back-off weight {b:?}")))?,
                        None => 0.0,
                    };
                    let key: Key = fields[1..=n].iter().map(|w| Word::from(*w)).collect();
                    model.entries.insert(key, Entry { log_prob, backoff });
                    model.order = model.order.max(n);
                }
            }
        }

        if declared.is_empty() {
            return Err(bad(0, "missing \\data\\ section".to_string()));
        }
        for (n, count) in declared {
            let found = model.entries.keys().filter(|k| k.len() == n).count();
            if found != count {
                return Err(bad(0, format!("header declares {count} {n}-grams, found {found}")));
            }
        }
        Ok(model)
    }

    fn entry(&self, key: &[Word]) -> Option<&Entry> {
        self.entries.get(key)
    }
}

impl NgramModel for ArpaModel {
    fn order(&self) -> usize {
        self.order
    }

    fn log_prob(&self, context: &[Word], word: &Word) -> Float {
        let keep = self.order.saturating_sub(1).min(context.len());
        let context = &context[context.len() - keep..];
        let mut key: Key = SmallVec::with_capacity(context.len() + 1);
        for start in 0..=context.len() {
            key.clear();
            key.extend(context[start..].iter().cloned());
            key.push(word.clone());
            if let Some(entry) = self.entry(&key) {
                let backoff: Float = (0..start)
                    .filter_map(|i| self.entry(&context[i..]))
                    .map(|e| e.backoff)
                    .sum();
                return entry.log_prob + backoff;
            }
        }
        self.entry(&[Word::from(UNKNOWN)])
            .map_or(UNKNOWN_LOG_PROB, |e| e.log_prob)
    }
}
