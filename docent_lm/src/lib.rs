//! `docent_lm`：选词语言模型 feature 及其工厂。
//!
//! 工厂只约定输入（`Parameters`）与输出（一个符合 `FeatureFunction` 契约的实例）；
//! 具体的 n-gram 查询实现通过 `NgramModel` 插拔，目前提供 ARPA 文本模型。
pub mod arpa;
pub mod selected_word;

use docent_core::{DocentError, Float, Parameters, Result, Word};
use tracing::info;

pub use arpa::ArpaModel;
pub use selected_word::{SelectedWordLm, WordSelector};

/// n-gram 语言模型查询接口（log10 概率）。
pub trait NgramModel: Send + Sync {
    fn order(&self) -> usize;

    /// `log10 P(word | context)`；`context` 按时间顺序排列，实现只看最后 `order - 1` 个词。
    fn log_prob(&self, context: &[Word], word: &Word) -> Float;

    /// 整句打分，两端补 `<s>` / `</s>`。
    fn score_sentence(&self, words: &[Word]) -> Float {
        let mut history: Vec<Word> = Vec::with_capacity(words.len() + 2);
        history.push(Word::from(arpa::SENTENCE_START));
        let end = Word::from(arpa::SENTENCE_END);
        let mut total = 0.0;
        for w in words.iter().chain(std::iter::once(&end)) {
            total += self.log_prob(&history, w);
            history.push(w.clone());
        }
        total
    }
}

impl NgramModel for Box<dyn NgramModel> {
    fn order(&self) -> usize {
        (**self).order()
    }

    fn log_prob(&self, context: &[Word], word: &Word) -> Float {
        (**self).log_prob(context, word)
    }

    fn score_sentence(&self, words: &[Word]) -> Float {
        (**self).score_sentence(words)
    }
}

pub struct SelectedWordLmFactory;

impl SelectedWordLmFactory {
    /// 参数：
    /// - `lm-file`（必需）：模型文件
    /// - `lm-type`：模型实现，目前只有 `arpa`（默认）
    /// - `selected-words` / `selection-pattern`：见 `WordSelector::from_parameters`
    pub fn create_ngram_model(params: &Parameters) -> Result<SelectedWordLm<Box<dyn NgramModel>>> {
        let lm_file: String = params.require("lm-file")?;
        let model: Box<dyn NgramModel> = match params.raw("lm-type").unwrap_or("arpa") {
            "arpa" => Box::new(ArpaModel::from_path(&lm_file)?),
            other => {
                return Err(DocentError::invalid("lm-type", other, "expected 'arpa'"));
            }
        };
        let selector = WordSelector::from_parameters(params)?;
        info!(lm_file = %lm_file, order = model.order(), selects_all = selector.selects_all(), "selected-word lm ready");
        Ok(SelectedWordLm::new(model, selector))
    }
}
