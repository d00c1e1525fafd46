//! 参考译文语料读取：每行一句，已分词（空白分隔）。

use std::{fs, path::Path};

use docent_core::{DocentError, Result, Word};

/// 一个句子的全部参考译文。
pub type ReferenceSet = Vec<Vec<Word>>;

pub fn tokenize(line: &str) -> Vec<Word> {
    line.split_whitespace().map(Word::from).collect()
}

/// 读取一个分词文件，每行一句。
pub fn read_tokenized(path: impl AsRef<Path>) -> Result<Vec<Vec<Word>>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| DocentError::io(path, e))?;
    Ok(text.lines().map(tokenize).collect())
}

/// 读取多份平行的参考文件，转置为“每句一组参考”。
///
/// 各文件行数必须一致，否则视为语料错误。
pub fn load_references<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<ReferenceSet>> {
    let Some((first, rest)) = paths.split_first() else {
        return Err(DocentError::Corpus("no reference file given".to_string()));
    };
    let first: &Path = first.as_ref();
    let mut sets: Vec<ReferenceSet> = read_tokenized(first)?
        .into_iter()
        .map(|sentence| vec![sentence])
        .collect();
    for path in rest {
        let path: &Path = path.as_ref();
        let lines = read_tokenized(path)?;
        if lines.len() != sets.len() {
            return Err(DocentError::Corpus(format!(
                "{} has {} sentences, {} has {}",
                first.display(),
                sets.len(),
                path.display(),
                lines.len()
            )));
        }
        for (set, sentence) in sets.iter_mut().zip(lines) {
            set.push(sentence);
        }
    }
    Ok(sets)
}
