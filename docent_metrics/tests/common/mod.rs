#![allow(dead_code)]

use docent_core::{
    AnchoredPhrasePair, DocumentState, FeatureFunction, Float, Modification, MoveKind, Phrase, PhrasePair,
    SearchStep, Span, Word,
};
use proptest::prelude::*;

pub const VOCAB: &[&str] = &["the", "cat", "sat", "on", "a", "mat", "dog", "ran"];

pub fn words(text: &str) -> Vec<Word> {
    text.split_whitespace().map(Word::from).collect()
}

pub fn pair(span: Span, target: &str) -> AnchoredPhrasePair {
    AnchoredPhrasePair::new(span, PhrasePair::new(Phrase::from_text("src"), Phrase::from_text(target)))
}

/// 由一组编辑“处方”在当前文档上生成具体的 step（位置按当前大小取模）。
#[derive(Debug, Clone)]
pub enum Edit {
    Retranslate { sent: usize, pos: usize, target: Vec<&'static str> },
    Swap { sent: usize, a: usize, b: usize },
    Merge { sent: usize, pos: usize },
}

impl Edit {
    pub fn to_step(&self, doc: &DocumentState) -> Option<SearchStep> {
        let n = doc.sentence_count();
        if n == 0 {
            return None;
        }
        match self {
            Edit::Retranslate { sent, pos, target } => {
                let sentno = sent % n;
                let seg = doc.segmentation(sentno);
                if seg.is_empty() {
                    return None;
                }
                let i = pos % seg.len();
                let replacement = pair(seg[i].span, &target.join(" "));
                Some(SearchStep::new(
                    MoveKind::ChangeTranslation,
                    vec![Modification::new(sentno, i, i + 1, vec![replacement])],
                ))
            }
            Edit::Swap { sent, a, b } => {
                let sentno = sent % n;
                let seg = doc.segmentation(sentno);
                if seg.len() < 2 {
                    return None;
                }
                let (i, j) = (a % seg.len(), b % seg.len());
                if i == j {
                    return None;
                }
                let (i, j) = (i.min(j), i.max(j));
                Some(SearchStep::new(
                    MoveKind::Swap,
                    vec![
                        Modification::new(sentno, i, i + 1, vec![seg[j].clone()]),
                        Modification::new(sentno, j, j + 1, vec![seg[i].clone()]),
                    ],
                ))
            }
            Edit::Merge { sent, pos } => {
                let sentno = sent % n;
                let seg = doc.segmentation(sentno);
                if seg.len() < 2 {
                    return None;
                }
                let i = pos % (seg.len() - 1);
                let (left, right) = (&seg[i], &seg[i + 1]);
                if left.span.end != right.span.start {
                    return None;
                }
                let target: Vec<&str> = left.target().iter().chain(right.target()).map(|w| &**w).collect();
                let merged = pair(Span::new(left.span.start, right.span.end), &target.join(" "));
                Some(SearchStep::new(
                    MoveKind::Resegment,
                    vec![Modification::new(sentno, i, i + 2, vec![merged])],
                ))
            }
        }
    }
}

pub fn target() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(prop::sample::select(VOCAB), 0..3)
}

pub fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (any::<usize>(), any::<usize>(), target())
            .prop_map(|(sent, pos, target)| Edit::Retranslate { sent, pos, target }),
        (any::<usize>(), any::<usize>(), any::<usize>()).prop_map(|(sent, a, b)| Edit::Swap { sent, a, b }),
        (any::<usize>(), any::<usize>()).prop_map(|(sent, pos)| Edit::Merge { sent, pos }),
    ]
}

pub fn sentences(count: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop::collection::vec(prop::sample::select(VOCAB), 1..8).prop_map(|ws| ws.join(" ")),
        count,
    )
}

/// 逐步 estimate + commit，同时把 step 写回文档；返回最终状态与最后一次推测分数。
pub fn replay<F: FeatureFunction>(
    feature: &F,
    doc: &mut DocumentState,
    edits: &[Edit],
) -> (F::State, Float) {
    let mut scores = vec![0.0; feature.number_of_scores()];
    let mut state = feature.init_document(doc, &mut scores);
    for edit in edits {
        let Some(step) = edit.to_step(doc) else {
            continue;
        };
        if step.validate(doc).is_err() {
            continue;
        }
        let prev = scores.clone();
        let mods = feature.estimate_score_update(doc, &step, &state, &prev, &mut scores);
        let mods = feature.update_score(doc, &step, &state, mods, &prev, &mut scores);
        state = feature.apply_state_modifications(state, mods);
        doc.apply_step(&step).expect("validated step applies");
    }
    (state, scores[0])
}
