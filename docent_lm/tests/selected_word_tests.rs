use std::{env, fs, path::PathBuf, process};

use docent_core::{
    AnchoredPhrasePair, DocentError, DocumentState, FeatureFunction, FeatureSet, Modification, MoveKind, Parameters,
    Phrase, PhrasePair, SearchStep, Span, Word,
};
use docent_lm::{ArpaModel, NgramModel, SelectedWordLm, SelectedWordLmFactory, WordSelector};
use proptest::prelude::*;

const MODEL: &str = "\
\\data\\
ngram 1=6
ngram 2=3

\\1-grams:
-1.0\t<s>\t-0.4
-0.8\t</s>
-0.6\tcat\t-0.2
-0.9\tdog\t-0.3
-1.5\t<unk>
-1.1\tmat

\\2-grams:
-0.3\t<s> cat
-0.2\tcat </s>
-0.4\tdog </s>

\\end\\
";

fn scratch(name: &str, contents: &str) -> PathBuf {
    let path = env::temp_dir().join(format!("docent-lm-{}-{name}", process::id()));
    fs::write(&path, contents).unwrap();
    path
}

fn toy_model() -> ArpaModel {
    ArpaModel::parse(MODEL, std::path::Path::new("toy.arpa")).unwrap()
}

fn words(text: &str) -> Vec<Word> {
    text.split_whitespace().map(Word::from).collect()
}

#[test]
fn unselected_words_are_invisible_to_the_model() {
    let lm = SelectedWordLm::new(toy_model(), WordSelector::from_words(["cat", "dog"]));
    let model = toy_model();
    // "the" 和 "sat" 被过滤掉，等价于对 "cat" 打分
    assert_eq!(lm.score_words(&words("the cat sat")), model.score_sentence(&words("cat")));
    // P(cat|<s>) + P(</s>|cat)
    assert!((lm.score_words(&words("cat")) - (-0.3 - 0.2)).abs() < 1e-12);
}

#[test]
fn unknown_words_fall_back_to_unk() {
    let model = toy_model();
    let score = model.log_prob(&[Word::from("<s>")], &Word::from("zebra"));
    assert!((score - -1.5).abs() < 1e-12);
}

#[test]
fn factory_builds_a_conforming_feature() {
    let lm_file = scratch("model.arpa", MODEL);
    let list = scratch("selected.txt", "# content words\ncat\n\ndog\n");
    let params = Parameters::new()
        .with("lm-file", lm_file.display())
        .with("selected-words", list.display());
    let lm = SelectedWordLmFactory::create_ngram_model(&params).unwrap();
    assert_eq!(lm.number_of_scores(), 1);
    assert!(!lm.selector().selects_all());

    let mut set = FeatureSet::new();
    set.register("lm", lm, vec![1.0]).unwrap();
    let doc = DocumentState::from_target_sentences(&["the cat", "a dog"]);
    let scores = set.init_document(&doc).unwrap().to_vec();
    // "cat": P(cat|<s>) + P(</s>|cat)；"dog": bow(<s>) + P(dog) + P(</s>|dog)
    let expected = (-0.3 - 0.2) + (-0.4 - 0.9) + -0.4;
    assert!((scores[0] - expected).abs() < 1e-12);
    assert_eq!(set.sentence_scores(&doc, 0).len(), 1);

    fs::remove_file(lm_file).ok();
    fs::remove_file(list).ok();
}

#[test]
fn factory_rejects_bad_configuration() {
    assert!(matches!(
        SelectedWordLmFactory::create_ngram_model(&Parameters::new()),
        Err(DocentError::MissingParameter { .. })
    ));
    let params = Parameters::new().with("lm-file", "x.arpa").with("lm-type", "kenlm");
    assert!(matches!(
        SelectedWordLmFactory::create_ngram_model(&params),
        Err(DocentError::InvalidParameter { .. })
    ));
    let params = Parameters::new().with("lm-file", "/nonexistent/docent.arpa");
    assert!(matches!(
        SelectedWordLmFactory::create_ngram_model(&params),
        Err(DocentError::Io { .. })
    ));
}

#[test]
fn estimate_rescored_only_affected_sentences() {
    let lm = SelectedWordLm::new(toy_model(), WordSelector::all());
    let doc = DocumentState::from_target_sentences(&["cat", "dog mat"]);
    let mut scores = [0.0];
    let state = lm.init_document(&doc, &mut scores);

    let replacement = AnchoredPhrasePair::new(
        Span::new(0, 1),
        PhrasePair::new(Phrase::from_text("src"), Phrase::from_text("dog")),
    );
    let step = SearchStep::new(
        MoveKind::ChangeTranslation,
        vec![Modification::new(0, 0, 1, vec![replacement])],
    );
    let mut estimated = [0.0];
    let mods = lm.estimate_score_update(&doc, &step, &state, &scores, &mut estimated);
    let next = lm.apply_state_modifications(state.clone(), mods);
    assert_eq!(next.sentence(1), state.sentence(1));
    assert_ne!(next.sentence(0), state.sentence(0));
    assert_eq!(next.total(), estimated[0]);
}

const VOCAB: &[&str] = &["cat", "dog", "mat", "the", "zebra"];

proptest! {
    #[test]
    fn incremental_state_matches_batch(
        hyps in prop::collection::vec(
            prop::collection::vec(prop::sample::select(VOCAB), 1..6).prop_map(|w| w.join(" ")),
            1..4,
        ),
        edits in prop::collection::vec((any::<usize>(), any::<usize>(), prop::sample::select(VOCAB)), 0..15),
    ) {
        let lm = SelectedWordLm::new(toy_model(), WordSelector::from_words(["cat", "dog", "zebra"]));
        let mut doc = DocumentState::from_target_sentences(&hyps);
        let mut scores = [0.0];
        let mut state = lm.init_document(&doc, &mut scores);
        for (sent, pos, word) in edits {
            let sentno = sent % doc.sentence_count();
            let i = pos % doc.segmentation(sentno).len();
            let span = doc.segmentation(sentno)[i].span;
            let app = AnchoredPhrasePair::new(
                span,
                PhrasePair::new(Phrase::from_text("src"), Phrase::from_text(word)),
            );
            let step = SearchStep::new(MoveKind::ChangeTranslation, vec![Modification::new(sentno, i, i + 1, vec![app])]);
            let prev = scores;
            let mods = lm.estimate_score_update(&doc, &step, &state, &prev, &mut scores);
            state = lm.apply_state_modifications(state, mods);
            doc.apply_step(&step).unwrap();
        }
        let mut batch = [0.0];
        prop_assert_eq!(&state, &lm.init_document(&doc, &mut batch));
        prop_assert_eq!(scores, batch);
    }
}
