mod config;

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use docent_core::{DocumentState, FeatureSet, SearchStep};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

const DEFAULT_FILTER: &str = "docent_core=info,docent_metrics=info,docent_lm=info,docent_cli=info";

#[derive(Parser)]
#[command(name = "docent", about = "文档级特征打分：装配 feature，给文档打分并可回放编辑序列", version)]
struct Cli {
    /// feature 配置（JSON）
    #[arg(long)]
    config: PathBuf,
    /// 已分词的译文，每行一句
    #[arg(long)]
    input: PathBuf,
    /// 要回放的编辑序列（`SearchStep` 的 JSON 数组）
    #[arg(long)]
    steps: Option<PathBuf>,
    /// 回放时接受所有编辑，而不是只接受不降低总分的编辑
    #[arg(long)]
    accept_all: bool,
    /// 额外输出逐句分数
    #[arg(long)]
    sentences: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)))
        .init();

    let cli = Cli::parse();
    let config = Config::from_path(&cli.config)?;
    let mut features = config.build_feature_set()?;
    let mut doc = read_document(&cli.input)?;
    info!(sentences = doc.sentence_count(), input = %cli.input.display(), "document loaded");

    features.init_document(&doc).context("initialising features")?;
    let mut out = io::stdout().lock();
    writeln!(out, "initial")?;
    report(&mut out, &features, &doc, cli.sentences)?;

    if let Some(path) = &cli.steps {
        let steps = read_steps(path)?;
        let accepted = replay(&mut features, &mut doc, &steps, cli.accept_all)?;
        writeln!(out, "replayed {} steps, accepted {accepted}", steps.len())?;
        report(&mut out, &features, &doc, cli.sentences)?;
    }
    Ok(())
}

fn read_document(path: &Path) -> Result<DocumentState> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let lines: Vec<&str> = text.lines().collect();
    Ok(DocumentState::from_target_sentences(&lines))
}

fn read_steps(path: &Path) -> Result<Vec<SearchStep>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing steps {}", path.display()))
}

/// 逐个估计编辑；`accept_all` 为假时只接受不降低加权总分的编辑。返回接受的个数。
fn replay(features: &mut FeatureSet, doc: &mut DocumentState, steps: &[SearchStep], accept_all: bool) -> Result<usize> {
    let mut accepted = 0;
    for (i, step) in steps.iter().enumerate() {
        let proposal = features
            .estimate(doc, step)
            .with_context(|| format!("estimating step {i} ({})", step.description))?;
        let (before, after) = (features.total_score(), proposal.total_score());
        if accept_all || after >= before {
            features.accept(doc, proposal).with_context(|| format!("accepting step {i}"))?;
            accepted += 1;
            debug!(step = i, kind = ?step.kind, before, after, "step accepted");
        } else {
            features.discard_pending();
            debug!(step = i, kind = ?step.kind, before, after, "step rejected");
        }
    }
    Ok(accepted)
}

fn report(out: &mut impl Write, features: &FeatureSet, doc: &DocumentState, sentences: bool) -> io::Result<()> {
    let scores = features.scores();
    for (name, offset, arity) in features.features() {
        writeln!(out, "  {name}\t{:?}", &scores[offset..offset + arity])?;
    }
    writeln!(out, "  total\t{}", features.total_score())?;
    if sentences {
        for sentno in 0..doc.sentence_count() {
            writeln!(out, "  [{sentno}]\t{:?}", features.sentence_scores(doc, sentno))?;
        }
    }
    Ok(())
}
