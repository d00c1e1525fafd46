//! 打分配置：JSON 文件里列出要装配的 feature。
//!
//! ```json
//! { "features": [ { "type": "bleu", "name": "bleu", "weights": [1.0],
//!                   "parameters": { "reference-file": "ref.txt" } } ] }
//! ```
//!
//! - `name` 缺省时用 `type`
//! - `weights` 缺省时每个分数权重为 1
//! - 文件类参数的相对路径按配置文件所在目录解析

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use docent_core::{DocentError, FeatureFunction, FeatureSet, Float, Parameters};
use docent_lm::SelectedWordLmFactory;
use docent_metrics::{BleuModel, OvixModel};
use serde::Deserialize;
use tracing::info;

/// 这些参数的值是文件路径（`reference-file` 可以是逗号分隔的多个路径）。
const PATH_PARAMETERS: &[&str] = &["reference-file", "lm-file", "selected-words"];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub features: Vec<FeatureConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub weights: Option<Vec<Float>>,
    #[serde(default)]
    pub parameters: Parameters,
}

impl FeatureConfig {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.kind)
    }
}

impl Config {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        let mut config: Config =
            serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for feature in &mut self.features {
            for key in PATH_PARAMETERS {
                if !feature.parameters.contains(key) {
                    continue;
                }
                let resolved: Vec<String> = feature
                    .parameters
                    .list(key)
                    .iter()
                    .map(|p| join(base, p).display().to_string())
                    .collect();
                feature.parameters.set(*key, resolved.join(","));
            }
        }
    }

    /// 按声明顺序构造并注册所有 feature。
    pub fn build_feature_set(&self) -> Result<FeatureSet> {
        let mut set = FeatureSet::new();
        for feature in &self.features {
            let params = &feature.parameters;
            match feature.kind.as_str() {
                "bleu" => register(&mut set, feature, BleuModel::new(params)?)?,
                "ovix" => register(&mut set, feature, OvixModel::new())?,
                "selected-word-lm" => register(&mut set, feature, SelectedWordLmFactory::create_ngram_model(params)?)?,
                other => return Err(DocentError::UnknownFeature(other.to_string()).into()),
            }
        }
        info!(features = set.len(), scores = set.weights().len(), "feature set assembled");
        Ok(set)
    }
}

fn join(base: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() { path.to_path_buf() } else { base.join(path) }
}

fn register<F>(set: &mut FeatureSet, config: &FeatureConfig, feature: F) -> Result<()>
where
    F: FeatureFunction + 'static,
    F::State: 'static,
    F::Modifications: 'static,
{
    let weights = config
        .weights
        .clone()
        .unwrap_or_else(|| vec![1.0; feature.number_of_scores()]);
    set.register(config.name(), feature, weights)
        .with_context(|| format!("registering feature {:?}", config.name()))
}
