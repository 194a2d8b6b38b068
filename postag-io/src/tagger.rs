//! The complete tagger: an embedding table bundled with its HMM.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use postag_core::{Embedder, PostagError, Result, Summarizable};
use postag_hmm::{
    evaluate, tag_tokens, train, AccuracyReport, HiddenMarkovModel, Sample, TrainerConfig,
};

use crate::embedding::EmbeddingTable;
use crate::store::{load_artifact, save_artifact, StoreConfig};

/// A trained part-of-speech tagger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggerModel {
    pub embedding: EmbeddingTable,
    pub hmm: HiddenMarkovModel,
}

impl TaggerModel {
    /// Bundle an embedding table with a model over the same dimension.
    pub fn new(embedding: EmbeddingTable, hmm: HiddenMarkovModel) -> Result<Self> {
        if embedding.dim() != hmm.dim() {
            return Err(PostagError::DimensionMismatch {
                expected: hmm.dim(),
                found: embedding.dim(),
            });
        }
        Ok(Self { embedding, hmm })
    }

    /// Fit an HMM to `samples` embedded through `embedding`.
    pub fn train(
        embedding: EmbeddingTable,
        samples: &[Sample],
        config: &TrainerConfig,
    ) -> Result<Self> {
        let hmm = train(samples, &embedding, config)?;
        Ok(Self { embedding, hmm })
    }

    /// Most likely tags for `tokens`, or `None` if no tag sequence can
    /// produce them and end.
    pub fn tag<T: AsRef<str>>(&self, tokens: &[T]) -> Result<Option<Vec<String>>> {
        let decoded = tag_tokens(&self.hmm, &self.embedding, tokens)?;
        Ok(decoded
            .into_path()
            .map(|path| path.tags().into_iter().map(str::to_string).collect()))
    }

    /// Token accuracy over labeled `samples`.
    pub fn evaluate(&self, samples: &[Sample]) -> Result<AccuracyReport> {
        evaluate(&self.hmm, &self.embedding, samples)
    }

    pub fn save(&self, path: impl AsRef<Path>, config: &StoreConfig) -> Result<()> {
        save_artifact(path, self, config)
    }

    /// Load a model and re-check its structure.
    ///
    /// # Errors
    ///
    /// Returns [`PostagError::Corrupt`] if the artifact fails validation or
    /// decodes to a structurally invalid model.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw: TaggerModel = load_artifact(path)?;
        let (states, initial, transitions, emitter) = raw.hmm.into_parts();
        let hmm = HiddenMarkovModel::new(states, initial, transitions, emitter)
            .map_err(|e| PostagError::Corrupt(format!("{}: {e}", path.display())))?;
        let model = Self::new(raw.embedding, hmm)
            .map_err(|e| PostagError::Corrupt(format!("{}: {e}", path.display())))?;
        info!(path = %path.display(), "{}", model.summary());
        Ok(model)
    }
}

impl Summarizable for TaggerModel {
    fn summary(&self) -> String {
        format!(
            "{} ({} embedding words)",
            self.hmm.summary(),
            self.embedding.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::Compression;
    use crate::corpus::parse_samples_str;

    const GLOVE: &str = "\
the 0.0 0.2
a 0.3 -0.1
dog 5.0 5.1
cat 4.7 5.2
runs -5.0 5.0
sleeps -4.8 5.3
";

    const CORPUS: &str = "\
the DT x
dog NN x

a DT x
cat NN x

the DT x
dog NN x
runs VB x
a DT x
cat NN x
";

    fn trained() -> TaggerModel {
        let embedding = EmbeddingTable::parse_glove_str(GLOVE).unwrap();
        let samples = parse_samples_str(CORPUS, None).unwrap();
        TaggerModel::train(embedding, &samples, &TrainerConfig::default()).unwrap()
    }

    #[test]
    fn tags_known_phrase() {
        let model = trained();
        assert_eq!(
            model.tag(&["The", "cat"]).unwrap(),
            Some(vec!["DT".to_string(), "NN".to_string()])
        );
    }

    #[test]
    fn impossible_phrase_is_none() {
        let model = trained();
        assert_eq!(model.tag(&["the", "dog", "runs"]).unwrap(), None);
    }

    #[test]
    fn empty_phrase_is_an_error() {
        let model = trained();
        let none: [&str; 0] = [];
        assert!(model.tag(&none).is_err());
    }

    #[test]
    fn evaluates_own_corpus() {
        let model = trained();
        let samples = parse_samples_str(CORPUS, None).unwrap();
        let report = model.evaluate(&samples).unwrap();
        assert_eq!(report.total_sequences, 3);
        assert_eq!(report.impossible_sequences, 0);
        assert_eq!(report.correct_tokens, 9);
    }

    #[test]
    fn save_and_load_preserve_tagging() {
        let model = trained();
        let dir = tempfile::tempdir().unwrap();
        for compression in [Compression::None, Compression::Gzip, Compression::Zstd] {
            let path = dir.path().join(format!("hmm_{compression}"));
            let cfg = StoreConfig {
                compression,
                level: None,
            };
            model.save(&path, &cfg).unwrap();
            let loaded = TaggerModel::load(&path).unwrap();
            assert_eq!(loaded.embedding, model.embedding);
            assert_eq!(loaded.hmm, model.hmm);
            assert_eq!(
                loaded.tag(&["a", "dog", "sleeps", "the", "cat"]).unwrap(),
                model.tag(&["a", "dog", "sleeps", "the", "cat"]).unwrap()
            );
        }
    }

    #[test]
    fn mismatched_bundle_is_rejected() {
        let model = trained();
        let wide = EmbeddingTable::new(3);
        assert!(matches!(
            TaggerModel::new(wide, model.hmm),
            Err(PostagError::DimensionMismatch { expected: 2, found: 3 })
        ));
    }

    #[test]
    fn load_rejects_truncated_file() {
        let model = trained();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hmm_out");
        model.save(&path, &StoreConfig::default()).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
        assert!(TaggerModel::load(&path).is_err());
    }
}
