//! Labeled corpus reader.
//!
//! The corpus holds one token per line as whitespace-separated fields
//! `TOKEN TAG EXTRA...` (CoNLL-2000 chunking layout); only the first two
//! fields are used. A blank line ends a sentence.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::info;

use postag_core::{PostagError, Result};
use postag_hmm::Sample;

use crate::tokenizer::Tokenizer;

/// Read every sentence of the corpus at `path`.
///
/// With a tokenizer, each corpus token is split into sub-tokens that all
/// carry the corpus tag. Runs of blank lines never produce empty samples, and
/// a final sentence without a trailing blank line is kept.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a line has fewer than three
/// fields.
pub fn read_samples(path: impl AsRef<Path>, tokenizer: Option<&Tokenizer>) -> Result<Vec<Sample>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| PostagError::io_at(path, e))?;
    let samples = parse_samples(BufReader::new(file), &path.display().to_string(), tokenizer)?;
    info!(path = %path.display(), samples = samples.len(), "read corpus");
    Ok(samples)
}

/// Parse an in-memory corpus. See [`read_samples`].
pub fn parse_samples_str(text: &str, tokenizer: Option<&Tokenizer>) -> Result<Vec<Sample>> {
    parse_samples(text.as_bytes(), "<string>", tokenizer)
}

fn parse_samples<R: BufRead>(
    reader: R,
    source: &str,
    tokenizer: Option<&Tokenizer>,
) -> Result<Vec<Sample>> {
    let mut samples = Vec::new();
    let mut current = Sample::default();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|e| {
            PostagError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: line {}: {}", source, line_num + 1, e),
            ))
        })?;

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            if !current.is_empty() {
                samples.push(std::mem::take(&mut current));
            }
            continue;
        }
        if fields.len() < 3 {
            return Err(PostagError::Parse(format!(
                "{}: line {}: expected at least 3 fields, got {}",
                source,
                line_num + 1,
                fields.len()
            )));
        }

        let (token, tag) = (fields[0], fields[1]);
        match tokenizer {
            Some(t) => {
                for sub in t.tokenize(token) {
                    current.tokens.push(sub);
                    current.tags.push(tag.to_string());
                }
            }
            None => {
                current.tokens.push(token.to_string());
                current.tags.push(tag.to_string());
            }
        }
    }

    if !current.is_empty() {
        samples.push(current);
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::TokenizerConfig;
    use std::io::Write;

    const CORPUS: &str = "\
Confidence NN B-NP
in IN B-PP
the DT B-NP
pound NN I-NP
. . O

Chancellor NNP O
of IN B-PP
";

    #[test]
    fn parses_sentences() {
        let samples = parse_samples_str(CORPUS, None).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].tokens, vec!["Confidence", "in", "the", "pound", "."]);
        assert_eq!(samples[0].tags, vec!["NN", "IN", "DT", "NN", "."]);
        assert_eq!(samples[1].tokens, vec!["Chancellor", "of"]);
    }

    #[test]
    fn blank_runs_and_whitespace_lines() {
        let text = "\n\nthe DT x\n\n  \t\n\ndog NN x\n\n\n";
        let samples = parse_samples_str(text, None).unwrap();
        assert_eq!(samples.len(), 2);
        assert!(samples.iter().all(|s| s.len() == 1));
    }

    #[test]
    fn short_line_names_line_number() {
        let err = parse_samples_str("the DT x\ndog NN\n", None).unwrap_err();
        match err {
            PostagError::Parse(msg) => assert!(msg.contains("line 2"), "{msg}"),
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn extra_fields_ignored() {
        let samples = parse_samples_str("run VB B-VP extra more\n", None).unwrap();
        assert_eq!(samples[0].tokens, vec!["run"]);
        assert_eq!(samples[0].tags, vec!["VB"]);
    }

    #[test]
    fn tokenizer_splits_and_inherits_tag() {
        let t = Tokenizer::new(TokenizerConfig {
            lowercase: true,
            split_punctuation: true,
        });
        let samples = parse_samples_str("Don't VB x\n", Some(&t)).unwrap();
        assert_eq!(samples[0].tokens, vec!["don", "'t"]);
        assert_eq!(samples[0].tags, vec!["VB", "VB"]);
    }

    #[test]
    fn read_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(CORPUS.as_bytes()).unwrap();
        f.flush().unwrap();
        let samples = read_samples(f.path(), None).unwrap();
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn missing_file_names_path() {
        let err = read_samples("/nonexistent/corpus.txt", None).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/corpus.txt"));
    }
}
