//! File formats and persistence for the postag tagger.
//!
//! - **Corpus**: line-oriented `TOKEN TAG EXTRA` training data, see [`corpus`]
//! - **Tokenizer**: splits raw text into embedding-table tokens
//! - **Embeddings**: GloVe-style text tables implementing [`postag_core::Embedder`]
//! - **Store**: checksummed, optionally compressed model artifacts
//! - **Tagger**: [`TaggerModel`], the embedding table bundled with its HMM

pub mod compress;
pub mod corpus;
pub mod embedding;
pub mod store;
pub mod tagger;
pub mod tokenizer;

pub use compress::Compression;
pub use corpus::{parse_samples_str, read_samples};
pub use embedding::EmbeddingTable;
pub use store::{load_artifact, save_artifact, StoreConfig};
pub use tagger::TaggerModel;
pub use tokenizer::{Tokenizer, TokenizerConfig};
