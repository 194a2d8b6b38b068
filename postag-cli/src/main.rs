//! `postag`: train, apply, and evaluate an embedding HMM part-of-speech tagger.
//!
//! # Commands
//!
//! - `train`: fit a model to a labeled corpus and a GloVe embedding table
//! - `tag`: tag a phrase with a saved model
//! - `accuracy`: measure token accuracy of a saved model on a labeled corpus

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use postag_core::Summarizable;
use postag_hmm::TrainerConfig;
use postag_io::{
    read_samples, Compression, EmbeddingTable, StoreConfig, TaggerModel, Tokenizer,
    TokenizerConfig,
};

/// Part-of-speech tagging with Gaussian-emission hidden Markov models
#[derive(Parser)]
#[command(name = "postag")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a tagger from a labeled corpus
    Train(TrainArgs),
    /// Tag a phrase with a trained model
    Tag(TagArgs),
    /// Report token accuracy on a labeled corpus
    Accuracy(AccuracyArgs),
}

/// Tokenizer switches shared by every subcommand.
#[derive(Args)]
struct TokenizeArgs {
    /// Keep corpus tokens whole instead of splitting punctuation
    #[arg(long)]
    no_tokenize: bool,

    /// Lower-case tokens before embedding
    #[arg(long)]
    lowercase: bool,
}

impl TokenizeArgs {
    fn tokenizer(&self) -> Tokenizer {
        Tokenizer::new(TokenizerConfig {
            lowercase: self.lowercase,
            split_punctuation: !self.no_tokenize,
        })
    }

    /// Corpus tokenizer; `None` leaves corpus tokens untouched.
    fn corpus_tokenizer(&self) -> Option<Tokenizer> {
        if self.no_tokenize && !self.lowercase {
            None
        } else {
            Some(self.tokenizer())
        }
    }
}

#[derive(Args)]
struct TrainArgs {
    /// GloVe embedding path
    #[arg(long)]
    embedding: PathBuf,

    /// Training data path
    #[arg(long)]
    data: PathBuf,

    /// Output model path
    #[arg(long, default_value = "hmm_out")]
    out: PathBuf,

    /// Worker threads for emission fitting (default: all CPUs)
    #[arg(long)]
    workers: Option<usize>,

    /// Eigenvalue floor for covariance regularization
    #[arg(long, default_value_t = postag_hmm::MIN_VARIANCE)]
    min_variance: f64,

    /// Artifact compression: none, gzip, or zstd
    #[arg(long, default_value_t = Compression::Gzip)]
    compression: Compression,

    /// Compression level (algorithm default if omitted)
    #[arg(long)]
    level: Option<i32>,

    #[command(flatten)]
    tokenize: TokenizeArgs,
}

#[derive(Args)]
struct TagArgs {
    /// Trained model path
    #[arg(long, default_value = "hmm_out")]
    model: PathBuf,

    /// Phrase to tag
    #[arg(long)]
    phrase: String,

    #[command(flatten)]
    tokenize: TokenizeArgs,
}

#[derive(Args)]
struct AccuracyArgs {
    /// Trained model path
    #[arg(long, default_value = "hmm_out")]
    model: PathBuf,

    /// Labeled evaluation data path
    #[arg(long)]
    data: PathBuf,

    #[command(flatten)]
    tokenize: TokenizeArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Train(args) => run_train(args),
        Commands::Tag(args) => run_tag(args),
        Commands::Accuracy(args) => run_accuracy(args),
    }
}

fn run_train(args: TrainArgs) -> anyhow::Result<()> {
    let config = TrainerConfig {
        min_variance: args.min_variance,
        workers: args.workers,
    };
    let store = StoreConfig {
        compression: args.compression,
        level: args.level,
    };
    if let Some(level) = store.level {
        store.compression.check_level(level)?;
    }

    info!("loading embedding");
    let embedding = EmbeddingTable::load_glove(&args.embedding)
        .with_context(|| format!("load embedding {}", args.embedding.display()))?;

    info!("loading data");
    let tokenizer = args.tokenize.corpus_tokenizer();
    let samples = read_samples(&args.data, tokenizer.as_ref())
        .with_context(|| format!("read samples {}", args.data.display()))?;

    info!("training");
    let model = TaggerModel::train(embedding, &samples, &config).context("train model")?;
    info!("{}", model.summary());

    info!("saving");
    model
        .save(&args.out, &store)
        .with_context(|| format!("save model {}", args.out.display()))?;
    Ok(())
}

fn run_tag(args: TagArgs) -> anyhow::Result<()> {
    let model = TaggerModel::load(&args.model)
        .with_context(|| format!("load model {}", args.model.display()))?;

    let tokens = args.tokenize.tokenizer().tokenize(&args.phrase);
    if tokens.is_empty() {
        bail!("phrase has no tokens");
    }
    let Some(tags) = model.tag(&tokens)? else {
        bail!("impossible token sequence");
    };
    for (token, tag) in tokens.iter().zip(&tags) {
        println!("{token} {tag}");
    }
    Ok(())
}

fn run_accuracy(args: AccuracyArgs) -> anyhow::Result<()> {
    let tokenizer = args.tokenize.corpus_tokenizer();
    let samples = read_samples(&args.data, tokenizer.as_ref())
        .with_context(|| format!("read samples {}", args.data.display()))?;
    let model = TaggerModel::load(&args.model)
        .with_context(|| format!("load model {}", args.model.display()))?;

    let report = model.evaluate(&samples).context("evaluate model")?;
    println!("{report}");
    Ok(())
}
