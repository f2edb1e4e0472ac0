use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use boilerpipe::extractors::{self, Extractor};

/// Extract the main text content from an HTML page, discarding navigation,
/// advertisements and other boilerplate.
#[derive(Parser)]
#[command(name = "boilerpipe", version)]
struct Args {
    /// HTML file to read; stdin when omitted
    input: Option<PathBuf>,

    /// Extraction preset
    #[arg(short, long, value_enum, default_value_t = Preset::Article)]
    extractor: Preset,

    /// Use the keep-everything-with-min-k-words preset instead
    #[arg(long, value_name = "K", conflicts_with = "extractor")]
    min_words: Option<usize>,

    /// Print the document title on the first line
    #[arg(long)]
    title: bool,

    /// Dump per-block statistics instead of the extracted content
    #[arg(long)]
    blocks: bool,
}

#[derive(Copy, Clone, ValueEnum)]
enum Preset {
    Article,
    Default,
    Largest,
    Canola,
    Everything,
    NumWords,
    ArticleSentences,
}

fn extractor_for(args: &Args) -> Extractor {
    if let Some(k) = args.min_words {
        return extractors::keep_everything_with_min_k_words(k);
    }
    match args.extractor {
        Preset::Article => extractors::article(),
        Preset::Default => extractors::default(),
        Preset::Largest => extractors::largest_content(),
        Preset::Canola => extractors::canola(),
        Preset::Everything => extractors::keep_everything(),
        Preset::NumWords => extractors::num_words_rules(),
        Preset::ArticleSentences => extractors::article_sentences(),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let html = match &args.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut html = String::new();
            io::stdin()
                .read_to_string(&mut html)
                .context("failed to read HTML from stdin")?;
            html
        }
    };

    let doc = extractor_for(&args).get_doc(&html);

    if args.title {
        println!("{}", doc.title().unwrap_or_default());
    }
    if args.blocks {
        print!("{}", doc.debug_string());
    } else {
        print!("{}", doc.content());
    }
    Ok(())
}
