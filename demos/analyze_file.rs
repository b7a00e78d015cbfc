//! Analyze a single upload and print the results payload.
//!
//! Run with: cargo run --example analyze_file -- <path> [ledger.json]
//!
//! Set `FALSIFYX_CONFIG` to a JSON file to override the engine defaults.

use std::{env, fs, path::Path, sync::Arc};

use falsifyx::{
    AuthenticityAnalyzer, MediaKind, config::EngineConfig, error::Result, report::ResultsPayload,
    store::{JsonFileStore, MemoryPatternStore},
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("FalsifyX - analyze a file");
        println!();
        println!("Usage: {} <path> [ledger.json]", args[0]);
        println!();
        println!("Supported extensions: png jpg jpeg gif bmp webp mp4 avi mov webm mp3 wav ogg m4a");
        return Ok(());
    }

    let path = Path::new(&args[1]);
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args[1].clone());

    let Some(kind) = MediaKind::from_filename(&filename) else {
        eprintln!("Error: unsupported file type for '{filename}'");
        std::process::exit(1);
    };

    let bytes = fs::read(path)?;

    let config = match env::var("FALSIFYX_CONFIG") {
        Ok(path) => EngineConfig::from_json_file(path)?,
        Err(_) => EngineConfig::default(),
    };

    let analyzer = match args.get(2) {
        Some(ledger) => AuthenticityAnalyzer::with_stores(
            config,
            Arc::new(JsonFileStore::open(ledger)?),
            Arc::new(MemoryPatternStore::new()),
        )?,
        None => AuthenticityAnalyzer::with_config(config)?,
    };

    let record = analyzer.analyze(&bytes, &filename, kind);
    println!("{}", ResultsPayload::from(&record).to_json()?);

    Ok(())
}
