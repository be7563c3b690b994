use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;
use mod_i18n::bundle;
use mod_i18n::i18n::Language;

// Usage: merge-templates [DIR] [LANGUAGE]
//
// Bundles every .pot in DIR (default: current directory) behind <code>.tpl
// into <code>.po, where <code> is LANGUAGE's code (default: zh-hans).
fn main() -> Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("merge_templates=info".parse()?)
                .add_directive("mod_i18n=info".parse()?),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let dir = PathBuf::from(args.next().unwrap_or_else(|| ".".to_string()));
    let language = match args.next() {
        Some(value) => Language::resolve(&value)?,
        None => Language::default(),
    };

    let header = dir.join(format!("{}.tpl", language.code()));
    let output = dir.join(language.file_name());

    info!("Bundling templates in {} for {}", dir.display(), language.name());
    let bundled = bundle::merge_templates(&dir, &header, &output)
        .context("Failed to bundle templates")?;

    info!("✓ Wrote {} templates to {}", bundled.len(), output.display());
    Ok(())
}
