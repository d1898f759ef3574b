pub mod fetch;
pub mod status;

use std::path::PathBuf;

use clap::Args;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::config::Config;

/// Input and state locations shared by `fetch` and `status`
#[derive(Args, Debug)]
pub struct PathArgs {
    /// JSONL file with one object per line carrying the DOI field
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory for batch_{n}.jsonl.gz files
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Checkpoint file of processed DOIs
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Name of the DOI field in each input line
    #[arg(long)]
    pub field: Option<String>,

    /// DOIs per Crossref request
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Fetch each repeated DOI only once per run
    #[arg(long)]
    pub dedupe: bool,
}

impl PathArgs {
    /// Pipeline config: CLI flags over config file over defaults
    pub fn to_pipeline(&self, config: &Config) -> doiline_crossref::Config {
        doiline_crossref::Config {
            input: self.input.clone(),
            id_field: self
                .field
                .clone()
                .unwrap_or_else(|| config.fetch.id_field.clone()),
            output_dir: self
                .output
                .clone()
                .unwrap_or_else(|| config.output.dir.clone()),
            checkpoint: self
                .checkpoint
                .clone()
                .unwrap_or_else(|| config.output.checkpoint.clone()),
            batch_size: self.batch_size.unwrap_or(config.fetch.batch_size),
            max_retries: config.fetch.max_retries,
            max_batches: None,
            dedupe: self.dedupe || config.fetch.dedupe,
            gzip_level: config.output.gzip_level,
            base_url: config.crossref.base_url.clone(),
            mailto: config.crossref.mailto.clone(),
        }
    }
}

/// Print a key-value table on stderr
pub fn print_table(title: &str, rows: &[(&str, String)]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new(title).fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    eprintln!("\n{table}");
}
