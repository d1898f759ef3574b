//! Status subcommand - compare input against checkpoint, no network

use anyhow::Result;
use clap::Args;
use doiline_core::fmt_num;

use super::{PathArgs, print_table};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub paths: PathArgs,
}

pub fn run(args: StatusArgs, config: &Config) -> Result<()> {
    let pipeline = args.paths.to_pipeline(config);
    let status = doiline_crossref::status(&pipeline)?;

    print_table(
        "Status",
        &[
            ("DOIs in input", fmt_num(status.total_identifiers)),
            ("Checkpointed", fmt_num(status.checkpointed)),
            ("Remaining", fmt_num(status.remaining)),
            ("Pending batches", status.pending_batches.to_string()),
            (
                "Next artifact",
                format!("batch_{}.jsonl.gz", status.next_sequence),
            ),
            (
                "Complete",
                if status.is_complete() { "yes" } else { "no" }.to_string(),
            ),
        ],
    );
    Ok(())
}
