use std::path::PathBuf;

use anyhow::Result;
use pedindex::{IndexKind, Ledger};
use tracing::{info, warn};

pub fn run(args: &crate::cli::DedupArgs) -> Result<()> {
    let kinds = if args.indices.is_empty() {
        IndexKind::ALL.to_vec()
    } else {
        args.indices.iter().map(|s| s.parse()).collect::<Result<Vec<IndexKind>>>()?
    };
    let dir = args.aggregate_dir.clone().unwrap_or_else(|| PathBuf::from("."));

    for kind in kinds {
        let ledger = Ledger::in_dir(&dir, kind);
        if !ledger.path().exists() {
            warn!(path = %ledger.path().display(), "no ledger, skipping");
            continue;
        }
        let removed = ledger.dedup()?;
        info!(index = %kind, removed, "deduplicated");
    }
    Ok(())
}
