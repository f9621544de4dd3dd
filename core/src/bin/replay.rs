//! runtrack-replay <track.json> [config.json]
//!
//! Spiller av et innspilt spor gjennom sesjonskjernen og skriver rapporten.

use anyhow::{bail, Context, Result};

use runtrack_core::cli::print_run_report;
use runtrack_core::{load_config, parse_track_json, replay_track, DiscardHistory};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(track_path) = args.next() else {
        bail!("usage: runtrack-replay <track.json> [config.json]");
    };

    let raw = std::fs::read_to_string(&track_path)
        .with_context(|| format!("reading track {track_path}"))?;
    let (samples, embedded_cfg) = parse_track_json(&raw)
        .with_context(|| format!("parsing track {track_path}"))?;

    // Eksplisitt konfigfil vinner over den som ligger i sporet
    let config = match args.next() {
        Some(cfg_path) => {
            load_config(&cfg_path).with_context(|| format!("loading config {cfg_path}"))?
        }
        None => embedded_cfg.unwrap_or_default(),
    };

    let run = replay_track(&samples, &config, Box::new(DiscardHistory))
        .context("replaying track")?;

    print_run_report(&run);
    Ok(())
}
