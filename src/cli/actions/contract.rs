use crate::contract::{ContractHarness, FixtureSet, ReqwestPerformer};
use anyhow::{bail, Context, Result};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub fixtures: PathBuf,
    pub legacy_url: String,
    pub modern_url: String,
    pub timeout: Duration,
}

/// Replay every fixture request against both servers and compare the answers.
/// # Errors
/// Returns an error if the fixtures cannot be loaded or the servers disagree.
pub async fn execute(args: Args) -> Result<()> {
    let fixtures = FixtureSet::load_dir(&args.fixtures)
        .with_context(|| format!("could not load fixtures from {}", args.fixtures.display()))?;
    info!("loaded {} fixtures", fixtures.len());

    let legacy = ReqwestPerformer::new("legacy", parse_url(&args.legacy_url)?, args.timeout)?;
    let modern = ReqwestPerformer::new("modern", parse_url(&args.modern_url)?, args.timeout)?;
    let harness = ContractHarness::new(Arc::new(legacy), Arc::new(modern));

    let report = harness.compare_fixtures(&fixtures).await;
    for mismatch in &report.mismatches {
        println!("{mismatch}");
    }
    println!(
        "{} checked, {} mismatched",
        report.checked,
        report.mismatches.len()
    );

    if !report.is_equivalent() {
        bail!("servers are not equivalent");
    }
    Ok(())
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).with_context(|| format!("invalid URL: {raw}"))
}
