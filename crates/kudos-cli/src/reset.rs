//! # `kudos reset` — Weekly point reset
//!
//! Wraps `POST /api/admin/weekly-reset`. Run it from cron on Monday
//! mornings, or by hand.

use anyhow::Result;
use clap::Args;
use serde::Deserialize;

use crate::client::ApiClient;

#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Print what would happen without calling the API.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Deserialize)]
struct ResetResponse {
    users_reset: usize,
    teams_reset: usize,
    weekly_budget: u32,
}

pub async fn run_reset(args: &ResetArgs, client: &ApiClient) -> Result<u8> {
    if args.dry_run {
        println!("dry run: would POST /api/admin/weekly-reset");
        return Ok(0);
    }

    let result: ResetResponse = client.post_empty("/api/admin/weekly-reset").await?;
    println!(
        "reset {} users and {} teams to a budget of {} points",
        result.users_reset, result.teams_reset, result.weekly_budget
    );
    Ok(0)
}
