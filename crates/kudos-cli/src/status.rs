//! # `kudos status` — Service health
//!
//! Hits the liveness and readiness probes and reports both.

use anyhow::Result;
use clap::Args;

use crate::client::ApiClient;

#[derive(Args, Debug)]
pub struct StatusArgs {}

pub async fn run_status(_args: &StatusArgs, client: &ApiClient) -> Result<u8> {
    let (live_status, live_body) = client.get_text("/health/liveness").await?;
    let (ready_status, ready_body) = client.get_text("/health/readiness").await?;

    println!("liveness:  {live_status} {live_body}");
    println!("readiness: {ready_status} {ready_body}");

    if live_status.is_success() && ready_status.is_success() {
        Ok(0)
    } else {
        Ok(1)
    }
}
