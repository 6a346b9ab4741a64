//! # `kudos user` — Account administration
//!
//! List, provision, and deactivate accounts through the admin API.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Deserialize;

use crate::client::ApiClient;

#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// List accounts.
    List {
        /// Include deactivated accounts (admin view).
        #[arg(long)]
        include_inactive: bool,
    },
    /// Provision an account.
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        /// Initial password; omit for an OAuth-only account.
        #[arg(long)]
        password: Option<String>,
        /// Grant the admin flag.
        #[arg(long)]
        admin: bool,
    },
    /// Soft-deactivate an account.
    Deactivate {
        /// User ID (UUID).
        id: String,
    },
}

#[derive(Debug, Deserialize)]
struct UserRow {
    id: String,
    email: String,
    display_name: String,
    weekly_points: u32,
    total_points_received: u64,
    is_admin: bool,
    is_active: bool,
}

pub async fn run_user(args: &UserArgs, client: &ApiClient) -> Result<u8> {
    match &args.command {
        UserCommand::List { include_inactive } => {
            let path = if *include_inactive {
                "/api/users?include_inactive=true"
            } else {
                "/api/users"
            };
            let users: Vec<UserRow> = client.get_json(path).await?;
            println!(
                "{:<38} {:<28} {:<20} {:>6} {:>8}  flags",
                "id", "email", "name", "pts", "total"
            );
            for user in users {
                let mut flags = String::new();
                if user.is_admin {
                    flags.push_str("admin ");
                }
                if !user.is_active {
                    flags.push_str("inactive");
                }
                println!(
                    "{:<38} {:<28} {:<20} {:>6} {:>8}  {}",
                    user.id,
                    user.email,
                    user.display_name,
                    user.weekly_points,
                    user.total_points_received,
                    flags.trim_end()
                );
            }
            Ok(0)
        }
        UserCommand::Add {
            email,
            name,
            password,
            admin,
        } => {
            let body = serde_json::json!({
                "email": email,
                "display_name": name,
                "password": password,
                "is_admin": admin,
            });
            let user: UserRow = client.post_json("/api/users", &body).await?;
            println!("created {} ({})", user.id, user.email);
            Ok(0)
        }
        UserCommand::Deactivate { id } => {
            client.delete(&format!("/api/users/{id}")).await?;
            println!("deactivated {id}");
            Ok(0)
        }
    }
}
