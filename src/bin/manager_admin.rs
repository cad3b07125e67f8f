use std::io::{self, BufRead, Write};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use recruiting_bots::{
    config::{database_url_from_env, DEFAULT_DB_MAX_CONNECTIONS},
    database::pool::connect,
    models::manager::Manager,
    services::manager_service::ManagerService,
    utils::validation::is_numeric_id,
};

#[derive(Parser)]
#[command(name = "manager-admin")]
#[command(about = "Inspect or remove manager records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a manager record
    Get {
        /// Telegram user id of the manager
        manager_id: String,
    },

    /// Delete a manager with their vacancies and resumes
    Delete {
        /// Telegram user id of the manager
        manager_id: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        confirm: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let manager_id = match &cli.command {
        Commands::Get { manager_id } | Commands::Delete { manager_id, .. } => manager_id.clone(),
    };
    if !is_numeric_id(&manager_id) {
        bail!("'{}' is not a valid ID (must be a number)", manager_id);
    }

    let database_url = database_url_from_env()?;
    let pool = connect(&database_url, DEFAULT_DB_MAX_CONNECTIONS.min(2))
        .await
        .context("connecting to the database")?;
    let managers = ManagerService::new(pool);

    let Some(manager) = managers.get(&manager_id).await? else {
        println!("❌ Manager with ID {} not found", manager_id);
        return Ok(());
    };

    match cli.command {
        Commands::Get { .. } => {
            print_manager("✅ Found Manager", &manager)?;
        }
        Commands::Delete { confirm, .. } => {
            print_manager("⚠️  Manager to be deleted", &manager)?;
            if !confirm && !ask_confirmation()? {
                println!("❌ Deletion cancelled");
                return Ok(());
            }
            if managers.delete(&manager_id).await? {
                println!("\n✅ Manager with ID {} has been successfully deleted", manager_id);
            } else {
                println!("❌ Manager with ID {} not found", manager_id);
            }
        }
    }

    Ok(())
}

fn print_manager(title: &str, manager: &Manager) -> anyhow::Result<()> {
    let rule = "=".repeat(60);
    let or_na = |value: &Option<String>| value.clone().unwrap_or_else(|| "N/A".to_string());

    println!("{}", rule);
    println!("{} (ID: {})", title, manager.id);
    println!("{}", rule);
    println!("ID:                          {}", manager.id);
    println!("Username:                    {}", or_na(&manager.username));
    println!("First Name:                  {}", or_na(&manager.first_name));
    println!("Last Name:                   {}", or_na(&manager.last_name));
    println!("Privacy Policy Confirmed:    {}", manager.privacy_policy_confirmed);
    println!("Access Token Received:       {}", manager.access_token_received);
    println!(
        "First Time Seen:             {}",
        manager
            .first_time_seen
            .map(|seen| seen.to_rfc3339())
            .unwrap_or_else(|| "N/A".to_string())
    );
    println!("Created At:                  {}", manager.created_at.to_rfc3339());
    println!("Updated At:                  {}", manager.updated_at.to_rfc3339());
    if let Some(hh_data) = &manager.hh_data {
        println!("\nHH Data (JSON):");
        println!("{}", serde_json::to_string_pretty(hh_data)?);
    }
    println!("{}", rule);
    Ok(())
}

fn ask_confirmation() -> anyhow::Result<bool> {
    print!("\n⚠️  Are you sure you want to delete this manager? (yes/no): ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "yes" | "y"))
}
