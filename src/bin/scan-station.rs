use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use event_staffing::config::ClientOptions;
use event_staffing::dates;
use event_staffing::error::Result;
use event_staffing::scan::{CheckInSubmitter, ScanOutcome, ScanStation};
use event_staffing::EventStaffing;
use log::warn;
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_SESSION_FILE: &str = ".scan-station-session.json";

#[derive(Parser)]
#[clap(name = "scan-station", version, about = "Meal counter and check-in desk for event staff")]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and keep the session for later commands
    Login {
        #[clap(long)]
        email: String,
        #[clap(long, env = "EVENT_STAFFING_PASSWORD", hide_env_values = true)]
        password: String,
        /// Use the superadmin login instead of Firebase
        #[clap(long)]
        superadmin: bool,
    },
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Check that the API is reachable
    Health,
    /// Count a meal for every QR payload read from stdin, one per line
    Scan {
        #[clap(long)]
        event: i64,
        #[clap(long)]
        meal: String,
        /// Meal date, YYYY-MM-DD
        #[clap(long)]
        date: Option<String>,
        /// Publish new counts to the live meal feed
        #[clap(long)]
        broadcast: bool,
    },
    /// Check in every employee QR payload read from stdin
    CheckIn {
        #[clap(long)]
        event: i64,
    },
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    pretty_env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e.display_message(&e.to_string()));
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut options = ClientOptions::from_env();
    if options.token_store_path.is_none() {
        options.token_store_path = Some(PathBuf::from(DEFAULT_SESSION_FILE));
    }
    let client = EventStaffing::new(options)?;

    match cli.command {
        Command::Login {
            email,
            password,
            superadmin,
        } => {
            let user = if superadmin {
                client.superadmin_login(&email, &password).await?
            } else {
                client.login_with_email(&email, &password).await?
            };
            println!("Signed in as {} ({})", user.email, user.role);
        }
        Command::Logout => {
            client.logout()?;
            println!("Signed out");
        }
        Command::Whoami => match client.current_user() {
            Some(user) => println!("{} ({})", user.email, user.role),
            None => println!("Not signed in"),
        },
        Command::Health => {
            if client.health_check().await {
                println!("API is up");
            } else {
                println!("API is unreachable");
                process::exit(2);
            }
        }
        Command::Scan {
            event,
            meal,
            date,
            broadcast,
        } => {
            let date = date.as_deref().map(dates::parse_input).transpose()?;
            if broadcast {
                if let Err(e) = client.meal_updates().connect(event).await {
                    warn!("Live meal feed unavailable: {}", e);
                }
            }
            let station = client.meal_scan_station(event, &meal, date, broadcast);
            read_scans(&station).await?;
            if broadcast {
                client.meal_updates().disconnect().await?;
            }
        }
        Command::CheckIn { event } => {
            let station = client.scan_station(Arc::new(CheckInSubmitter::new(client.employee(), event)));
            read_scans(&station).await?;
        }
    }
    Ok(())
}

async fn read_scans(station: &ScanStation) -> Result<()> {
    station.start()?;
    println!("Ready, waiting for codes");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.map_err(event_staffing::error::Error::general)? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(outcome) = station.on_decoded(line).await? {
            print_outcome(&outcome);
            station.dismiss().await?;
        }
    }

    station.stop();
    Ok(())
}

fn print_outcome(outcome: &ScanOutcome) {
    match outcome {
        ScanOutcome::Accepted {
            message, new_count, ..
        } => match new_count {
            Some(count) => println!("OK  {} (count {})", message, count),
            None => println!("OK  {}", message),
        },
        ScanOutcome::Rejected { message, .. } => println!("ERR {}", message),
    }
}
