use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use service_rota::config::SchedulerConfig;
use service_rota::display::{
    print_batch_review, print_groups, print_program, write_batch_review_to_file,
};
use service_rota::form::{
    BatchRequest, DateRangeRequest, GenerateRequest, NextTurnRequest, PartitionRequest,
};
use service_rota::service::SchedulingService;
use service_rota::web;

#[derive(Parser, Debug)]
#[command(name = "service-rota")]
#[command(version)]
#[command(about = "Rotation-aware role scheduler for recurring service programs")]
struct Cli {
    #[command(flatten)]
    inputs: InputArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Roster CSV (id, name, roles, priority, blackouts, weekly exclusions, active, group eligible)
    #[arg(long, global = true)]
    roster: Option<PathBuf>,

    /// Activity catalog JSON
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Past assignments CSV (person_id, role, activity_type_id, date)
    #[arg(long, global = true)]
    history: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the JSON API
    Web {
        #[arg(long)]
        port: Option<u16>,
    },

    /// Draft one program
    Generate {
        #[arg(long)]
        activity: String,
        #[arg(long)]
        date: String,
    },

    /// Draft every matching date in a range and print the review
    Batch {
        #[arg(long)]
        activity: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Weekdays to include, e.g. "sun,wed"; all days when omitted
        #[arg(long, value_delimiter = ',')]
        weekdays: Vec<String>,
        /// Also write the review to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Partition the roster into work groups and show the next turns
    Groups {
        #[arg(long)]
        count: i64,
        /// Dates to hand out turns for, in order
        #[arg(long, value_delimiter = ',')]
        turns: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("service_rota=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = SchedulerConfig::from_env()?;
    if cli.inputs.roster.is_some() {
        config.roster_path = cli.inputs.roster;
    }
    if cli.inputs.catalog.is_some() {
        config.catalog_path = cli.inputs.catalog;
    }
    if cli.inputs.history.is_some() {
        config.history_path = cli.inputs.history;
    }

    match cli.command {
        Commands::Web { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            let port = config.port;
            let service = SchedulingService::from_config(config)?;
            println!("Starting web server on port {}...", port);
            println!("API available at http://localhost:{}/api", port);
            web::start_server(port, service).await?;
        }
        Commands::Generate { activity, date } => {
            let service = SchedulingService::from_config(config)?;
            let program = service
                .generate(&GenerateRequest {
                    activity_type_id: activity,
                    date,
                })
                .await?;
            print_program(&program, &*service.roster().await);
        }
        Commands::Batch {
            activity,
            from,
            to,
            weekdays,
            output,
        } => {
            let service = SchedulingService::from_config(config)?;
            let result = service
                .batch_generate(BatchRequest {
                    targets: Vec::new(),
                    range: Some(DateRangeRequest {
                        activity_type_id: activity,
                        from,
                        to,
                        weekdays,
                    }),
                })
                .await?;
            let roster = service.roster().await;
            print_batch_review(&result, &roster);
            if let Some(path) = output {
                write_batch_review_to_file(&result, &roster, &path)?;
                println!("\nReview saved to {}", path.display());
            }
        }
        Commands::Groups { count, turns } => {
            let service = SchedulingService::from_config(config)?;
            service
                .partition_groups(&PartitionRequest {
                    group_count: count,
                    rebalance: false,
                })
                .await?;
            for date in turns {
                let group = service.next_group_turn(&NextTurnRequest { date: date.clone() }).await?;
                println!("{} -> Group {}", date, group.id);
            }
            print_groups(&service.groups().await, &*service.roster().await);
        }
    }

    Ok(())
}
