//! bus-admin - terminal administration console for the bus-ticketing backend
//!
//! CRUD over users, roles, fleet, schedules, tickets and payments, plus a
//! live support chat screen.

mod api;
mod auth;
mod chat;
mod config;
mod models;
mod realtime;
mod tui;

use std::path::PathBuf;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::AdminClient;
use auth::guard::{self, Navigation, Route};
use auth::SessionStore;
use config::Config;
use models::{NewBus, NewDiscount, NewUser, Transition, TripStatus};

#[derive(Parser)]
#[command(name = "bus-admin")]
#[command(about = "Administration console for the bus-ticketing backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with username and password
    Login {
        #[arg(short, long)]
        username: Option<String>,

        /// Prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Clear the stored session
    Logout,

    /// Show the stored session
    Status,

    /// Show a user profile (defaults to your own)
    Profile { id: Option<String> },

    /// Manage user accounts
    #[command(subcommand)]
    Users(UserCommand),

    /// Manage roles and their permissions
    #[command(subcommand)]
    Roles(RoleCommand),

    /// Manage discount codes
    #[command(subcommand)]
    Discounts(DiscountCommand),

    /// Manage the fleet
    #[command(subcommand)]
    Buses(BusCommand),

    /// Bus schedules and trip status
    #[command(subcommand)]
    Trips(TripCommand),

    /// Inspect sold tickets
    #[command(subcommand)]
    Tickets(TicketCommand),

    /// Inspect payments and download receipts
    #[command(subcommand)]
    Payments(PaymentCommand),

    /// Revenue report over a date range
    Reports {
        /// First day (YYYY-MM-DD); defaults to 30 days ago
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day (YYYY-MM-DD); defaults to today
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Open the live support chat
    Chat,
}

#[derive(Subcommand)]
enum UserCommand {
    List {
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
    Show {
        id: String,
    },
    Create {
        username: String,
        #[arg(short, long)]
        password: String,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },
    Delete {
        id: String,
    },
    /// Change a user's role
    SetRole { id: String, role: String },
}

#[derive(Subcommand)]
enum RoleCommand {
    List,
    Create {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    Delete {
        id: String,
    },
    /// List every known permission
    Permissions,
    /// Permissions granted to a role
    Granted { role_id: String },
    Grant { role_id: String, permission_id: String },
    Revoke { role_id: String, permission_id: String },
}

#[derive(Subcommand)]
enum DiscountCommand {
    List,
    Create {
        code: String,
        /// Percentage off, in (0, 100]
        #[arg(short, long)]
        percent: f64,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        until: Option<NaiveDate>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
enum BusCommand {
    List,
    Create {
        license_plate: String,
        #[arg(short, long)]
        seats: u32,
        /// Bus type, e.g. "giường nằm"
        #[arg(long = "type")]
        kind: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
enum TripCommand {
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
        /// scheduled, departed, arrived or cancelled
        #[arg(long)]
        status: Option<TripStatus>,
    },
    /// Generate a day's trips from the route templates
    Generate {
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Move a trip to its next status
    Advance { id: String },
    /// Cancel a trip that has not arrived yet
    Cancel { id: String },
}

#[derive(Subcommand)]
enum TicketCommand {
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
    Show {
        id: String,
    },
}

#[derive(Subcommand)]
enum PaymentCommand {
    List {
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
    /// Save a payment's PDF receipt
    Receipt {
        id: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Commands {
    fn route(&self) -> Route {
        match self {
            Commands::Login { .. } | Commands::Logout | Commands::Status => Route::Login,
            Commands::Profile { .. } => Route::Profile,
            Commands::Users(_) => Route::Users,
            Commands::Roles(_) => Route::Roles,
            Commands::Discounts(_) => Route::Discounts,
            Commands::Buses(_) => Route::Buses,
            Commands::Trips(_) => Route::Schedules,
            Commands::Tickets(_) => Route::Tickets,
            Commands::Payments(_) => Route::Payments,
            Commands::Reports { .. } => Route::Reports,
            Commands::Chat => Route::Chat,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The chat screen owns the terminal; its logs go to a buffer instead.
    let logs = tui::LogBuffer::new();
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());
    if matches!(cli.command, Commands::Chat) {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(logs.clone()),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    match cli.command {
        Commands::Login { username, password } => auth::login(username, password).await,
        Commands::Logout => auth::logout().await,
        Commands::Status => auth::status().await,
        command => run_guarded(command, logs).await,
    }
}

/// Run a protected command once the route guard lets it through.
async fn run_guarded(command: Commands, logs: tui::LogBuffer) -> Result<()> {
    let mut config = Config::load()?;
    let route = command.route();

    match guard::guard(config.session(), route) {
        Navigation::Render => {}
        Navigation::Redirect(target) => return Err(redirect_error(&config, route, target)),
    }

    let result = dispatch(command, &config, logs).await;
    if let Err(ref err) = result {
        if let Some(Navigation::Redirect(target)) = guard::on_failure(err, &mut config) {
            config.save()?;
            return Err(expired_error(target));
        }
    }
    result
}

/// Message for a session the backend rejected mid-command.
fn expired_error(target: Route) -> anyhow::Error {
    anyhow::anyhow!(
        "Access denied ({}): the session has expired and was cleared. \
         Run 'bus-admin login' to sign in again.",
        target.path()
    )
}

fn redirect_error(config: &Config, route: Route, target: Route) -> anyhow::Error {
    match target {
        Route::Forbidden => anyhow::anyhow!(
            "Access denied: role '{}' may not open {}",
            config
                .session()
                .and_then(|s| s.role.as_deref())
                .unwrap_or("none"),
            route.path()
        ),
        _ => anyhow::anyhow!("Not logged in. Run 'bus-admin login' first."),
    }
}

async fn dispatch(command: Commands, config: &Config, logs: tui::LogBuffer) -> Result<()> {
    if let Commands::Chat = command {
        let session = config
            .session()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Not logged in"))?;
        return tui::run(config, &session, logs).await;
    }
    if let Commands::Profile { id } = command {
        return auth::profile(config, id.as_deref()).await;
    }

    let client = AdminClient::from_config(config)?;
    match command {
        Commands::Users(cmd) => match cmd {
            UserCommand::List { limit } => api::list_users(&client, limit).await,
            UserCommand::Show { id } => api::show_user(&client, &id).await,
            UserCommand::Create {
                username,
                password,
                full_name,
                email,
                role,
            } => {
                let new_user = NewUser {
                    username,
                    password,
                    full_name,
                    email,
                    role,
                };
                api::create_user(&client, &new_user).await
            }
            UserCommand::Delete { id } => api::delete_user(&client, &id).await,
            UserCommand::SetRole { id, role } => api::set_user_role(&client, &id, &role).await,
        },
        Commands::Roles(cmd) => match cmd {
            RoleCommand::List => api::list_roles(&client).await,
            RoleCommand::Create { name, description } => {
                api::create_role(&client, &name, description.as_deref()).await
            }
            RoleCommand::Delete { id } => api::delete_role(&client, &id).await,
            RoleCommand::Permissions => api::list_permissions(&client).await,
            RoleCommand::Granted { role_id } => api::list_role_permissions(&client, &role_id).await,
            RoleCommand::Grant {
                role_id,
                permission_id,
            } => api::grant_permission(&client, &role_id, &permission_id).await,
            RoleCommand::Revoke {
                role_id,
                permission_id,
            } => api::revoke_permission(&client, &role_id, &permission_id).await,
        },
        Commands::Discounts(cmd) => match cmd {
            DiscountCommand::List => api::list_discounts(&client).await,
            DiscountCommand::Create {
                code,
                percent,
                from,
                until,
            } => {
                let discount = NewDiscount {
                    code,
                    percent,
                    valid_from: from,
                    valid_until: until,
                };
                api::create_discount(&client, &discount).await
            }
            DiscountCommand::Delete { id } => api::delete_discount(&client, &id).await,
        },
        Commands::Buses(cmd) => match cmd {
            BusCommand::List => api::list_buses(&client).await,
            BusCommand::Create {
                license_plate,
                seats,
                kind,
            } => {
                let bus = NewBus {
                    license_plate,
                    seat_count: seats,
                    kind,
                };
                api::create_bus(&client, &bus).await
            }
            BusCommand::Delete { id } => api::delete_bus(&client, &id).await,
        },
        Commands::Trips(cmd) => match cmd {
            TripCommand::List { date, status } => {
                api::list_trips(&client, &api::TripFilter { date, status }).await
            }
            TripCommand::Generate { date } => {
                let date = date.unwrap_or_else(|| Local::now().date_naive());
                api::generate_trips(&client, date).await
            }
            TripCommand::Advance { id } => {
                api::change_status(&client, &id, Transition::Advance).await
            }
            TripCommand::Cancel { id } => api::change_status(&client, &id, Transition::Cancel).await,
        },
        Commands::Tickets(cmd) => match cmd {
            TicketCommand::List { status, limit } => {
                api::list_tickets(&client, status.as_deref(), limit).await
            }
            TicketCommand::Show { id } => api::show_ticket(&client, &id).await,
        },
        Commands::Payments(cmd) => match cmd {
            PaymentCommand::List { limit } => api::list_payments(&client, limit).await,
            PaymentCommand::Receipt { id, output } => {
                api::download_receipt(&client, &id, output.as_deref())
                    .await
                    .map(|_| ())
            }
        },
        Commands::Reports { from, to } => {
            let to = to.unwrap_or_else(|| Local::now().date_naive());
            let from = from.unwrap_or(to - chrono::Duration::days(30));
            api::revenue_report(&client, from, to).await
        }
        Commands::Login { .. }
        | Commands::Logout
        | Commands::Status
        | Commands::Profile { .. }
        | Commands::Chat => anyhow::bail!("Command does not go through the API client"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_trip_flags_parse() {
        let cli = Cli::try_parse_from([
            "bus-admin", "trips", "list", "--date", "2026-10-19", "--status", "departed",
        ])
        .unwrap();
        match cli.command {
            Commands::Trips(TripCommand::List { date, status }) => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2026, 10, 19));
                assert_eq!(status, Some(TripStatus::Departed));
            }
            _ => panic!("expected trips list"),
        }

        assert!(Cli::try_parse_from(["bus-admin", "trips", "list", "--status", "late"]).is_err());
    }

    #[test]
    fn test_expiry_reports_forbidden_view() {
        let text = expired_error(Route::Forbidden).to_string();
        assert!(text.starts_with("Access denied (/403)"));
        assert!(text.contains("bus-admin login"));
    }

    #[test]
    fn test_routes() {
        let cli = Cli::try_parse_from(["bus-admin", "reports"]).unwrap();
        assert_eq!(cli.command.route(), Route::Reports);
        let cli = Cli::try_parse_from(["bus-admin", "trips", "cancel", "s1"]).unwrap();
        assert_eq!(cli.command.route(), Route::Schedules);
    }
}
