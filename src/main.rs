use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use mailer_console::api::auth::StoreKind;
use mailer_console::api::tasks::{TaskAction, TaskQuery};
use mailer_console::api::types::TaskStatus;
use mailer_console::commands;
use mailer_console::config::AppConfig;
use mailer_console::notify::ChannelNotifier;
use mailer_console::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "mailer-console", version, about = "Terminal console for the mailer dashboard")]
struct Args {
    /// Backend origin, e.g. http://localhost:8080
    #[arg(long, env = "MAILER_API_URL")]
    api_url: Option<String>,

    /// Where the session token is kept: file, keychain or memory
    #[arg(long, env = "MAILER_CREDENTIAL_STORE")]
    store: Option<StoreKind>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the backend, session state and landing route
    Status,
    /// List the navigation menu
    Routes,
    /// Navigate to a location and show its screen
    Open {
        #[arg(default_value = "/")]
        location: String,
    },
    /// GET an API path and print the JSON response
    Get { path: String },
    /// Store a session token
    Login { token: String },
    /// Forget the session token
    Logout,
    /// Send task operations
    #[command(subcommand)]
    Tasks(TaskCommand),
    /// Email template operations
    #[command(subcommand)]
    Template(TemplateCommand),
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    List {
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
    },
    Running,
    Start { id: u64 },
    Pause { id: u64 },
    Resume { id: u64 },
    Delete { id: u64 },
}

#[derive(Subcommand, Debug)]
enum TemplateCommand {
    Show { id: u64 },
    Delete { id: u64 },
}

#[tokio::main]
async fn main() {
    // Shares VITE_* vars with the web dashboard when run from its root
    let _ = dotenvy::dotenv();

    env_logger::init();

    let args = Args::parse();
    match run(args).await {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run(args: Args) -> Result<String, String> {
    let mut config =
        AppConfig::from_env().map_err(|e| format!("Invalid configuration: {}", e))?;
    if let Some(url) = args.api_url {
        config.api.origin = url;
    }
    if let Some(store) = args.store {
        config.store = store;
    }

    // Pipeline notifications are drained to stderr until the state (and with
    // it the last sender) is dropped.
    let (notifier, mut notices) = ChannelNotifier::new();
    let printer = tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            eprintln!("[{}] {}", notice.severity, notice.message);
        }
    });

    let state = AppState::new(&config, Arc::new(notifier))?;

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Interrupted");
                cancel.cancel();
            }
        })
    };

    // Ctrl-C replaces the default SIGINT exit, so every command races it.
    let result =
        commands::until_cancelled(&cancel, dispatch(&state, args.command, &cancel)).await;

    interrupt.abort();
    drop(state);
    if let Err(e) = printer.await {
        log::debug!("Notification printer stopped: {}", e);
    }
    result
}

async fn dispatch(
    state: &AppState,
    command: Command,
    cancel: &CancellationToken,
) -> Result<String, String> {
    match command {
        Command::Status => commands::status(state),
        Command::Routes => Ok(commands::routes(state)),
        Command::Open { location } => commands::open(state, &location).await,
        Command::Get { path } => commands::get(state, &path, cancel).await,
        Command::Login { token } => commands::login(state, &token),
        Command::Logout => commands::logout(state),
        Command::Tasks(cmd) => match cmd {
            TaskCommand::List {
                status,
                page,
                page_size,
            } => {
                let query = TaskQuery {
                    status,
                    page,
                    page_size,
                };
                commands::list_tasks(state, &query).await
            }
            TaskCommand::Running => commands::running_tasks(state).await,
            TaskCommand::Start { id } => commands::task_action(state, id, TaskAction::Start).await,
            TaskCommand::Pause { id } => commands::task_action(state, id, TaskAction::Pause).await,
            TaskCommand::Resume { id } => {
                commands::task_action(state, id, TaskAction::Resume).await
            }
            TaskCommand::Delete { id } => commands::delete_task(state, id).await,
        },
        Command::Template(cmd) => match cmd {
            TemplateCommand::Show { id } => commands::show_template(state, id).await,
            TemplateCommand::Delete { id } => commands::delete_template(state, id).await,
        },
    }
}
