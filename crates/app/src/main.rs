use services::{AppServices, AuthConfig, Clock, ExamSettings};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod terminal;

use cli::{Args, Command, normalize_sqlite_url, prepare_sqlite_file, print_usage};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::args().skip(1).any(|arg| arg == "--help" || arg == "-h") {
        print_usage();
        return Ok(());
    }

    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite here so the services stay storage-agnostic.
    let db_url = normalize_sqlite_url(&args.db_url);
    prepare_sqlite_file(&db_url)?;
    let settings = ExamSettings {
        exam_seconds: args.seconds,
        seed: args.seed,
        auth: AuthConfig::new(args.api_url.clone()),
    };
    let services = AppServices::new_sqlite(&db_url, Clock::default_clock(), settings).await?;
    info!(db = %db_url, command = %args.command, "services ready");

    match args.command {
        Command::Take => take(&services, &args).await,
        Command::Import => {
            if let Some(path) = &args.questions {
                let stored = services.workflow().import_bank(path).await?;
                println!("Imported {stored} questions from {}", path.display());
            }
            Ok(())
        }
        Command::Login => {
            let (Some(username), Some(password)) = (&args.username, &args.password) else {
                return Ok(());
            };
            let profile = services.auth().login(username, password).await?;
            println!("Welcome, {}!", profile.name());
            Ok(())
        }
        Command::Logout => {
            services.profiles().forget().await?;
            println!("Signed out.");
            Ok(())
        }
        Command::Register => register(&services, &args).await,
        Command::Users => {
            let users = services.auth().registered_users().await?;
            if users.is_empty() {
                println!("No one has registered yet.");
            }
            for user in users {
                match user.name {
                    Some(name) => println!("{} ({name})", user.username),
                    None => println!("{}", user.username),
                }
            }
            Ok(())
        }
        Command::Results => {
            let items = services.results().list_recent(args.limit).await?;
            println!("{}", terminal::render_history(&items));
            Ok(())
        }
    }
}

async fn take(services: &AppServices, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let workflow = services.workflow();
    if let Some(path) = &args.questions {
        workflow.import_bank(path).await?;
    }

    let candidate = match &args.candidate {
        Some(name) => name.clone(),
        None => match services.profiles().load().await? {
            Some(profile) => profile.name().to_owned(),
            None => {
                eprintln!("No candidate: run `exam login` first or pass --name <candidate>.");
                return Ok(());
            }
        },
    };

    let handle = workflow.start_exam(&candidate).await?;
    println!(
        "Exam for {candidate}: {} questions, {} to finish.",
        handle.snapshot().progress.total,
        exam_core::format_countdown(workflow.exam_seconds()),
    );

    match terminal::run_exam(handle).await? {
        Some(outcome) => println!("\n{}", terminal::render_outcome(&candidate, &outcome)),
        None => println!("Exam abandoned; nothing was recorded."),
    }
    Ok(())
}

async fn register(services: &AppServices, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let username = match &args.username {
        Some(username) => username.clone(),
        None => match services.profiles().load().await? {
            Some(profile) => profile.username().to_owned(),
            None => {
                eprintln!("No user: run `exam login` first or pass --username <user>.");
                return Ok(());
            }
        },
    };

    let auth = services.auth();
    if auth.is_registered(&username).await? {
        println!("{username} is already registered.");
        return Ok(());
    }
    let message = auth.register(&username).await?;
    if message.is_empty() {
        println!("{username} is registered for the exam.");
    } else {
        println!("{message}");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
