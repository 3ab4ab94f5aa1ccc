use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use kanso::app::App;
use kanso_core::config;
use kanso_core::notification::NotificationKind;
use kanso_core::user::User;

#[derive(Parser)]
#[command(name = "kanso", version, about = "Kanso — personal productivity backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Show configuration and database statistics.
    Status,
    /// Export a user's schedule as an iCalendar file.
    Export {
        /// User id or username.
        #[arg(short, long)]
        user: String,
        /// Days ahead to include (defaults to the configured horizon).
        #[arg(short, long)]
        days: Option<i64>,
        /// Output path; stdout when omitted.
        #[arg(short, long)]
        out: Option<String>,
    },
    /// Send a system notification through the live dispatcher.
    Notify {
        /// User id or username.
        #[arg(short, long)]
        user: String,
        /// The message to send.
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Status => {
            let cfg = config::load(&cli.config)?;
            println!("Kanso — Status\n");
            println!("Config: {}", cli.config);
            println!("Database: {}", cfg.store.db_path);
            println!("Reminder window: {}h", cfg.reminder.due_soon_hours);
            println!("Export horizon: {} days", cfg.export.horizon_days);
            println!();

            let app = App::new(cfg).await?;
            let size = app.store.db_size().await.map(format_bytes)?;
            let counts = app.store.row_counts().await?;
            println!("Size: {size}");
            println!("  users: {}", counts.users);
            println!("  tasks: {}", counts.tasks);
            println!("  time blocks: {}", counts.time_blocks);
            println!("  friendships: {}", counts.friendships);
            println!("  notifications: {}", counts.notifications);
            println!("  focus sessions: {}", counts.focus_sessions);
        }
        Commands::Export { user, days, out } => {
            let cfg = config::load(&cli.config)?;
            let horizon = days.unwrap_or(cfg.export.horizon_days);
            let app = App::new(cfg).await?;
            let user = resolve_user(&app, &user).await?;

            let start = Utc::now();
            let end = start + Duration::days(horizon);
            let file = app.export().calendar_file(user.id, start, end).await?;

            match out {
                Some(path) => {
                    std::fs::write(&path, &file.bytes)?;
                    println!("Wrote {} ({} bytes)", path, file.bytes.len());
                }
                None => print!("{}", String::from_utf8_lossy(&file.bytes)),
            }
        }
        Commands::Notify { user, message } => {
            if message.is_empty() {
                anyhow::bail!("no message provided. Usage: kanso notify --user <user> <message>");
            }
            let text = message.join(" ");

            let cfg = config::load(&cli.config)?;
            let app = App::new(cfg).await?;
            let user = resolve_user(&app, &user).await?;

            let notification = app
                .notifications()
                .create(user.id, NotificationKind::System, &text, None)
                .await?;
            println!(
                "Notification {} stored for {}",
                notification.id, user.username
            );
        }
    }

    Ok(())
}

/// Look a user up by numeric id or by username.
async fn resolve_user(app: &App, key: &str) -> anyhow::Result<User> {
    let found = match key.parse::<i64>() {
        Ok(id) => app.store.find_user(id).await?,
        Err(_) => app.store.find_user_by_username(key).await?,
    };
    found.ok_or_else(|| anyhow::anyhow!("no such user: {key}"))
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
