//! omni-queue - Manage the scheduled post queue
//!
//! Unix-style tool for listing, cancelling, and rescheduling posts in the
//! Omnicast queue.

use clap::{Parser, Subcommand};
use libomnicast::{Config, Database, PostFilter, PostStore, Result, ScheduledPost};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "omni-queue")]
#[command(version)]
#[command(about = "Manage scheduled posts")]
#[command(long_about = "\
omni-queue - Manage scheduled posts

DESCRIPTION:
    omni-queue is a Unix-style tool for managing the Omnicast post queue.
    Use it to list, cancel, or reschedule posts, or to view queue statistics.

USAGE EXAMPLES:
    # List all scheduled posts
    omni-queue list

    # List twitter posts in JSON format
    omni-queue list --format json --platform twitter

    # Cancel a specific post (demotes it to draft)
    omni-queue cancel <POST_ID>

    # Reschedule a post
    omni-queue reschedule <POST_ID> \"tomorrow 3pm\"

    # View queue statistics
    omni-queue stats

CONFIGURATION:
    Configuration file: ~/.config/omnicast/config.toml
    Override with OMNICAST_CONFIG environment variable.

EXIT CODES:
    0 - Success
    1 - Operation failed
    2 - Authentication error
    3 - Invalid input (bad post ID, time format, etc.)
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List posts in the queue
    List {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Filter by platform
        #[arg(short, long)]
        platform: Option<String>,

        /// Filter by status
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Cancel a scheduled post (demotes it to draft)
    Cancel {
        /// Post ID to cancel
        post_id: String,
    },

    /// Reschedule a post
    Reschedule {
        /// Post ID to reschedule
        post_id: String,

        /// New schedule time (e.g., "tomorrow 3pm", "2h")
        time: String,
    },

    /// Show queue statistics
    Stats {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("error")
            .with_writer(std::io::stderr)
            .init();
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let db = Database::new(&config.database.path).await?;
    let store = PostStore::new(Arc::new(db));

    match cli.command {
        Commands::List {
            format,
            platform,
            status,
        } => cmd_list(&store, &format, platform.as_deref(), status.as_deref()).await,
        Commands::Cancel { post_id } => cmd_cancel(&store, &post_id).await,
        Commands::Reschedule { post_id, time } => cmd_reschedule(&store, &post_id, &time).await,
        Commands::Stats { format } => cmd_stats(&store, &format).await,
    }
}

fn validate_format(format: &str) -> Result<()> {
    if format != "text" && format != "json" {
        return Err(libomnicast::OmnicastError::Validation(format!(
            "Invalid format '{}'. Must be 'text' or 'json'",
            format
        )));
    }
    Ok(())
}

/// List posts matching the optional filters
async fn cmd_list(
    store: &PostStore,
    format: &str,
    platform: Option<&str>,
    status: Option<&str>,
) -> Result<()> {
    validate_format(format)?;

    let filter = PostFilter {
        platform: platform
            .map(|p| p.parse())
            .transpose()
            .map_err(libomnicast::OmnicastError::Validation)?,
        status: status
            .map(|s| s.parse())
            .transpose()
            .map_err(libomnicast::OmnicastError::Validation)?,
        ..Default::default()
    };

    let posts = store.get_posts(&filter).await?;

    if format == "json" {
        output_list_json(&posts);
    } else {
        output_list_text(&posts);
    }

    Ok(())
}

fn output_list_json(posts: &[ScheduledPost]) {
    let json: Vec<serde_json::Value> = posts
        .iter()
        .map(|p| {
            serde_json::json!({
                "id": p.id,
                "platform": p.platform,
                "body": p.content.body,
                "scheduled_at": p.scheduled_at.to_rfc3339(),
                "status": p.status,
                "retry_count": p.metadata.retry_count,
                "error": p.error.as_ref().map(|e| e.message.clone()),
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json).unwrap());
}

fn output_list_text(posts: &[ScheduledPost]) {
    if posts.is_empty() {
        return;
    }

    let now = chrono::Utc::now();

    for post in posts {
        let preview = truncate_content(&post.content.body, 50);
        println!(
            "{} | {} | {} | {} | {}",
            post.id,
            post.platform,
            post.status,
            preview,
            format_time_until(now, post.scheduled_at)
        );
    }
}

/// Truncate content to max length with ellipsis
fn truncate_content(content: &str, max_len: usize) -> String {
    if content.chars().count() <= max_len {
        content.to_string()
    } else {
        let kept: String = content.chars().take(max_len).collect();
        format!("{}...", kept)
    }
}

/// Format time until scheduled time in human-readable format
fn format_time_until(now: chrono::DateTime<chrono::Utc>, at: chrono::DateTime<chrono::Utc>) -> String {
    let diff = (at - now).num_seconds();

    if diff < 0 {
        return "overdue".to_string();
    }

    let minutes = diff / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("in {} day{}", days, if days == 1 { "" } else { "s" })
    } else if hours > 0 {
        format!("in {} hour{}", hours, if hours == 1 { "" } else { "s" })
    } else if minutes > 0 {
        format!("in {} minute{}", minutes, if minutes == 1 { "" } else { "s" })
    } else {
        "in <1 minute".to_string()
    }
}

/// Cancel a post; prints the outcome either way
async fn cmd_cancel(store: &PostStore, post_id: &str) -> Result<()> {
    let outcome = store.cancel_post(post_id).await?;
    println!("{}", outcome.message);
    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}

/// Reschedule a post to a new parsed time
async fn cmd_reschedule(store: &PostStore, post_id: &str, time: &str) -> Result<()> {
    let new_time = libomnicast::schedule::parse_schedule(time)?;
    let post = store.reschedule_post(post_id, new_time).await?;
    println!(
        "Post {} rescheduled to {}",
        post.id,
        post.scheduled_at.to_rfc3339()
    );
    Ok(())
}

/// Show queue statistics
async fn cmd_stats(store: &PostStore, format: &str) -> Result<()> {
    validate_format(format)?;

    let status = store.queue_status().await?;

    if format == "json" {
        let json = serde_json::json!({
            "total_posts": status.total_posts,
            "scheduled": status.scheduled,
            "pending_within_hour": status.pending_within_hour,
            "failed": status.failed,
            "upcoming": status.upcoming.iter().map(|p| p.id.clone()).collect::<Vec<_>>(),
            "recent_published": status.recent_published.iter().map(|p| p.id.clone()).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&json).unwrap());
    } else {
        println!("Total posts:         {}", status.total_posts);
        println!("Scheduled:           {}", status.scheduled);
        println!("Due within an hour:  {}", status.pending_within_hour);
        println!("Failed:              {}", status.failed);
        if !status.upcoming.is_empty() {
            println!("\nUpcoming:");
            output_list_text(&status.upcoming);
        }
        if !status.recent_published.is_empty() {
            println!("\nRecently published:");
            for post in &status.recent_published {
                println!(
                    "{} | {} | {}",
                    post.id,
                    post.platform,
                    truncate_content(&post.content.body, 50)
                );
            }
        }
    }

    Ok(())
}
