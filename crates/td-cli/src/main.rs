//! td CLI — keep a folder of markdown topics in sync with a remote store.

use std::io::Write;
use std::process::{self, Command};

use clap::{Parser, Subcommand};
use td_core::detect::DetectorKind;
use td_core::diff::LineOp;
use td_core::http::HttpRemote;
use td_core::state::TopicStatus;
use td_core::{Config, PushOptions, Store, TdError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "td", about = "td — markdown topics synced with a remote store", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). TD_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace local topics with the remote ones (discards local edits).
    Fetch,

    /// List known topics.
    List,

    /// Create a new topic.
    Create {
        /// Name of the topic.
        name: String,
    },

    /// Delete a topic, remotely and locally.
    Delete {
        /// Name of the topic.
        name: String,
    },

    /// Rename a topic.
    Rename {
        /// Current name.
        old_name: String,
        /// New name.
        new_name: String,
    },

    /// Send local edits to the remote.
    Push {
        /// Concurrent remote updates (default from config.json).
        #[arg(long)]
        workers: Option<usize>,

        /// Which topics count as changed: "non-empty" or "divergent".
        #[arg(long)]
        detector: Option<DetectorKind>,

        /// Output format: "human" (default) or "json".
        #[arg(long, default_value = "human")]
        format: String,
    },

    /// Open the working copies in $EDITOR.
    Edit {
        /// Open only this topic.
        name: Option<String>,
    },

    /// Show which topics have local edits.
    Status {
        /// Output format: "human" (default), "json", or "brief".
        #[arg(long, default_value = "human")]
        format: String,
    },

    /// Show local edits line by line.
    Diff {
        /// Only this topic.
        name: Option<String>,

        /// Output format: "human" (default) or "json".
        #[arg(long, default_value = "human")]
        format: String,
    },
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("td: {e}");
        process::exit(1);
    });
    let store = Store::open(config).unwrap_or_else(|e| {
        eprintln!("td: cannot open local store: {e}");
        process::exit(1);
    });
    tracing::debug!(root = %store.root().display(), "store opened");

    let result = match cli.command {
        Commands::Fetch => cmd_fetch(&store),
        Commands::List => cmd_list(&store),
        Commands::Create { name } => cmd_create(&store, &name),
        Commands::Delete { name } => cmd_delete(&store, &name),
        Commands::Rename { old_name, new_name } => cmd_rename(&store, &old_name, &new_name),
        Commands::Push {
            workers,
            detector,
            format,
        } => cmd_push(&store, workers, detector, &format),
        Commands::Edit { name } => cmd_edit(&store, name.as_deref()),
        Commands::Status { format } => cmd_status(&store, &format),
        Commands::Diff { name, format } => cmd_diff(&store, name.as_deref(), &format),
    };

    if let Err(e) = result {
        report_error(e.as_ref());
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("TD_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn report_error(e: &(dyn std::error::Error + 'static)) {
    match e.downcast_ref::<TdError>() {
        Some(TdError::UnknownTopic { name, suggestions }) => {
            let mut msg = format!("td: the topic '{name}' does not exist.");
            if !suggestions.is_empty() {
                msg.push_str("\n\nDid you mean one of these?\n");
                for s in suggestions {
                    msg.push_str(&format!("\t{s}\n"));
                }
            }
            eprintln!("{}", msg.trim_end());
        }
        _ => eprintln!("td: {e}"),
    }
}

fn remote(store: &Store) -> Result<HttpRemote, TdError> {
    HttpRemote::from_settings(&store.config().settings)
}

fn cmd_fetch(store: &Store) -> CmdResult {
    let result = store.fetch(&remote(store)?)?;
    println!("Topics updated ({}).", result.topics);
    Ok(())
}

fn cmd_list(store: &Store) -> CmdResult {
    for name in store.list() {
        println!("{name}");
    }
    Ok(())
}

fn cmd_create(store: &Store, name: &str) -> CmdResult {
    let topic = store.create(&remote(store)?, name)?;
    println!("created topic '{}'", topic.name);
    Ok(())
}

fn cmd_delete(store: &Store, name: &str) -> CmdResult {
    store.delete(&remote(store)?, name)?;
    println!("deleted topic '{name}'");
    Ok(())
}

fn cmd_rename(store: &Store, old_name: &str, new_name: &str) -> CmdResult {
    store.rename(&remote(store)?, old_name, new_name)?;
    println!("renamed '{old_name}' to '{new_name}'");
    Ok(())
}

fn cmd_push(
    store: &Store,
    workers: Option<usize>,
    detector: Option<DetectorKind>,
    format: &str,
) -> CmdResult {
    let mut options = PushOptions::from(store.config());
    if let Some(workers) = workers {
        options.workers = workers.max(1);
    }
    if let Some(detector) = detector {
        options.detector = detector;
    }

    let remote = remote(store)?;
    let human = format != "json";
    let mut stderr = std::io::stderr();
    let report = store.push(&remote, options, &mut |p| {
        if human {
            let _ = write!(stderr, "\rPushing... {}/{}", p.done, p.total);
            let _ = stderr.flush();
        }
    })?;
    if human && report.succeeded.len() + report.failed.len() > 0 {
        eprintln!();
    }

    if !human {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.is_success() {
        println!("Success!");
    } else {
        println!("The following topics could not be pushed:");
        for (name, reason) in &report.failed {
            println!("\t{name} ({reason})");
        }
    }

    if !report.is_success() {
        process::exit(1);
    }
    Ok(())
}

fn cmd_edit(store: &Store, name: Option<&str>) -> CmdResult {
    let target = store.edit_target(name)?;
    let editor = &store.config().editor;
    let mut parts = editor.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| TdError::Config("empty $EDITOR".to_string()))?;

    let mut cmd = Command::new(program);
    cmd.args(parts).current_dir(store.new_mirror().dir());
    if name.is_some() {
        cmd.arg(&target);
    }
    let status = cmd.status()?;
    if !status.success() {
        return Err(format!("{program} exited with {status}").into());
    }
    Ok(())
}

fn cmd_status(store: &Store, format: &str) -> CmdResult {
    let state = store.state()?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        "brief" => {
            println!("{}", state.brief());
        }
        _ => {
            if state.topics.is_empty() {
                println!("no topics, run `td fetch` or `td create <name>`");
            } else if state.is_clean() && state.pending_count() == 0 {
                println!("nothing to push, {} topic(s) in sync", state.topics.len());
            } else {
                for t in &state.topics {
                    let marker = match t.status {
                        TopicStatus::Clean => "   ",
                        TopicStatus::Modified => "~  ",
                        TopicStatus::Missing => "!  ",
                        TopicStatus::Unreadable => "X  ",
                    };
                    let pending = match t.status {
                        TopicStatus::Missing => "  (working copy deleted)",
                        TopicStatus::Unreadable => "  (cannot be read as text)",
                        _ if t.pending => "  (will push)",
                        _ => "",
                    };
                    println!("  {marker}{}{pending}", t.name);
                }
            }
            for name in &state.stray {
                println!("  ?  {name}  (not a known topic)");
            }
        }
    }

    Ok(())
}

fn cmd_diff(store: &Store, name: Option<&str>, format: &str) -> CmdResult {
    let diffs = store.diff(name)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&diffs)?);
        return Ok(());
    }

    if diffs.is_empty() {
        println!("no local edits");
        return Ok(());
    }

    for d in &diffs {
        println!("--- old/{}.md", d.name);
        println!("+++ new/{}.md", d.name);
        if d.is_binary {
            println!("  (binary content differs)");
            continue;
        }
        for hunk in &d.hunks {
            println!(
                "@@ -{},{} +{},{} @@",
                hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
            );
            for line in &hunk.lines {
                let prefix = match line.op {
                    LineOp::Add => '+',
                    LineOp::Remove => '-',
                    LineOp::Context => ' ',
                };
                println!("{prefix}{}", line.content);
            }
        }
    }

    Ok(())
}
