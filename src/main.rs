use std::{path::PathBuf, sync::Mutex, time::Duration};

use clap::{Args, CommandFactory, Parser, Subcommand};
use color_eyre::eyre::Result;
use jirasync::{
	JiraClient, RealJiraClient,
	config::Settings,
	record::RecordKind,
	sync::{
		SyncContext, SyncOptions,
		batch::run_batch,
		create::create_file,
		files::expand_patterns,
		pull::pull_file,
		push::push_file,
	},
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(author, version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"), about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
	#[command(subcommand)]
	command: Commands,
	/// .env file to read instead of searching for one
	#[arg(long, global = true)]
	env_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
	/// Create Jira issues from draft records, then record their keys locally
	Create(BatchArgs),
	/// Send local edits of existing records to Jira
	Push(PushArgs),
	/// Overwrite local records with the state of their Jira issues
	Pull(BatchArgs),
	/// Print shell completions
	Completions {
		#[arg(value_enum)]
		shell: clap_complete::Shell,
	},
}

#[derive(Args, Clone, Debug)]
struct BatchArgs {
	/// Record files. `*`, `?` and `[...]` are expanded
	#[arg(required = true)]
	files: Vec<String>,
	/// Record kind; detected from the front matter by default
	#[arg(long, value_enum)]
	kind: Option<RecordKind>,
	/// Print what would be sent or written without touching anything
	#[arg(long)]
	dry_run: bool,
}

#[derive(Args, Clone, Debug)]
struct PushArgs {
	#[command(flatten)]
	batch: BatchArgs,
	/// Update fields only, leave statuses alone
	#[arg(long)]
	no_transition: bool,
}

#[derive(Clone, Copy, Debug)]
enum Action {
	Create,
	Push,
	Pull,
}

fn main() -> Result<()> {
	color_eyre::install()?;
	init_tracing()?;
	let cli = Cli::parse();

	let (action, args, transition) = match cli.command {
		Commands::Create(args) => (Action::Create, args, false),
		Commands::Push(args) => (Action::Push, args.batch, !args.no_transition),
		Commands::Pull(args) => (Action::Pull, args, false),
		Commands::Completions { shell } => {
			clap_complete::generate(shell, &mut Cli::command(), "jirasync", &mut std::io::stdout());
			return Ok(());
		}
	};
	let settings = Settings::load(cli.env_file.as_deref())?;
	tracing::debug!(?settings.project_key, timeout_secs = settings.timeout_secs, "settings loaded");

	// The batch blocks; keep the main thread free to notice Ctrl-C.
	let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
	let code = runtime.block_on(async move {
		tokio::select! {
			joined = tokio::task::spawn_blocking(move || run(action, args, transition, &settings)) => joined?,
			_ = tokio::signal::ctrl_c() => {
				eprintln!("\nInterrupted by user");
				Ok(130)
			}
		}
	})?;
	runtime.shutdown_background();
	std::process::exit(code);
}

fn run(action: Action, args: BatchArgs, transition: bool, settings: &Settings) -> Result<i32> {
	let opts = SyncOptions {
		dry_run: args.dry_run,
		transition,
		kind: args.kind,
	};
	let files = expand_patterns(&args.files)?;

	let client = connect(settings);
	let ctx = match &client {
		Ok(client) => SyncContext::new(client.as_ref(), settings.project_key.clone(), opts),
		Err(reason) => {
			tracing::debug!(%reason, "no Jira client");
			SyncContext::offline(reason.clone(), settings.project_key.clone(), opts)
		}
	};

	let report = run_batch(&files, |path| match action {
		Action::Create => create_file(&ctx, path),
		Action::Push => push_file(&ctx, path),
		Action::Pull => pull_file(&ctx, path),
	});
	Ok(report.exit_code())
}

/// The Jira client, or why there is none.
fn connect(settings: &Settings) -> Result<Box<dyn JiraClient>, String> {
	#[cfg(feature = "is_integration_test")]
	if std::env::var_os("JIRASYNC_MOCK_STATE").is_some() {
		return Ok(Box::new(jirasync::MockJiraClient::new()));
	}

	let credentials = settings.credentials().map_err(|e| e.to_string())?;
	let client = RealJiraClient::new(&credentials, Duration::from_secs(settings.timeout_secs)).map_err(|e| e.to_string())?;
	Ok(Box::new(client))
}

/// `JIRASYNC_LOG` overrides the compiled-in directives. `JIRASYNC_TRACE_FILE` adds a JSON log.
fn init_tracing() -> Result<()> {
	let filter = EnvFilter::try_from_env("JIRASYNC_LOG").unwrap_or_else(|_| EnvFilter::new(option_env!("LOG_DIRECTIVES").unwrap_or("warn")));
	let registry = tracing_subscriber::registry().with(filter).with(fmt::layer().compact().with_writer(std::io::stderr));

	match std::env::var_os("JIRASYNC_TRACE_FILE") {
		Some(path) => {
			let file = std::fs::File::create(path)?;
			registry.with(fmt::layer().json().with_ansi(false).with_writer(Mutex::new(file))).init();
		}
		None => registry.init(),
	}
	Ok(())
}
