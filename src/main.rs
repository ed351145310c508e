// Entrypoint for the CLI application.
// - With a verb (`upload`, `list`, `search`, `delete`) it runs that one
//   action and exits: 0 on success, 1 with a message on stderr otherwise.
// - Without a verb, or with `shell`, it starts the interactive menu.

use anyhow::Result;
use clap::{Parser, Subcommand};
use gfilesearch::api::GeminiApi;
use gfilesearch::client::FileClient;
use gfilesearch::commands::{self, Action};
use gfilesearch::config::{ApiKey, Config};
use gfilesearch::session::Session;
use gfilesearch::ui;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gfilesearch")]
#[command(version, about = "Upload documents to Gemini and ask questions about them")]
struct Cli {
    /// API key (defaults to GOOGLE_API_KEY)
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a pdf, txt, docx, csv or json document
    Upload {
        path: PathBuf,
        /// Display name shown by the service (defaults to the file name)
        #[arg(long, value_name = "NAME")]
        name: Option<String>,
    },
    /// List files stored by the service
    List,
    /// Ask a question about an uploaded file
    Search {
        /// Remote file id, e.g. files/abc123
        file_id: String,
        /// Natural-language query
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Also write the result to this JSON file
        #[arg(long, value_name = "PATH")]
        export: Option<PathBuf>,
    },
    /// Delete a file from the service
    Delete { file_id: String },
    /// Start the interactive shell
    Shell,
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<gfilesearch::error::Error>() {
                Some(err) => ui::print_error(err),
                None => eprintln!("Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so they never mix with command output.
fn init_logging() {
    let filter = EnvFilter::try_from_env("GFILESEARCH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let client = FileClient::new(GeminiApi::new(&config)?);
    let key = cli.api_key.map(ApiKey::new).or_else(ApiKey::from_env);
    info!(model = %config.model, "starting");

    let export = match &cli.command {
        Some(Commands::Search { export, .. }) => export.clone(),
        _ => None,
    };
    let action = match cli.command {
        None | Some(Commands::Shell) => return ui::main_menu(&client, key),
        Some(Commands::Upload { path, name }) => Action::Upload {
            path,
            display_name: name,
        },
        Some(Commands::List) => Action::List,
        Some(Commands::Search { file_id, query, .. }) => Action::Search {
            file_id,
            query: query.join(" "),
        },
        Some(Commands::Delete { file_id }) => Action::Delete(file_id),
    };

    // One-shot commands need a valid key before anything else runs.
    let key = key.ok_or_else(|| {
        anyhow::anyhow!("Google API key is required. Set GOOGLE_API_KEY or pass --api-key.")
    })?;
    let mut session = Session::new();
    commands::execute(&client, &mut session, Action::Configure(key))?;

    let outcome = commands::execute(&client, &mut session, action)?;
    ui::print_outcome(&outcome);

    if let Some(path) = export {
        let outcome = commands::execute(&client, &mut session, Action::Export(path))?;
        ui::print_outcome(&outcome);
    }
    Ok(())
}
