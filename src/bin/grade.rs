use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use grading_relay::config::{resolve_config, GradingConfig};
use grading_relay::grading::{
    ApiClient, GradingSession, Observation, OutcomeObserver, PollObserver, StreamObserver,
    Submission,
};
use grading_relay::observability::logging;
use grading_relay::resilience::ExponentialBackoff;

#[derive(Parser)]
#[command(name = "grade")]
#[command(about = "Submit solutions and follow grading output", long_about = None)]
struct Cli {
    /// API base, usually the relay prefix. Overrides the configuration.
    #[arg(short, long)]
    api_base: Option<String>,

    /// Session cookie sent with every request, e.g. "SESSION=abc".
    #[arg(long)]
    cookie: Option<String>,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Live event stream with log lines
    Stream,
    /// Periodic fetch of the submission record
    Poll,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a solution archive and follow its grading
    Submit {
        #[arg(long)]
        challenge: String,
        #[arg(long)]
        file: PathBuf,
        #[arg(long, value_enum, default_value = "stream")]
        mode: Mode,
    },
    /// Follow the grading of an existing submission
    Watch {
        id: String,
        #[arg(long, value_enum, default_value = "stream")]
        mode: Mode,
    },
    /// Print the current submission record
    Fetch { id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref())?;
    logging::init_logging(&config.observability);

    let api_base = cli.api_base.unwrap_or_else(|| config.grading.api_base.clone());
    let client = ApiClient::new(&api_base, cli.cookie.as_deref())?;

    match cli.command {
        Commands::Submit {
            challenge,
            file,
            mode,
        } => {
            let archive = tokio::fs::read(&file).await?;
            let submission = client
                .submit_solution(&challenge, &file_name(&file), archive)
                .await?;
            println!("Submitted {} ({})", submission.id, submission.status);
            follow(client, &config.grading, &submission.id, mode).await?;
        }
        Commands::Watch { id, mode } => {
            follow(client, &config.grading, &id, mode).await?;
        }
        Commands::Fetch { id } => {
            let submission = client.fetch_submission(&id).await?;
            println!("{}", serde_json::to_string_pretty(&submission)?);
        }
    }

    Ok(())
}

async fn follow(
    client: ApiClient,
    grading: &GradingConfig,
    id: &str,
    mode: Mode,
) -> Result<(), Box<dyn std::error::Error>> {
    let observer: Arc<dyn OutcomeObserver> = match mode {
        Mode::Stream => Arc::new(StreamObserver::new(
            client,
            Arc::new(ExponentialBackoff::from_config(&grading.reconnect)),
        )),
        Mode::Poll => Arc::new(PollObserver::new(
            client,
            Duration::from_millis(grading.poll_interval_ms),
        )),
    };

    let mut session = GradingSession::new(id, grading.scroll_threshold_px);
    let observation = Observation::start(observer, id);

    let outcome = session
        .follow(observation, |session, applied| {
            for line in &session.lines()[applied.appended.clone()] {
                println!("[{}] {}", line.category, line.text);
            }
            if applied.state_changed {
                println!("-- {}", session.state().label());
            }
        })
        .await?;

    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(submission: &Submission) {
    match submission.score {
        Some(score) => println!("Result: {} (score {score})", submission.status),
        None => println!("Result: {}", submission.status),
    }
    if let Some(violations) = &submission.checkstyle_violations_json {
        println!("Checkstyle: {violations}");
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "solution.zip".to_string())
}
