//! Terminal chat client: describe a video, watch the pipeline progress.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use eduvid_client::{ApiClient, PollConfig, Poller, Role, Session, StepStatus};
use eduvid_models::{GenerateRequest, JobStatus};

#[derive(Parser, Debug)]
#[command(name = "eduvid-chat")]
#[command(version)]
#[command(about = "Chat with the educational video generator", long_about = None)]
struct Cli {
    /// API base URL
    #[arg(long, env = "EDUVID_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate one video and wait for it
    Generate {
        /// What the video should explain
        description: String,

        /// Name used for artifacts and the downloaded file
        #[arg(short, long)]
        project_name: Option<String>,

        /// Do not burn subtitles into the video
        #[arg(long, action)]
        no_subtitles: bool,

        /// Save the finished video to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the status of a job
    Status {
        job_id: String,
    },

    /// Download the video of a completed job
    Download {
        job_id: String,

        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("eduvid=warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    let mut config = PollConfig::from_env();
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    let client = ApiClient::new(&config).context("failed to build HTTP client")?;

    match cli.command {
        Some(Commands::Generate {
            description,
            project_name,
            no_subtitles,
            output,
        }) => {
            let request = GenerateRequest {
                description,
                project_name,
                add_subtitles: Some(!no_subtitles),
            };
            let session = chat_turn(&client, &config, &request).await;
            if let (Some(path), Some(job_id)) = (output, session.job_id.as_deref()) {
                if session.timeline.count(StepStatus::Completed) == session.timeline.len() {
                    client.download(job_id, &path).await?;
                    println!("Saved {}", path.display());
                }
            }
        }
        Some(Commands::Status { job_id }) => {
            let status = client.status(&job_id).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Some(Commands::Download { job_id, output }) => {
            let status = client.status(&job_id).await?;
            anyhow::ensure!(
                status.status == JobStatus::Completed,
                "job {} is {}, not completed",
                job_id,
                status.status
            );
            client.download(&job_id, &output).await?;
            println!("Saved {}", output.display());
        }
        None => interactive(&client, &config).await?,
    }

    Ok(())
}

/// Read descriptions from stdin, one generation per line.
async fn interactive(client: &ApiClient, config: &PollConfig) -> anyhow::Result<()> {
    println!("Describe the video you want (empty line or Ctrl-D to quit).");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            break;
        }

        chat_turn(client, config, &GenerateRequest::new(line)).await;
    }

    Ok(())
}

/// Submit one request and print progress until it finishes.
async fn chat_turn(client: &ApiClient, config: &PollConfig, request: &GenerateRequest) -> Session {
    let mut session =
        Session::new(Utc::now()).with_poll_delays(config.initial_delay, config.interval);
    let mut printed_messages = 0;
    let mut last_statuses: Vec<StepStatus> = Vec::new();

    let mut poller = Poller::new(client.clone());
    poller
        .run(&mut session, request, |s| {
            for message in &s.messages[printed_messages..] {
                let who = match message.role {
                    Role::User => "you",
                    Role::Assistant => "eduvid",
                };
                println!("{}: {}", who, message.content);
            }
            printed_messages = s.messages.len();

            let statuses: Vec<StepStatus> = s.timeline.steps().iter().map(|st| st.status).collect();
            if statuses != last_statuses {
                print!("{}", s.timeline);
                last_statuses = statuses;
            }
        })
        .await;

    session
}
