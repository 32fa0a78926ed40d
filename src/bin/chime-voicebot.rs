use anyhow::Result;
use chime_voicebot::{
    app::{self, AppState, AppStateBuilder},
    config::Config,
    runtime::{ErrorReport, RuntimeClient},
    version, Event, InvocationContext,
};
use clap::{Parser, Subcommand};
use tokio::select;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    author,
    version = version::get_short_version(),
    about = "SIP media application handler that hands inbound calls to a Lex voice bot",
    long_about = version::get_version_info()
)]
struct Cli {
    /// Path to the configuration file
    #[clap(long, global = true, help = "Path to the configuration file (TOML format)")]
    conf: Option<String>,
    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the Lambda runtime API (default)
    Lambda,
    /// Serve `POST /invoke` over HTTP for local testing
    Serve {
        #[clap(long, help = "Override the listen address, e.g. 127.0.0.1:8080")]
        addr: Option<String>,
    },
    /// Dispatch a single event read from a JSON file and print the response
    Invoke {
        event: String,
        #[clap(
            long,
            default_value = "arn:aws:lambda:us-east-1:000000000000:function:chime-voicebot"
        )]
        arn: String,
    },
    /// Validate configuration and exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.conf {
        Some(ref path) => Config::load(path)?,
        None => Config::default(),
    };
    config.overlay_env();

    let _guard = init_logging(&config)?;
    let command = cli.command.unwrap_or(Commands::Lambda);

    let state = match AppStateBuilder::new().config(config.clone()).build() {
        Ok(state) => state,
        Err(err) => {
            if let (Commands::Lambda, Some(runtime_api)) = (&command, &config.runtime_api) {
                let report = ErrorReport {
                    error_type: err.kind().to_string(),
                    error_message: err.to_string(),
                };
                RuntimeClient::new(runtime_api)?
                    .send_init_error(&report)
                    .await?;
            }
            if matches!(command, Commands::CheckConfig) {
                eprintln!("Configuration validation failed: {}", err);
                std::process::exit(1);
            }
            return Err(err.into());
        }
    };

    match command {
        Commands::CheckConfig => {
            println!("Configuration is valid.");
            Ok(())
        }
        Commands::Invoke { event, arn } => invoke_once(&state, &event, &arn),
        Commands::Serve { addr } => {
            let state = match addr {
                Some(addr) => {
                    let mut config = (*state.config).clone();
                    config.http_addr = addr;
                    AppStateBuilder::new().config(config).build()?
                }
                None => state,
            };
            run_until_ctrl_c(state.clone(), app::serve(state)).await
        }
        Commands::Lambda => run_until_ctrl_c(state.clone(), app::run_lambda(state)).await,
    }
}

fn init_logging(config: &Config) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let mut env_filter = EnvFilter::from_default_env();
    if let Some(Ok(level)) = config
        .log_level
        .as_ref()
        .map(|level| level.parse::<LevelFilter>())
    {
        env_filter = env_filter.add_directive(level.into());
    }

    let mut guard_holder = None;
    let mut file_layer = None;
    let mut fmt_layer = None;
    if let Some(ref log_file) = config.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        guard_holder = Some(guard);
        file_layer = Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        );
    } else {
        fmt_layer = Some(tracing_subscriber::fmt::layer());
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(fmt_layer)
        .try_init()?;
    Ok(guard_holder)
}

fn invoke_once(state: &AppState, path: &str, arn: &str) -> Result<()> {
    let payload = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("{}: {}", e, path))?;
    let event: Event = serde_json::from_str(&payload)?;
    let ctx = InvocationContext::new(uuid::Uuid::new_v4().to_string(), arn);
    let response = state.dispatcher.dispatch(&event, &ctx)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn run_until_ctrl_c(
    state: AppState,
    task: impl std::future::Future<Output = Result<()>>,
) -> Result<()> {
    let token = state.token.clone();
    tokio::pin!(task);
    select! {
        result = &mut task => result,
        _ = tokio::signal::ctrl_c() => {
            info!("received CTRL+C, shutting down");
            token.cancel();
            task.await
        }
    }
}
