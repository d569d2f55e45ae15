use anyhow::{Context, Result, anyhow};
use clap::Parser;
use meet_relay_core::collaborators::{Assistant, SpeechSink, VoiceConfigStore};
use meet_relay_core::dispatch::{DEFAULT_COMMAND_PREFIX, DispatchPolicy};
use meet_relay_core::session_state::{MessageLimit, RelaySession, SessionOutcome};
use meet_relay_service::config::{AssistantProvider, Config, SpeechBackend};
use meet_relay_service::gemini_adapter::{GeminiAssistant, read_key_file};
use meet_relay_service::meet_source::GoogleMeet;
use meet_relay_service::openai_adapter::OpenAiAssistant;
use meet_relay_service::speech::{LogSpeech, OpenAiSpeech};
use meet_relay_service::store::{JsonConfigStore, load_credentials};
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(version, about = "Reads a Google Meet chat aloud and answers commands in it")]
struct Cli {
    /// Voice settings file, re-read on every poll
    #[arg(long, default_value = "data/config.json")]
    config: PathBuf,

    /// Account and meeting link to join with
    #[arg(long, default_value = "data/credentials.json")]
    credentials: PathBuf,

    /// Stop after this many dispatched messages (-1 for no limit)
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    limit: i64,

    /// Display name of the relay's own account in the chat
    #[arg(long, default_value = "You")]
    self_name: String,

    /// Prefix that turns a message into a question for the assistant
    #[arg(long, default_value = DEFAULT_COMMAND_PREFIX)]
    command_prefix: String,

    /// Delay between chat polls in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_interval_ms: u64,

    /// Print the available audio output devices and exit
    #[arg(long)]
    list_outputs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Parse Command-Line Arguments ---
    let args = Cli::parse();
    if args.list_outputs {
        println!("{}", meet_relay_native_utils::device::get_available_outputs()?);
        return Ok(());
    }

    // --- 3. Initialize Logging ---
    let _log_guard = init_logging(&config)?;
    tracing::info!("Configuration loaded successfully. Starting meet relay...");

    // --- 4. Load Credentials and Voice Config ---
    let credentials = load_credentials(&args.credentials).context("Cannot start without credentials")?;
    let config_store = JsonConfigStore::new(&args.config);
    let initial_voice = config_store.load()?;
    tracing::info!("Voice config at {}: {:?}", config_store.path().display(), initial_voice);

    // --- 5. Build Collaborators ---
    let mut speech: Box<dyn SpeechSink> = match config.speech_backend {
        SpeechBackend::OpenAI => {
            let api_key = openai_key(&config)?;
            Box::new(
                OpenAiSpeech::new(api_key, &config.openai_base_url, &config.tts_model, &config.tts_voice)
                    .with_output_device(config.audio_output_device.clone())
                    .with_voices_dir(&config.voices_dir),
            )
        }
        SpeechBackend::Log => Box::new(LogSpeech::new()),
    };
    speech.configure(&initial_voice);

    let assistant: Box<dyn Assistant> = match config.assistant_provider {
        AssistantProvider::OpenAI => {
            tracing::info!("Using OpenAI assistant ({})", config.chat_model);
            let api_key = openai_key(&config)?;
            Box::new(OpenAiAssistant::new(api_key, &config.openai_base_url, &config.chat_model))
        }
        AssistantProvider::Gemini => {
            tracing::info!("Using Gemini assistant ({})", config.gemini_model);
            let api_key = match &config.gemini_api_key {
                Some(key) => SecretString::from(key.expose_secret().to_string()),
                None => read_key_file(&config.gemini_key_file)?,
            };
            Box::new(GeminiAssistant::new(api_key, &config.gemini_base_url, &config.gemini_model))
        }
    };

    let source = GoogleMeet::new(&config.webdriver_url, config.browser, credentials);

    // --- 6. Run the Session ---
    let policy = DispatchPolicy::new(args.self_name).with_command_prefix(args.command_prefix);
    let mut session = RelaySession::new(
        policy,
        Box::new(source),
        speech,
        assistant,
        Box::new(config_store),
    )
    .with_limit(MessageLimit::from_signed(args.limit))
    .with_poll_interval(Duration::from_millis(args.poll_interval_ms));

    let outcome = tokio::select! {
        outcome = session.run() => Some(outcome),
        _ = tokio::signal::ctrl_c() => None,
    };

    match outcome {
        None => {
            tracing::info!("Ctrl-C received, leaving the meeting.");
            session.shutdown().await;
            Ok(())
        }
        Some(SessionOutcome::LimitReached { messages }) => {
            tracing::info!("Done after {} messages.", messages);
            Ok(())
        }
        Some(SessionOutcome::Aborted { reason }) => Err(anyhow!("Meeting ended: {}", reason)),
    }
}

fn openai_key(config: &Config) -> Result<SecretString> {
    config
        .openai_api_key
        .as_ref()
        .map(|key| SecretString::from(key.expose_secret().to_string()))
        .ok_or_else(|| anyhow!("OPENAI_API_KEY is not set"))
}

/// Logs to stdout and to `relay-<unix-secs>.log` in the log directory.
fn init_logging(config: &Config) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log directory {}", config.log_dir.display()))?;
    let started = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let file_appender =
        tracing_appender::rolling::never(&config.log_dir, format!("relay-{}.log", started));
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let level = config.log_level.as_str().to_lowercase();
    let filter = EnvFilter::new(format!("{},hyper=warn,reqwest=warn", level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_timer(ChronoLocal::rfc_3339()))
        .with(
            fmt::layer()
                .with_timer(ChronoLocal::rfc_3339())
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();
    Ok(guard)
}
