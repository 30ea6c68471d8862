//! Command-line front end for the Krishi Sakhi prompt flows.
//!
//! Each subcommand runs one flow on a JSON document and prints the typed
//! reply as JSON. Reads the API key from the `OPENROUTER_KEY` environment
//! variable.
//!
//! # Examples
//!
//! ```sh
//! # Crop recommendations from a request file
//! krishi crops --input farm.json
//!
//! # Chat, reading the request from stdin
//! echo '{"history": [], "message": "What is SRI?"}' | krishi chat
//!
//! # Speak a sentence in Malayalam and save the audio
//! krishi speak --input tip.json --audio-out tip.wav
//!
//! # Offline run against a canned reply
//! krishi alerts --input weather.json --stub-reply alerts.json
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{ArgAction, Args, Parser, Subcommand};
use krishi_sakhi::backend::{ModelBackend, SpeechAudio};
use krishi_sakhi::flow::{ErrorKind, Flow, FlowError, execute_json};
use krishi_sakhi::flows::catalog;
use krishi_sakhi::prelude::*;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Run Krishi Sakhi prompt flows from JSON input.
#[derive(Parser, Debug)]
#[command(name = "krishi", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Model to use for text flows. Overrides `KRISHI_MODEL`.
    #[arg(long, global = true)]
    model: Option<String>,

    /// Maximum tokens per reply.
    #[arg(long, global = true)]
    max_tokens: Option<u32>,

    /// Sampling temperature.
    #[arg(long, global = true)]
    temperature: Option<f32>,

    /// Do not send a JSON schema `response_format`; rely on the prompt alone.
    #[arg(long, global = true)]
    no_structured_output: bool,

    /// Answer every call with the contents of FILE instead of calling the
    /// model. Speech calls get a short silence.
    #[arg(long, global = true, value_name = "FILE")]
    stub_reply: Option<PathBuf>,

    /// More logging (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Args, Debug, Clone)]
struct InputArgs {
    /// JSON request file, or `-` for stdin.
    #[arg(short, long, default_value = "-")]
    input: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chat with the assistant.
    Chat(InputArgs),
    /// Recommend crops for a farm.
    Crops(InputArgs),
    /// Summarize an activity log.
    Summarize(InputArgs),
    /// Suggest improvements to a logged activity.
    Enhance(InputArgs),
    /// Weather alerts for recent activities.
    Alerts(InputArgs),
    /// Synthesize speech.
    Speak {
        #[command(flatten)]
        args: InputArgs,
        /// Write the WAV audio here instead of printing the data URI.
        #[arg(long, value_name = "FILE")]
        audio_out: Option<PathBuf>,
    },
    /// Translate text.
    Translate(InputArgs),
    /// Print the input and output schemas of one flow, or of all of them.
    Schema {
        /// Flow name, e.g. `weather_alerts`.
        flow: Option<String>,
    },
    /// Run crop recommendations and weather alerts side by side.
    Dashboard {
        /// Crop recommendation request.
        #[arg(long, value_name = "FILE")]
        crops: String,
        /// Weather alert request.
        #[arg(long, value_name = "FILE")]
        weather: String,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error("cannot create model client: {0}")]
    Backend(#[from] BackendError),
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("{path} is not valid JSON: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("unknown flow '{0}'")]
    UnknownFlow(String),
    #[error("speech reply did not contain WAV audio")]
    NoAudio,
}

impl CliError {
    /// 2 when the caller has to fix its input, 1 for everything else.
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Flow(e) if e.kind() == ErrorKind::Validation => 2,
            CliError::Json { .. } | CliError::UnknownFlow(_) => 2,
            _ => 1,
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::ERROR
    } else {
        match verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(level);
    tracing_subscriber::registry().with(layer).init();
}

fn read_input(source: &str) -> Result<Value, CliError> {
    let (label, text) = if source == "-" {
        let text = std::io::read_to_string(std::io::stdin()).map_err(|source| CliError::Read {
            path: "stdin".into(),
            source,
        })?;
        ("stdin".to_string(), text)
    } else {
        let text = std::fs::read_to_string(source).map_err(|e| CliError::Read {
            path: source.to_string(),
            source: e,
        })?;
        (source.to_string(), text)
    };
    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: label,
        source,
    })
}

/// 100 ms of silence, for offline speech runs.
fn stub_silence() -> SpeechAudio {
    SpeechAudio {
        pcm: vec![0; (krishi_sakhi::SPEECH_SAMPLE_RATE / 10 * 2) as usize],
        sample_rate: krishi_sakhi::SPEECH_SAMPLE_RATE,
        channels: 1,
    }
}

fn stub_backend(path: &Path) -> Result<StubBackend, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.display().to_string(),
        source,
    })?;
    // Anything that is not JSON is replayed as free text.
    let stub = match serde_json::from_str::<Value>(&text) {
        Ok(value) => StubBackend::json(value),
        Err(_) => StubBackend::text(text),
    };
    Ok(stub.with_speech(stub_silence()))
}

fn build_backend(cli: &Cli) -> Result<Arc<dyn ModelBackend>, CliError> {
    if let Some(path) = &cli.stub_reply {
        info!("Using stub replies from {}", path.display());
        return Ok(Arc::new(stub_backend(path)?));
    }

    let mut config = ClientConfig::from_env()?;
    if let Some(model) = &cli.model {
        config.flow = config.flow.with_model(model.clone());
    }
    if let Some(max_tokens) = cli.max_tokens {
        config.flow = config.flow.with_max_tokens(max_tokens);
    }
    if let Some(temperature) = cli.temperature {
        config.flow = config.flow.with_temperature(temperature);
    }
    if cli.no_structured_output {
        config.flow = config.flow.with_structured_output(false);
    }
    debug!("model={}, url={}", config.flow.model, config.chat_url);
    Ok(Arc::new(ModelClient::new(config)?))
}

async fn run_flow<F: Flow>(
    flow: &F,
    backend: &dyn ModelBackend,
    input: Value,
) -> Result<Value, CliError> {
    let output = execute_json(flow, backend, input).await?;
    serde_json::to_value(output).map_err(|source| CliError::Json {
        path: F::NAME.into(),
        source,
    })
}

async fn run_parsed<F: Flow>(
    flow: &F,
    backend: &dyn ModelBackend,
    input: Result<Value, CliError>,
) -> Result<Value, CliError> {
    run_flow(flow, backend, input?).await
}

fn schemas(name: Option<&str>) -> Result<Value, CliError> {
    let descriptors = catalog();
    let render = |d: &krishi_sakhi::flow::FlowDescriptor| {
        json!({
            "name": d.name,
            "input": d.input_schema,
            "output": d.output_schema,
        })
    };
    match name {
        None => Ok(Value::Array(descriptors.iter().map(render).collect())),
        Some(name) => descriptors
            .iter()
            .find(|d| d.name == name)
            .map(render)
            .ok_or_else(|| CliError::UnknownFlow(name.to_string())),
    }
}

fn section(result: Result<Value, CliError>) -> (Value, Option<CliError>) {
    match result {
        Ok(value) => (value, None),
        Err(e) => (json!({ "error": e.to_string() }), Some(e)),
    }
}

/// Run both dashboard flows concurrently. A failure in one leaves the other
/// untouched; the first failure is returned alongside the combined report.
async fn dashboard(
    backend: &dyn ModelBackend,
    crops: &str,
    weather: &str,
) -> (Value, Option<CliError>) {
    let crops_input = read_input(crops);
    let weather_input = read_input(weather);

    let (crops, alerts) = futures::join!(
        run_parsed(&CropRecommendationsFlow, backend, crops_input),
        run_parsed(&WeatherAlertsFlow, backend, weather_input),
    );

    let (crops, crops_err) = section(crops);
    let (alerts, alerts_err) = section(alerts);
    (
        json!({ "crops": crops, "alerts": alerts }),
        crops_err.or(alerts_err),
    )
}

async fn speak(
    backend: &dyn ModelBackend,
    args: &InputArgs,
    audio_out: Option<&Path>,
) -> Result<Value, CliError> {
    let input = read_input(&args.input)?;
    let output = run_flow(&TextToSpeechFlow, backend, input).await?;
    let Some(path) = audio_out else {
        return Ok(output);
    };

    let wav = serde_json::from_value::<TextToSpeechOutput>(output)
        .ok()
        .and_then(|o| o.wav_bytes())
        .ok_or(CliError::NoAudio)?;
    std::fs::write(path, &wav).map_err(|source| CliError::Write {
        path: path.display().to_string(),
        source,
    })?;
    info!("Wrote {} bytes of audio to {}", wav.len(), path.display());
    Ok(json!({ "audioFile": path.display().to_string(), "bytes": wav.len() }))
}

async fn dispatch(command: &Command, backend: &dyn ModelBackend) -> Result<Value, CliError> {
    match command {
        Command::Chat(args) => run_flow(&ChatFlow, backend, read_input(&args.input)?).await,
        Command::Crops(args) => {
            run_flow(&CropRecommendationsFlow, backend, read_input(&args.input)?).await
        }
        Command::Summarize(args) => {
            run_flow(&SummarizeActivityLogsFlow, backend, read_input(&args.input)?).await
        }
        Command::Enhance(args) => {
            run_flow(&EnhanceActivityLogFlow, backend, read_input(&args.input)?).await
        }
        Command::Alerts(args) => {
            run_flow(&WeatherAlertsFlow, backend, read_input(&args.input)?).await
        }
        Command::Speak { args, audio_out } => speak(backend, args, audio_out.as_deref()).await,
        Command::Translate(args) => {
            run_flow(&TranslateTextFlow, backend, read_input(&args.input)?).await
        }
        Command::Schema { flow } => schemas(flow.as_deref()),
        Command::Dashboard { crops, weather } => {
            let (report, failure) = dashboard(backend, crops, weather).await;
            match failure {
                None => Ok(report),
                Some(e) => {
                    print_json(&report);
                    Err(e)
                }
            }
        }
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}

async fn run(cli: Cli) -> Result<Value, CliError> {
    if let Command::Schema { flow } = &cli.command {
        return schemas(flow.as_deref());
    }
    let backend = build_backend(&cli)?;
    dispatch(&cli.command, backend.as_ref()).await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(value) => print_json(&value),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
