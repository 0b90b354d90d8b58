//! Pods CLI - deploy and manage vision-language model pods on RunPod.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pod_config::profile::{self, ModelProfile};
use pod_config::{load_dotenv, EnvSource, Requirement, Settings};
use pods::deploy::{build_create_request, DeployOverrides};
use pods::inference::ask::{ask_batch, read_questions_file, Conversation};
use pods::inference::image::ImageInput;
use pods::inference::ocr::{ocr_image, render_results, OcrFormat};
use pods::inference::pdf;
use pods::inference::InferenceClient;
use pods::output;
use pods::runpod::RunPod;
use pods::startup::{render_startup_script, StartupOptions, DEFAULT_POLL_INTERVAL_SECS};
use pods::{PodProvider, StartupPayload};

/// Pods CLI - Deploy vision-language models on RunPod GPU pods.
#[derive(Parser)]
#[command(name = "pods")]
#[command(version)]
#[command(about = "Deploy and manage vLLM + Open WebUI pods on RunPod")]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    /// Load environment from this file instead of `./.env`.
    #[arg(long, global = true, env = "PODS_ENV_FILE")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a pod for a model profile.
    Create {
        /// Model profile (see `pods profiles`).
        #[arg(long, short)]
        profile: String,

        /// Restrict GPU candidates (substring match, repeatable).
        #[arg(long, value_delimiter = ',')]
        gpu: Vec<String>,

        /// Pod name (defaults to the profile's).
        #[arg(long)]
        name: Option<String>,

        /// Boot script to ship instead of the generated one.
        #[arg(long)]
        startup_script: Option<PathBuf>,

        /// Seconds between readiness probes in the generated boot script.
        #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
        poll_interval_secs: u64,

        /// Require a login on Open WebUI.
        #[arg(long, default_value = "false")]
        enable_ui_auth: bool,

        /// Print the request (secrets masked) without sending it.
        #[arg(long, default_value = "false")]
        dry_run: bool,
    },

    /// List pods.
    List,

    /// Start a stopped pod.
    Start {
        /// Pod ID. Without it, pick from the stopped pods.
        pod_id: Option<String>,
    },

    /// Stop a pod, or delete it with --delete.
    Stop {
        /// Pod ID.
        pod_id: String,

        /// Permanently delete instead of stopping.
        #[arg(long, default_value = "false")]
        delete: bool,
    },

    /// List built-in model profiles.
    Profiles,

    /// Ask questions about an image.
    Ask {
        /// Image file (JPEG, PNG, WebP, ...).
        image: PathBuf,

        /// Questions, each quoted.
        questions: Vec<String>,

        /// Model profile of the pod to query.
        #[arg(long, short, default_value = "qwen3-vl")]
        profile: String,

        /// File with one question per line (`#` starts a comment).
        #[arg(long, short = 'f')]
        questions_file: Option<PathBuf>,

        /// Multi-turn conversation instead of a single batch.
        #[arg(long, short, default_value = "false")]
        interactive: bool,

        /// Write the JSON answers here instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Extract text from images or PDF pages.
    Ocr {
        /// Image or PDF files.
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// PDF pages to process: 3, 1-5 or 2,4,7-9 (default: all).
        #[arg(long)]
        pages: Option<String>,

        /// Model profile of the pod to query.
        #[arg(long, short, default_value = "qwen3-vl")]
        profile: String,

        /// Output format: text, html or json.
        #[arg(long, default_value = "text")]
        format: OcrFormat,

        /// Write the result here instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

impl Commands {
    fn requirement(&self) -> Requirement {
        match self {
            Self::Create { .. } => Requirement::Deploy,
            Self::Ask { .. } | Self::Ocr { .. } | Self::Profiles => Requirement::Inference,
            Self::List | Self::Start { .. } | Self::Stop { .. } => Requirement::Lifecycle,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configuration is complete before any request goes out.
    load_dotenv(cli.env_file.as_deref()).context("Failed to load environment file")?;
    let settings = Settings::load(&EnvSource, cli.command.requirement())
        .context("Configuration error")?;

    match cli.command {
        Commands::Create {
            profile,
            gpu,
            name,
            startup_script,
            poll_interval_secs,
            enable_ui_auth,
            dry_run,
        } => {
            let profile = profile::resolve(&profile)?;
            let payload = match startup_script {
                Some(path) => StartupPayload::from_path(&path)?,
                None => {
                    let options = StartupOptions {
                        poll_interval_secs,
                        enable_ui_auth,
                    };
                    StartupPayload::new(&render_startup_script(profile, &options)?)?
                }
            };
            if !enable_ui_auth {
                warn!("Open WebUI will run without authentication; pass --enable-ui-auth for public pods");
            }

            let overrides = DeployOverrides { gpus: gpu, name };
            let request = build_create_request(profile, &settings, &overrides, &payload)?;
            print!("{}", output::render_create_plan(&request));

            if dry_run {
                println!("{}", serde_json::to_string_pretty(&request.redacted())?);
                return Ok(());
            }

            let pod = provider(&settings)?.create_pod(request).await?;
            print!("{}", output::render_created(&pod, profile));
        }

        Commands::List => {
            let pods = provider(&settings)?.list_pods().await?;
            println!("{}", output::render_pod_list(&pods));
        }

        Commands::Start { pod_id } => {
            let provider = provider(&settings)?;
            let id = match pod_id {
                Some(id) => id,
                None => match pick_stopped_pod(&provider).await? {
                    Some(id) => id,
                    None => {
                        println!("No stopped pods to start.");
                        return Ok(());
                    }
                },
            };
            provider.start_pod(&id).await?;
            println!("{}", output::render_started(&id));
        }

        Commands::Stop { pod_id, delete } => {
            let outcome = provider(&settings)?.halt_pod(&pod_id, delete).await?;
            println!("{}", output::render_halt(outcome, &pod_id));
        }

        Commands::Profiles => {
            print!("{}", output::render_profiles(profile::all()));
        }

        Commands::Ask {
            image,
            questions,
            profile,
            questions_file,
            interactive,
            output,
        } => {
            let profile = profile::resolve(&profile)?;
            let client = inference_client(&settings, profile)?;
            let image = ImageInput::load(&image)?;

            if interactive {
                return run_conversation(&client, &image).await;
            }

            let mut questions = questions;
            if let Some(path) = questions_file {
                questions.extend(read_questions_file(&path)?);
            }
            let answers = ask_batch(&client, &image, &questions).await?;
            write_output(&serde_json::to_string_pretty(&answers)?, output.as_deref())?;
        }

        Commands::Ocr {
            images,
            pages,
            profile,
            format,
            output,
        } => {
            let profile = profile::resolve(&profile)?;
            let client = inference_client(&settings, profile)?;

            let mut inputs = Vec::new();
            for path in &images {
                inputs.extend(load_ocr_inputs(path, pages.as_deref(), images.len() > 1).await?);
            }

            let mut results = Vec::with_capacity(inputs.len());
            for image in inputs {
                let result = ocr_image(&client, &image, format)
                    .await
                    .with_context(|| format!("OCR failed for {}", image.label))?;
                results.push((image.label, result));
            }
            write_output(&render_results(format, results)?, output.as_deref())?;
        }
    }

    Ok(())
}

fn provider(settings: &Settings) -> Result<RunPod> {
    RunPod::with_base_url(settings.api_key(), settings.api_url())
        .context("Failed to create RunPod provider")
}

fn inference_client(settings: &Settings, profile: &ModelProfile) -> Result<InferenceClient> {
    let pod_id = settings.pod_id(profile)?;
    info!(profile = profile.name, pod_id = %pod_id, "using pod");
    InferenceClient::for_pod(profile, pod_id).context("Failed to create inference client")
}

async fn pick_stopped_pod(provider: &RunPod) -> Result<Option<String>> {
    let stopped: Vec<_> = provider
        .list_pods()
        .await?
        .into_iter()
        .filter(|p| p.status.is_startable())
        .collect();
    if stopped.is_empty() {
        return Ok(None);
    }

    let items: Vec<String> = stopped
        .iter()
        .map(|p| {
            format!(
                "{}  {}  {}",
                p.id,
                p.name,
                p.gpu.as_deref().unwrap_or("N/A")
            )
        })
        .collect();
    let idx = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select a pod to start")
        .default(0)
        .items(&items)
        .interact()?;
    Ok(Some(stopped[idx].id.clone()))
}

async fn run_conversation(client: &InferenceClient, image: &ImageInput) -> Result<()> {
    println!("Image: {} (model: {})", image.label, client.model());
    println!("Ask questions about it; an empty line or `quit` ends the session.\n");

    let theme = ColorfulTheme::default();
    let mut conversation = Conversation::new(client, image);
    loop {
        let Ok(question) = Input::<String>::with_theme(&theme)
            .with_prompt("Question")
            .allow_empty(true)
            .interact_text()
        else {
            break;
        };
        let question = question.trim();
        if question.is_empty() || matches!(question, "quit" | "exit" | "q") {
            break;
        }

        conversation
            .ask(question, |delta| {
                print!("{delta}");
                let _ = std::io::stdout().flush();
            })
            .await?;
        println!("\n");
    }
    info!(turns = conversation.turns(), "conversation ended");
    Ok(())
}

/// Images load as one input; PDFs as one input per selected page, labelled
/// `page N` (prefixed with the file name when several files are given).
async fn load_ocr_inputs(
    path: &Path,
    pages: Option<&str>,
    several: bool,
) -> Result<Vec<ImageInput>> {
    if !pdf::is_pdf(path) {
        if pages.is_some() {
            warn!(path = %path.display(), "--pages only applies to PDF input, ignored");
        }
        return Ok(vec![ImageInput::load(path)?]);
    }

    let mut inputs = pdf::load_pages(path, pages)
        .await
        .with_context(|| format!("Failed to read pages of {}", path.display()))?;
    if several {
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        for input in &mut inputs {
            input.label = format!("{name} {}", input.label);
        }
    }
    Ok(inputs)
}

fn write_output(content: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "result written");
        }
        None => println!("{content}"),
    }
    Ok(())
}
