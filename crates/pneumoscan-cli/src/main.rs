//! Pneumoscan CLI: preprocess chest X-rays and submit them for classification.
//!
//! Set PNEUMOSCAN_API_URL (or API_URL) and PNEUMOSCAN_HEATMAP_URL; set
//! PNEUMOSCAN_API_KEY when the services require auth.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pneumoscan_api_client::DiagnosticsApi;
use pneumoscan_cli::render::render_analysis;
use pneumoscan_cli::{init_tracing, load_upload_file, log_app_error, AnalysisSession, PreprocessSummary};
use pneumoscan_core::{ClientConfig, ErrorMetadata, FormAction, HeatmapRequest};
use pneumoscan_processing::ImagePreprocessor;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "pneumoscan", about = "Chest X-ray analysis CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run upload preprocessing locally and report what would be sent
    Preprocess {
        /// Path to the image
        file: PathBuf,
        /// Write the bytes that would be uploaded to this path
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Preprocess, upload and classify an image
    Analyze {
        /// Path to the image
        file: PathBuf,
        /// Initial diagnosis to send as clinical context
        #[arg(long)]
        diagnosis: Option<String>,
        /// Symptom to send as clinical context (repeatable)
        #[arg(long = "symptom")]
        symptoms: Vec<String>,
        /// Also request a heat-map once classification succeeds
        #[arg(long)]
        heatmap: bool,
        /// Print the form state as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Request a heat-map for an already analyzed image
    Heatmap {
        /// Image identifier returned by the analysis
        #[arg(long)]
        cloudinary_id: String,
        /// Model name returned by the analysis
        #[arg(long)]
        model_name: String,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    let config = ClientConfig::from_env()
        .context("Invalid configuration. Check the PNEUMOSCAN_* environment variables")?;

    match cli.command {
        Commands::Preprocess { file, output } => {
            let upload = load_upload_file(&file)
                .await
                .with_context(|| format!("Read {}", file.display()))?;
            let outcome = ImagePreprocessor::new(config.preprocess.clone())
                .preprocess(upload)
                .await;

            if let Some(path) = output {
                tokio::fs::write(&path, &outcome.file().data)
                    .await
                    .with_context(|| format!("Write {}", path.display()))?;
            }
            print_json(&PreprocessSummary::from(&outcome))?;
        }
        Commands::Analyze {
            file,
            diagnosis,
            symptoms,
            heatmap,
            json,
        } => {
            let upload = load_upload_file(&file)
                .await
                .with_context(|| format!("Read {}", file.display()))?;
            let api = DiagnosticsApi::from_config(&config)?;
            let mut session =
                AnalysisSession::new(api, ImagePreprocessor::new(config.preprocess.clone()));

            let outcome = session.select_file(upload).await;
            tracing::debug!(reencoded = outcome.is_reencoded(), "File prepared for upload");

            if let Some(diagnosis) = diagnosis {
                session.dispatch(FormAction::DiagnosisChanged(diagnosis));
            }
            for symptom in symptoms {
                session.dispatch(FormAction::SymptomAdded(symptom));
            }

            let mut failed = session.submit().await.is_err();
            if !failed && heatmap {
                failed = session.request_heatmap().await.is_err();
            }

            if json {
                print_json(session.state())?;
            } else {
                print!("{}", render_analysis(session.state()));
            }

            if failed {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Heatmap {
            cloudinary_id,
            model_name,
        } => {
            let request = match HeatmapRequest::new(cloudinary_id, model_name) {
                Ok(request) => request,
                Err(err) => {
                    log_app_error(&err, "Invalid heat-map request");
                    eprintln!("--cloudinary-id and --model-name must not be blank");
                    return Ok(ExitCode::FAILURE);
                }
            };
            let api = DiagnosticsApi::from_config(&config)?;
            match api.generate_heatmap(&request).await {
                Ok(url) => print_json(&serde_json::json!({ "eigencam_url": url }))?,
                Err(err) => {
                    log_app_error(&err, "Heat-map generation failed");
                    eprintln!("{}", err.client_message());
                    if let Some(action) = err.suggested_action() {
                        eprintln!("{}", action);
                    }
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
