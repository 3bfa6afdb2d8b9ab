use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::core::catalog::{self, MODEL_CATALOG};
use crate::core::config::Config;
use crate::ui::chat_loop::{run_chat, RuntimeOptions};

#[derive(Parser)]
#[command(name = "palaver")]
#[command(version)]
#[command(about = "A full-screen terminal chat interface for a multi-model chat backend")]
#[command(long_about = "Palaver is a full-screen terminal chat client that connects to a \
multi-model chat backend for real-time conversations. Assistant replies stream in \
incrementally over server-sent events; a legacy non-streaming mode is available \
with --no-stream.\n\n\
Environment Variables:\n\
  PALAVER_TOKEN     Bearer token sent with each request (optional)\n\
  RUST_LOG          Diagnostic log filter (tracing syntax)\n\n\
Controls:\n\
  Type              Enter your message in the input field\n\
  Enter             Send the message\n\
  Esc               Cancel the in-flight response\n\
  Ctrl+P            Switch to the next catalog model (idle only)\n\
  Ctrl+Y            Copy the last reply to the clipboard\n\
  Up/Down/Mouse     Scroll through the transcript\n\
  Ctrl+C            Quit")]
struct Args {
    #[arg(short, long, help = "Model identifier (see --list-models)")]
    model: Option<String>,

    #[arg(short, long, help = "Chat backend base URL")]
    base_url: Option<String>,

    #[arg(short, long, help = "Sampling temperature (0.0..=2.0)")]
    temperature: Option<f32>,

    #[arg(long, help = "Use the legacy non-streaming chat endpoint")]
    no_stream: bool,

    #[arg(short, long, help = "Append the conversation transcript to this file")]
    log: Option<String>,

    #[arg(long, help = "Print the model catalog and exit")]
    list_models: bool,
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if args.list_models {
        print_model_catalog();
        return Ok(());
    }

    let config = Config::load()?;

    let model_id = args.model.unwrap_or_else(|| config.default_model());
    if catalog::find(&model_id).is_none() {
        return Err(format!("unknown model `{model_id}` (see --list-models)").into());
    }

    let temperature = args.temperature.unwrap_or_else(|| config.temperature());
    if !(0.0..=2.0).contains(&temperature) {
        return Err(format!("temperature {temperature} out of range (0.0..=2.0)").into());
    }

    let options = RuntimeOptions {
        model_id,
        base_url: args.base_url.unwrap_or_else(|| config.base_url()),
        temperature,
        streaming: !args.no_stream,
        log_file: args.log.or(config.log_file),
        auth_token: std::env::var("PALAVER_TOKEN").ok(),
    };

    run_chat(options).await
}

fn print_model_catalog() {
    println!("Available models:");
    for model in MODEL_CATALOG {
        let tier = if model.premium { "premium" } else { "free" };
        println!(
            "  {:<48} {} ({}, {})",
            model.id,
            model.label,
            model.provider.label(),
            tier
        );
    }
}
