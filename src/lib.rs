pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod relay;
pub mod server;

use cli::Args;
use config::prompt::resolve_system_prompt;
use llm::LlmConfig;
use llm::chat::openai::OpenAIChatClient;
use log::{ info, warn };
use relay::Relay;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let model = args.model();
    let llm_config = LlmConfig::new(args.openai_api_key.clone(), args.openai_base_url.clone());

    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Route Variant: {}", args.route_variant);
    info!("Chat Model: {}", model);
    info!("Upstream Base URL: {}", llm_config.base_url);
    info!("System Prompt: {}", args.system_prompt_path.as_deref().unwrap_or("built-in"));
    info!("CORS Enabled: {}", args.enable_cors);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    if llm_config.api_key.trim().is_empty() {
        warn!("OPENAI_API_KEY is not set. Upstream requests will be rejected.");
    }

    let system_prompt = resolve_system_prompt(args.system_prompt_path.as_deref())?;
    let client = Arc::new(OpenAIChatClient::from_config(&llm_config)?);
    let relay = Relay::new(client, system_prompt, model);

    let server = Server::new(relay, args.route_variant, args.clone());
    server.run().await?;

    Ok(())
}
