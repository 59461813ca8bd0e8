pub mod cli;
pub mod client;
pub mod llm;
pub mod models;
pub mod prompt;
pub mod server;
pub mod websocket;

use cli::Args;
use llm::gemini::GeminiClient;
use llm::CompletionClient;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Chat Model: {}", args.chat_model.as_deref().unwrap_or(llm::gemini::DEFAULT_MODEL));
    info!("Completion Timeout: {}s", args.completion_timeout_secs);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let completion: Arc<dyn CompletionClient> = Arc::new(GeminiClient::from_args(&args)?);
    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, completion, args.server_api_key.clone(), args.clone());
    server.run().await?;

    Ok(())
}
