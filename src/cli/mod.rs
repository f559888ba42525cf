use clap::Parser;

use crate::server::RouteVariant;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Server Args ---
    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:3000")]
    pub server_addr: String,

    /// Routing convention for /api/chat (pages: handler enforces POST, model gpt-4;
    /// app: router enforces POST, model gpt-3.5-turbo)
    #[arg(long, env = "ROUTE_VARIANT", default_value = "pages")]
    pub route_variant: RouteVariant,

    /// Wrap the router in a permissive CORS layer.
    #[arg(long, env = "ENABLE_CORS", default_value = "false")]
    pub enable_cors: bool,

    // --- Upstream Args ---
    /// API key for the OpenAI chat completions API
    #[arg(long, env = "OPENAI_API_KEY", default_value = "", hide_env_values = true)]
    pub openai_api_key: String,

    /// Base URL of the OpenAI-compatible API (the /chat/completions route is appended)
    #[arg(long, env = "OPENAI_BASE_URL")] // No default, LlmConfig falls back to api.openai.com
    pub openai_base_url: Option<String>,

    /// Model override. Defaults to the route variant's model.
    #[arg(long, env = "CHAT_MODEL")]
    pub chat_model: Option<String>,

    /// Optional file whose contents replace the built-in system prompt.
    #[arg(long, env = "SYSTEM_PROMPT_PATH")]
    pub system_prompt_path: Option<String>,

    // --- General App Args ---
    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

impl Args {
    pub fn model(&self) -> String {
        self.chat_model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.route_variant.default_model().to_string())
    }
}
