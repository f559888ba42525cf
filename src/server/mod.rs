pub mod api;

use crate::cli::Args;
use crate::relay::Relay;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

/// Which routing convention `/api/chat` follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteVariant {
    /// Handler sees every method and answers non-POST with 405 itself.
    Pages,
    /// Router binds POST only and rejects the rest on its own.
    App,
}

impl RouteVariant {
    pub fn default_model(&self) -> &'static str {
        match self {
            RouteVariant::Pages => "gpt-4",
            RouteVariant::App => "gpt-3.5-turbo",
        }
    }
}

impl fmt::Display for RouteVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteVariant::Pages => write!(f, "pages"),
            RouteVariant::App => write!(f, "app"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseRouteVariantError {
    message: String,
}

impl fmt::Display for ParseRouteVariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseRouteVariantError {}

impl FromStr for RouteVariant {
    type Err = ParseRouteVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pages" => Ok(RouteVariant::Pages),
            "app" => Ok(RouteVariant::App),
            _ =>
                Err(ParseRouteVariantError {
                    message: format!("Invalid route variant: '{}' (expected 'pages' or 'app')", s),
                }),
        }
    }
}

pub struct Server {
    relay: Relay,
    variant: RouteVariant,
    args: Args,
}

impl Server {
    pub fn new(relay: Relay, variant: RouteVariant, args: Args) -> Self {
        Self { relay, variant, args }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        api::start_http_server(
            self.relay.clone(),
            self.variant,
            self.args.clone(),
        ).await
    }
}
