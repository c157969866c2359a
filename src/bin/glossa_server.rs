//! Glossa API Server binary
//!
//! HTTP REST API for dictionary-driven spreadsheet translation.

use clap::Parser;
use royalbit_glossa::api::{run_api_server, server::ApiConfig};

#[derive(Parser, Debug)]
#[command(name = "glossa-server")]
#[command(version)]
#[command(author = "RoyalBit Inc. <admin@royalbit.ca>")]
#[command(about = "Glossa API Server - HTTP REST API for spreadsheet term translation")]
#[command(long_about = r#"
Glossa API Server - HTTP REST API

Provides RESTful endpoints for the translation workflow:
  - POST /api/v1/extract   - Extract terms from workbooks into a dictionary
  - POST /api/v1/translate - Fill a dictionary through Gemini or Bailian
  - POST /api/v1/apply     - Rewrite workbooks with a dictionary

Additional endpoints:
  - GET  /health           - Health check
  - GET  /version          - Server version info
  - GET  /                 - API documentation

Features:
  - CORS enabled for cross-origin requests
  - Graceful shutdown on SIGINT/SIGTERM
  - JSON response format with request IDs
  - Tracing and structured logging

Backend credentials are read from GEMINI_API_KEY (or API_KEY), GEMINI_MODEL,
GEMINI_API_URL, BAILIAN_API_KEY, BAILIAN_APP_ID and BAILIAN_API_URL.

Example usage:
  glossa-server                           # Start on localhost:8080
  glossa-server --host 0.0.0.0 --port 3000

  curl -X POST http://localhost:8080/api/v1/extract \
    -H "Content-Type: application/json" \
    -d '{"file_paths": ["report.xlsx"], "dictionary_path": "terms.yaml"}'
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "GLOSSA_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "GLOSSA_PORT")]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ApiConfig {
        host: args.host,
        port: args.port,
    };

    run_api_server(config).await
}
