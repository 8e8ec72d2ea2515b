//! MCP (stdio) surface over the search service.

pub mod handlers;

pub use handlers::SearchMcpServer;

use anyhow::Result;
use rmcp::transport::io::stdio;
use rmcp::ServiceExt;

/// Serve `server` over stdin/stdout until the client disconnects.
pub async fn run_server(server: SearchMcpServer) -> Result<()> {
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
