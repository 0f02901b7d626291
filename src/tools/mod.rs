use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use serde::Serialize;

mod library_handlers;
mod params;
mod playlist_handlers;

use library_handlers::*;
use params::*;
use playlist_handlers::*;

use crate::config::Config;
use crate::guard::{GuardError, PathGuard};
use crate::playlist::{PlaylistError, PlaylistStore};
use crate::tags::TagError;

/// Returned in place of content whenever a read or listing fails.
pub const ERROR_SENTINEL: &str = "An error occurred. Please check the input.";

const INSTRUCTIONS: &str = "Music library and playlist server. Browse the library with \
list_directory or search_files, collect track details with get_metadata, then build \
playlists with generate_or_append_playlist (name the file with a .m3u extension). \
Edit playlists with read_playlist and remove_from_playlist. Check client paths with \
is_allowed_path; every path must live under get_allowed_root.";

fn mcp_internal_error(msg: String) -> McpError {
    McpError::internal_error(msg, None)
}

fn text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json =
        serde_json::to_string_pretty(value).map_err(|e| mcp_internal_error(format!("{e}")))?;
    Ok(text_result(json))
}

/// Failure reasons carried to the log before collapsing to a boundary value.
#[derive(Debug, thiserror::Error)]
enum ToolError {
    #[error(transparent)]
    Guard(#[from] GuardError),
    #[error(transparent)]
    Playlist(#[from] PlaylistError),
    #[error(transparent)]
    Tags(#[from] TagError),
}

impl ToolError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Guard(_) => "path_guard",
            Self::Playlist(_) => "playlist",
            Self::Tags(_) => "tags",
        }
    }
}

/// Inner shared state (not Clone).
struct ServerState {
    config: Config,
    guard: PathGuard,
    store: PlaylistStore,
}

#[derive(Clone)]
pub struct PlaylisterServer {
    state: Arc<ServerState>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl PlaylisterServer {
    pub fn new(config: Config) -> Self {
        Self {
            state: Arc::new(ServerState {
                guard: PathGuard::new(&config),
                store: PlaylistStore::new(&config),
                config,
            }),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "List every file and directory under the library root, categorized as [DIR], [Audio], [Playlist], [Lyrics] or [File]. Paginated."
    )]
    async fn list_directory(
        &self,
        params: Parameters<ListDirectoryParams>,
    ) -> Result<CallToolResult, McpError> {
        handle_list_directory(Arc::clone(&self.state), params.0).await
    }

    #[tool(
        description = "Recursively search the library for files whose names match a pattern (case-insensitive). Mainly used to find audio files and .m3u/.m3u8 playlists."
    )]
    async fn search_files(
        &self,
        params: Parameters<SearchFilesParams>,
    ) -> Result<CallToolResult, McpError> {
        handle_search_files(Arc::clone(&self.state), params.0).await
    }

    #[tool(
        description = "Create a .m3u playlist under <root>/Playlist from track metadata, or append the tracks to it if it already exists. Returns true on success, false otherwise."
    )]
    async fn generate_or_append_playlist(
        &self,
        params: Parameters<GenerateOrAppendPlaylistParams>,
    ) -> Result<CallToolResult, McpError> {
        handle_generate_or_append_playlist(Arc::clone(&self.state), params.0).await
    }

    #[tool(
        description = "Remove songs from a playlist by path. Returns true when the operation completed, even if nothing matched."
    )]
    async fn remove_from_playlist(
        &self,
        params: Parameters<RemoveFromPlaylistParams>,
    ) -> Result<CallToolResult, McpError> {
        handle_remove_from_playlist(Arc::clone(&self.state), params.0).await
    }

    #[tool(description = "Read the raw contents of a playlist file")]
    async fn read_playlist(
        &self,
        params: Parameters<PathParams>,
    ) -> Result<CallToolResult, McpError> {
        handle_read_playlist(Arc::clone(&self.state), params.0).await
    }

    #[tool(
        description = "Get file_path, title and duration for an audio file, or for every audio file beneath a directory. Returns null on error."
    )]
    async fn get_metadata(
        &self,
        params: Parameters<PathParams>,
    ) -> Result<CallToolResult, McpError> {
        handle_get_metadata(Arc::clone(&self.state), params.0).await
    }

    #[tool(
        description = "Check that a path exists and lies inside the library root. Returns true or false."
    )]
    async fn is_allowed_path(
        &self,
        params: Parameters<PathParams>,
    ) -> Result<CallToolResult, McpError> {
        let state = Arc::clone(&self.state);
        let allowed = tokio::task::spawn_blocking(move || state.guard.is_allowed(&params.0.path))
            .await
            .map_err(|e| mcp_internal_error(format!("join error: {e}")))?;
        json_result(&allowed)
    }

    #[tool(description = "Get the library root directory every other tool is confined to")]
    async fn get_allowed_root(&self) -> Result<CallToolResult, McpError> {
        Ok(text_result(
            self.state.guard.allowed_root().display().to_string(),
        ))
    }
}

#[tool_handler]
impl ServerHandler for PlaylisterServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
