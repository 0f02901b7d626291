use std::path::PathBuf;
use std::sync::Arc;

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;

use super::*;
use crate::playlist::RemoveOutcome;

pub(super) async fn handle_generate_or_append_playlist(
    state: Arc<ServerState>,
    params: GenerateOrAppendPlaylistParams,
) -> Result<CallToolResult, McpError> {
    let result = tokio::task::spawn_blocking(move || -> Result<PathBuf, ToolError> {
        Ok(state
            .store
            .upsert(&params.entries, &params.playlist_name)?)
    })
    .await
    .map_err(|e| mcp_internal_error(format!("join error: {e}")))?;

    let ok = match result {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(kind = e.kind(), error = %e, "generate_or_append_playlist failed");
            false
        }
    };
    json_result(&ok)
}

pub(super) async fn handle_remove_from_playlist(
    state: Arc<ServerState>,
    params: RemoveFromPlaylistParams,
) -> Result<CallToolResult, McpError> {
    let result = tokio::task::spawn_blocking(move || -> Result<RemoveOutcome, ToolError> {
        let path = state.guard.check(&params.path)?;
        Ok(state.store.remove(&path, &params.songs_to_remove)?)
    })
    .await
    .map_err(|e| mcp_internal_error(format!("join error: {e}")))?;

    let ok = match result {
        Ok(outcome) => {
            if outcome.removed == 0 {
                tracing::debug!("remove_from_playlist matched no entries");
            }
            true
        }
        Err(e) => {
            tracing::warn!(kind = e.kind(), error = %e, "remove_from_playlist failed");
            false
        }
    };
    json_result(&ok)
}

pub(super) async fn handle_read_playlist(
    state: Arc<ServerState>,
    params: PathParams,
) -> Result<CallToolResult, McpError> {
    let result = tokio::task::spawn_blocking(move || -> Result<String, ToolError> {
        let path = state.guard.check(&params.path)?;
        Ok(state.store.read(&path)?)
    })
    .await
    .map_err(|e| mcp_internal_error(format!("join error: {e}")))?;

    let text = result.unwrap_or_else(|e| {
        tracing::warn!(kind = e.kind(), error = %e, "read_playlist failed");
        ERROR_SENTINEL.to_string()
    });
    Ok(text_result(text))
}
