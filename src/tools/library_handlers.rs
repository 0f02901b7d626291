use std::sync::Arc;

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;

use super::*;
use crate::library;
use crate::tags;
use crate::types::TrackMetadata;

const DEFAULT_PAGE_SIZE: u32 = 100;

pub(super) async fn handle_list_directory(
    state: Arc<ServerState>,
    params: ListDirectoryParams,
) -> Result<CallToolResult, McpError> {
    let page = params.page.unwrap_or(1);
    let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page == 0 || page_size == 0 {
        tracing::debug!(page, page_size, "empty page requested");
        return Ok(text_result(library::last_page_notice(page as usize)));
    }

    let listing = tokio::task::spawn_blocking(move || {
        library::list_page(state.config.root(), page as usize, page_size as usize)
    })
    .await
    .map_err(|e| mcp_internal_error(format!("join error: {e}")))?;

    let text = match listing {
        Ok(Some(lines)) => lines.join("\n"),
        Ok(None) => library::last_page_notice(page as usize),
        Err(e) => {
            tracing::warn!(error = %e, "list_directory failed");
            ERROR_SENTINEL.to_string()
        }
    };
    Ok(text_result(text))
}

pub(super) async fn handle_search_files(
    state: Arc<ServerState>,
    params: SearchFilesParams,
) -> Result<CallToolResult, McpError> {
    let matches = tokio::task::spawn_blocking(move || {
        library::search(state.config.root(), &params.pattern)
    })
    .await
    .map_err(|e| mcp_internal_error(format!("join error: {e}")))?;

    let lines: Vec<String> = matches.iter().map(ToString::to_string).collect();
    Ok(text_result(lines.join("\n")))
}

pub(super) async fn handle_get_metadata(
    state: Arc<ServerState>,
    params: PathParams,
) -> Result<CallToolResult, McpError> {
    let result = tokio::task::spawn_blocking(
        move || -> Result<Vec<TrackMetadata>, ToolError> {
            let path = state.guard.check(&params.path)?;
            Ok(tags::read_metadata(&path)?)
        },
    )
    .await
    .map_err(|e| mcp_internal_error(format!("join error: {e}")))?;

    match result {
        Ok(records) => json_result(&records),
        Err(e) => {
            tracing::warn!(kind = e.kind(), error = %e, "get_metadata failed");
            json_result(&serde_json::Value::Null)
        }
    }
}
