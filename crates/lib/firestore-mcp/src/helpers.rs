use rmcp::ErrorData;
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

/// Wraps an in-band reply as a successful tool result with JSON content.
pub(crate) fn json_reply<T: Serialize>(reply: T) -> Result<CallToolResult, ErrorData> {
    Ok(CallToolResult::success(vec![Content::json(reply)?]))
}
