//! Key layout for the Fjall partitions.
//!
//! - `tasks`: task:{id} -> Task (JSON)

/// Encode a task key: task:{id}
pub fn encode_task_key(id: &str) -> Vec<u8> {
    format!("task:{}", id).into_bytes()
}

/// Decode a task key: task:{id} -> id
pub fn decode_task_key(key: &[u8]) -> Option<String> {
    let key_str = std::str::from_utf8(key).ok()?;
    key_str.strip_prefix("task:").map(String::from)
}
