//! Replaying adapters that serve recorded interactions from cassettes.

pub mod clock;
pub mod id_gen;
pub mod llm;
pub mod repo;

use std::sync::Mutex;

pub use clock::ReplayingClock;
pub use id_gen::ReplayingIdGenerator;
pub use llm::ReplayingLlmClient;
pub use repo::ReplayingRepoStore;

use crate::cassette::replayer::CassetteReplayer;

/// Pops the next recorded output for `port::method` from the replayer.
fn next_output(replayer: &Mutex<CassetteReplayer>, port: &str, method: &str) -> serde_json::Value {
    let mut replayer = replayer.lock().expect("replayer lock poisoned");
    replayer.next_interaction(port, method).output.clone()
}

/// Extracts a Result from a cassette output JSON value.
///
/// Expects `{"ok": <value>}` or `{"err": "message"}`.
fn extract_result<T: serde::de::DeserializeOwned>(
    output: &serde_json::Value,
    context: &str,
) -> Result<T, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(err) = output.get("err") {
        let msg = err.as_str().unwrap_or("unknown error").to_string();
        return Err(msg.into());
    }
    let value = output.get("ok").unwrap_or(output);
    serde_json::from_value(value.clone())
        .map_err(|e| format!("{context}: failed to deserialize: {e}").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_result_unwraps_ok_envelope() {
        let value: String = extract_result(&json!({"ok": "hello"}), "test").unwrap();
        assert_eq!(value, "hello");
    }

    #[test]
    fn extract_result_propagates_err_envelope() {
        let result: Result<String, _> = extract_result(&json!({"err": "boom"}), "test");
        assert!(result.unwrap_err().to_string().contains("boom"));
    }

    #[test]
    fn extract_result_accepts_bare_values() {
        let value: bool = extract_result(&json!(true), "test").unwrap();
        assert!(value);
    }
}
