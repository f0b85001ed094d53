use std::collections::HashMap;

use diesel_async::{AsyncPgConnection, pooled_connection::AsyncDieselConnectionManager};
use serde::{Deserialize, Deserializer};

pub type Pool = bb8::Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;
pub type Conn<'a> = bb8::PooledConnection<'a, AsyncDieselConnectionManager<AsyncPgConnection>>;

pub fn default_server_binding_addr() -> String {
    "127.0.0.1:6969".to_string()
}

pub fn default_top_k() -> usize {
    1
}

/// Deserialize a string map, substituting `${VAR}` references in each value
/// with the matching environment variable.
pub fn deserialize_with_envsubst<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = HashMap::<String, String>::deserialize(deserializer)?;
    // envsubst rejects variables containing its own delimiters.
    let variables: HashMap<String, String> = std::env::vars()
        .filter(|(key, value)| {
            ![key, value]
                .iter()
                .any(|s| s.contains(['$', '{', '}']))
        })
        .collect();
    raw.into_iter()
        .map(|(key, value)| {
            envsubst::substitute(value, &variables)
                .map(|value| (key, value))
                .map_err(serde::de::Error::custom)
        })
        .collect()
}

/// Cosine similarity between two vectors. Mismatched lengths and zero
/// vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_of_parallel_vectors_is_one() {
        let score = cosine_similarity(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_similarity_handles_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn envsubst_replaces_header_values() {
        // SAFETY: tests in this module don't read this variable concurrently.
        unsafe { std::env::set_var("SUPERPUMPED_TEST_API_KEY", "secret") };
        let json = r#"{"Authorization": "Bearer ${SUPERPUMPED_TEST_API_KEY}"}"#;
        let mut deserializer = serde_json::Deserializer::from_str(json);
        let headers = deserialize_with_envsubst(&mut deserializer).expect("valid headers");
        assert_eq!(headers["Authorization"], "Bearer secret");
    }
}
