//! Redis-over-HTTP key-value backend
//!
//! Each command is POSTed as a JSON array (`["SET", "k", "v", "PX", "1000"]`)
//! with a bearer token, and the reply comes back as `{"result": ...}` or
//! `{"error": "..."}`.

use super::backend::KeyValueStore;
use super::types::{BackendType, KeyTtl, SetOptions, StoreError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Remote key-value store reached over a REST endpoint
#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    url: String,
    token: String,
}

impl RestStore {
    /// Create a client for the given endpoint
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::NotAvailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn command(&self, args: Vec<String>) -> Result<Value, StoreError> {
        tracing::debug!("kv command {} against {}", args.first().map_or("", String::as_str), self.url);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body: Value = response.json().await?;
        decode_envelope(status, body)
    }
}

fn decode_envelope(status: u16, body: Value) -> Result<Value, StoreError> {
    if let Some(message) = body.get("error").and_then(Value::as_str) {
        return Err(StoreError::Command(message.to_string()));
    }
    if !(200..300).contains(&status) {
        return Err(StoreError::Connection(format!("HTTP {}", status)));
    }
    match body {
        Value::Object(mut map) => Ok(map.remove("result").unwrap_or(Value::Null)),
        other => Err(StoreError::Protocol(format!("expected reply object, got {}", other))),
    }
}

fn optional_string(value: Value) -> Result<Option<String>, StoreError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(StoreError::Protocol(format!("expected string, got {}", other))),
    }
}

fn integer(value: Value) -> Result<i64, StoreError> {
    let parsed = match &value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| StoreError::Protocol(format!("expected integer, got {}", value)))
}

fn string_list(value: Value) -> Result<Vec<String>, StoreError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| {
                optional_string(item)?
                    .ok_or_else(|| StoreError::Protocol("null entry in list reply".to_string()))
            })
            .collect(),
        other => Err(StoreError::Protocol(format!("expected list, got {}", other))),
    }
}

/// `HGETALL` replies arrive either as a flat `[field, value, ...]` list or as an object
fn field_map(value: Value) -> Result<HashMap<String, String>, StoreError> {
    match value {
        Value::Object(map) => map
            .into_iter()
            .map(|(field, value)| {
                let value = optional_string(value)?.unwrap_or_default();
                Ok((field, value))
            })
            .collect(),
        other => {
            let flat = string_list(other)?;
            if flat.len() % 2 != 0 {
                return Err(StoreError::Protocol(
                    "odd number of entries in hash reply".to_string(),
                ));
            }
            Ok(flat
                .chunks_exact(2)
                .map(|pair| (pair[0].clone(), pair[1].clone()))
                .collect())
        }
    }
}

fn millis(ttl: Duration) -> String {
    ttl.as_millis().max(1).to_string()
}

fn set_command(key: &str, value: &str, options: &SetOptions) -> Vec<String> {
    let mut args = vec!["SET".to_string(), key.to_string(), value.to_string()];
    if options.keep_ttl {
        args.push("KEEPTTL".to_string());
    } else if let Some(ttl) = options.ttl {
        args.push("PX".to_string());
        args.push(millis(ttl));
    }
    if options.nx {
        args.push("NX".to_string());
    } else if options.xx {
        args.push("XX".to_string());
    }
    args
}

fn owned(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[async_trait]
impl KeyValueStore for RestStore {
    fn backend_type(&self) -> BackendType {
        BackendType::Rest
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        optional_string(self.command(owned(&["GET", key])).await?)
    }

    async fn set(&self, key: &str, value: &str, options: &SetOptions) -> Result<bool, StoreError> {
        // A conditional SET that did not apply replies with null
        let reply = self.command(set_command(key, value, options)).await?;
        Ok(!reply.is_null())
    }

    async fn del(&self, key: &str) -> Result<u64, StoreError> {
        let removed = integer(self.command(owned(&["DEL", key])).await?)?;
        Ok(removed.max(0) as u64)
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        optional_string(self.command(owned(&["HGET", key, field])).await?)
    }

    async fn hset(&self, key: &str, fields: &[(String, String)]) -> Result<u64, StoreError> {
        if fields.is_empty() {
            return Ok(0);
        }
        let mut args = owned(&["HSET", key]);
        for (field, value) in fields {
            args.push(field.clone());
            args.push(value.clone());
        }
        let added = integer(self.command(args).await?)?;
        Ok(added.max(0) as u64)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        field_map(self.command(owned(&["HGETALL", key])).await?)
    }

    async fn hkeys(&self, key: &str) -> Result<Vec<String>, StoreError> {
        string_list(self.command(owned(&["HKEYS", key])).await?)
    }

    async fn hincrby(&self, key: &str, field: &str, by: i64) -> Result<i64, StoreError> {
        let by = by.to_string();
        integer(self.command(owned(&["HINCRBY", key, field, by.as_str()])).await?)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let ms = millis(ttl);
        Ok(integer(self.command(owned(&["PEXPIRE", key, ms.as_str()])).await?)? == 1)
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        let reply = integer(self.command(owned(&["PTTL", key])).await?)?;
        Ok(KeyTtl::from_redis_millis(reply))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(integer(self.command(owned(&["EXISTS", key])).await?)? > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        match self.command(owned(&["PING"])).await? {
            Value::String(reply) if reply.eq_ignore_ascii_case("pong") => Ok(()),
            other => Err(StoreError::Protocol(format!("unexpected PING reply {}", other))),
        }
    }
}
