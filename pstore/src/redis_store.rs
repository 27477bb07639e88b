//! Redis-backed document store.

use redis::Client;
use redis::aio::ConnectionManager;
use tokio::sync::OnceCell;

use pcommon::BoxFuture;

use crate::backend::DocumentStore;
use crate::error::StoreError;

const SCAN_BATCH: usize = 100;

/// Connects lazily on first use and reuses one multiplexed connection.
pub struct RedisDocumentStore {
    client: Client,
    connection: OnceCell<ConnectionManager>,
}

impl RedisDocumentStore {
    pub fn open(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url)
            .map_err(|err| StoreError::invalid_config(format!("invalid redis url: {err}")))?;

        Ok(Self {
            client,
            connection: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                tracing::debug!("opening redis connection manager");
                ConnectionManager::new(self.client.clone())
                    .await
                    .map_err(|err| StoreError::connection(err.to_string()))
            })
            .await?;

        Ok(manager.clone())
    }
}

/// `SCAN MATCH` pattern for every key under `prefix`, taken literally.
fn match_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('*');
    pattern
}

impl DocumentStore for RedisDocumentStore {
    fn scan_keys<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, Result<Vec<String>, StoreError>> {
        Box::pin(async move {
            let mut conn = self.connection().await?;
            let pattern = match_pattern(prefix);
            let mut cursor: u64 = 0;
            let mut keys = Vec::new();

            loop {
                let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(SCAN_BATCH)
                    .query_async(&mut conn)
                    .await?;

                keys.extend(batch);
                if next == 0 {
                    break;
                }
                cursor = next;
            }

            keys.sort();
            keys.dedup();
            Ok(keys)
        })
    }

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        Box::pin(async move {
            let mut conn = self.connection().await?;
            let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
            Ok(value)
        })
    }

    fn put<'a>(&'a self, key: &'a str, json: String) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let mut conn = self.connection().await?;
            let _: () = redis::cmd("SET")
                .arg(key)
                .arg(json)
                .query_async(&mut conn)
                .await?;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool, StoreError>> {
        Box::pin(async move {
            let mut conn = self.connection().await?;
            let removed: u64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
            Ok(removed > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::match_pattern;

    #[test]
    fn prefix_glob_characters_are_escaped() {
        assert_eq!(match_pattern("prompt-shell:tools:"), "prompt-shell:tools:*");
        assert_eq!(match_pattern("team[a]:*?:"), r"team\[a\]:\*\?:*");
        assert_eq!(match_pattern(r"odd\key:"), r"odd\\key:*");
    }
}
