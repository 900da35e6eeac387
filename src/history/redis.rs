use async_trait::async_trait;
use redis::{ Client, AsyncCommands };
use crate::error::StorageError;
use crate::history::Storage;

pub struct RedisStorage {
    client: Client,
    key_prefix: String,
}

impl RedisStorage {
    pub fn new(url: &str, key_prefix: &str) -> Result<Self, StorageError> {
        Ok(Self {
            client: Client::open(url)?,
            key_prefix: key_prefix.to_string(),
        })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl Storage for RedisStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.get_connection().await?;
        let value: Option<String> = conn.get(self.full_key(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut conn = self.get_connection().await?;
        let _: () = conn.set(self.full_key(key), value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut conn = self.get_connection().await?;
        let _: i64 = conn.del(self.full_key(key)).await?;
        Ok(())
    }
}
