use crate::types::{ChainMetadata, RuleError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::RwLock;
use uuid::Uuid;

/// 规则链定义存储
///
/// 引擎在缓存中找不到执行器且调用方未提供规则链定义时,从这里加载。
#[async_trait]
pub trait RuleChainStore: Send + Sync + std::fmt::Debug {
    /// 加载规则链定义,不存在时返回 `None`
    async fn load_metadata(&self, rule_chain_id: Uuid) -> Result<Option<ChainMetadata>, RuleError>;
}

/// 内存规则链存储
#[derive(Debug, Default)]
pub struct InMemoryRuleChainStore {
    chains: RwLock<HashMap<Uuid, ChainMetadata>>,
}

impl InMemoryRuleChainStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存规则链定义,返回被替换的旧定义
    pub async fn save(&self, metadata: ChainMetadata) -> Option<ChainMetadata> {
        self.chains
            .write()
            .await
            .insert(metadata.rule_chain_id, metadata)
    }

    pub async fn remove(&self, rule_chain_id: Uuid) -> Option<ChainMetadata> {
        self.chains.write().await.remove(&rule_chain_id)
    }
}

#[async_trait]
impl RuleChainStore for InMemoryRuleChainStore {
    async fn load_metadata(&self, rule_chain_id: Uuid) -> Result<Option<ChainMetadata>, RuleError> {
        Ok(self.chains.read().await.get(&rule_chain_id).cloned())
    }
}

/// 文件规则链存储,每条规则链对应目录下的一个 `<uuid>.json` 文件
#[derive(Debug, Clone)]
pub struct FileRuleChainStore {
    dir: PathBuf,
}

impl FileRuleChainStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, rule_chain_id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", rule_chain_id))
    }
}

#[async_trait]
impl RuleChainStore for FileRuleChainStore {
    async fn load_metadata(&self, rule_chain_id: Uuid) -> Result<Option<ChainMetadata>, RuleError> {
        let path = self.path_for(rule_chain_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let metadata = ChainMetadata::from_json(&content)?;
        if metadata.rule_chain_id != rule_chain_id {
            return Err(RuleError::Store(format!(
                "文件 {} 中的规则链标识 {} 与请求的 {} 不一致",
                path.display(),
                metadata.rule_chain_id,
                rule_chain_id
            )));
        }
        Ok(Some(metadata))
    }
}
