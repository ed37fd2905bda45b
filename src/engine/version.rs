use std::sync::atomic::{AtomicU64, Ordering};

/// 执行器版本号分配器,每次创建或重载执行器都会分配新版本
#[derive(Debug)]
pub struct VersionManager {
    current_version: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub version: u64,
    pub timestamp: i64,
}

impl VersionManager {
    pub fn new() -> Self {
        Self {
            current_version: AtomicU64::new(1),
        }
    }

    pub fn create_version(&self) -> Version {
        let version = self.current_version.fetch_add(1, Ordering::SeqCst);
        Version {
            version,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// 下一个将被分配的版本号
    pub fn get_current_version(&self) -> u64 {
        self.current_version.load(Ordering::SeqCst)
    }
}

impl Default for VersionManager {
    fn default() -> Self {
        Self::new()
    }
}
