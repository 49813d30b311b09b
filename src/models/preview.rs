//! 临时预览引用
//!
//! 选中文件时生成一个 `blob:` 引用供界面预览，替换文件或流程销毁时必须释放。
//! `PreviewUrl` 是唯一持有者，drop 即释放。

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// 预览引用注册表
///
/// 可以 clone，所有 clone 共享同一张表
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    entries: Arc<Mutex<HashMap<String, Arc<[u8]>>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为一段内容创建新的预览引用
    pub fn create(&self, content: Arc<[u8]>) -> PreviewUrl {
        let url = format!("blob:auto-oracle/{}", Uuid::new_v4());
        self.entries.lock().insert(url.clone(), content);
        debug!("创建预览引用: {}", url);
        PreviewUrl {
            url,
            registry: self.clone(),
        }
    }

    /// 解析预览引用，已释放的引用返回 None
    pub fn resolve(&self, url: &str) -> Option<Arc<[u8]>> {
        self.entries.lock().get(url).cloned()
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.entries.lock().contains_key(url)
    }

    /// 当前未释放的引用数量
    pub fn live_count(&self) -> usize {
        self.entries.lock().len()
    }

    fn revoke(&self, url: &str) {
        if self.entries.lock().remove(url).is_some() {
            debug!("释放预览引用: {}", url);
        }
    }
}

impl fmt::Debug for PreviewRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewRegistry")
            .field("live", &self.live_count())
            .finish()
    }
}

/// 预览引用守卫，drop 时释放
pub struct PreviewUrl {
    url: String,
    registry: PreviewRegistry,
}

impl PreviewUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Drop for PreviewUrl {
    fn drop(&mut self) {
        self.registry.revoke(&self.url);
    }
}

impl fmt::Debug for PreviewUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PreviewUrl").field(&self.url).finish()
    }
}

impl fmt::Display for PreviewUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}
