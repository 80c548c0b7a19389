//! 会话密钥管理
//!
//! 每个有序 (src, dst) 对一个 32 字节对称密钥。开启持久化时首次发送创建并缓存，
//! 之后复用；关闭时每次发送生成新密钥且不缓存。密钥只存在内存中，
//! 进程生命周期内不轮换也不过期。

use std::collections::HashMap;

use parking_lot::Mutex;
use rand::RngCore;
use tracing::debug;

use crate::net::NodeId;

/// 会话密钥长度（AES-256）
pub const SESSION_KEY_LEN: usize = 32;

/// 会话对称密钥
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey([u8; SESSION_KEY_LEN]);

impl SessionKey {
    pub fn generate() -> Self {
        let mut key = [0u8; SESSION_KEY_LEN];
        rand::thread_rng().fill_bytes(&mut key);
        Self(key)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// 会话密钥管理器
#[derive(Debug, Default)]
pub struct SessionKeyManager {
    store: Mutex<HashMap<(NodeId, NodeId), SessionKey>>,
}

impl SessionKeyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取 (src, dst) 的会话密钥。
    ///
    /// `persist == false` 时总是返回新密钥；否则查找或在锁内创建，
    /// 保证并发首次发送也只会生成一个密钥。
    pub fn get_or_create_key(&self, src: NodeId, dst: NodeId, persist: bool) -> SessionKey {
        if !persist {
            return SessionKey::generate();
        }
        let mut store = self.store.lock();
        store
            .entry((src, dst))
            .or_insert_with(|| {
                debug!(src = %src, dst = %dst, "创建会话密钥");
                SessionKey::generate()
            })
            .clone()
    }

    /// 已缓存的会话数
    pub fn cached_sessions(&self) -> usize {
        self.store.lock().len()
    }

    /// 丢弃所有缓存的会话密钥
    pub fn clear(&self) {
        self.store.lock().clear();
    }
}
