//! 加密模块
//!
//! 会话密钥管理与 AES-CBC 加解密，用于模拟端到端加密投递。

mod cipher;
mod session;

pub use cipher::{CipherError, EncryptedMessage, IV_LEN, SessionCipher};
pub use session::{SESSION_KEY_LEN, SessionKey, SessionKeyManager};
