//! AES-CBC 会话加密
//!
//! 支持 16/24/32 字节密钥（AES-128/192/256），每次加密生成新的 16 字节随机 IV，
//! 明文使用 PKCS#7 填充。解密失败（填充错误、密文未按块对齐、明文不是 UTF-8）
//! 是预期内的结果，以 [`CipherError`] 返回。

use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

/// IV 长度（AES 块大小）
pub const IV_LEN: usize = 16;

/// 加密组件错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// 密钥长度不是 16/24/32 字节
    #[error("invalid key length: expected 16, 24 or 32 bytes, got {actual}")]
    InvalidKeyLength { actual: usize },

    /// 填充不合法或密文长度不是块大小的整数倍
    #[error("decrypt failure: malformed padding")]
    BadPadding,

    /// 解密结果不是合法的 UTF-8 文本
    #[error("decrypt failure: plaintext is not valid UTF-8 ({0})")]
    InvalidUtf8(String),
}

impl CipherError {
    /// 错误种类名
    pub fn kind(&self) -> &'static str {
        match self {
            CipherError::InvalidKeyLength { .. } => "InvalidKeyLength",
            CipherError::BadPadding => "BadPadding",
            CipherError::InvalidUtf8(_) => "InvalidUtf8",
        }
    }

    /// 是否为解密失败（区别于构造期的密钥长度错误）
    pub fn is_decrypt_failure(&self) -> bool {
        matches!(self, CipherError::BadPadding | CipherError::InvalidUtf8(_))
    }
}

/// 一次加密的输出：密文和 IV
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedMessage {
    pub ciphertext: Vec<u8>,
    pub iv: [u8; IV_LEN],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeySize {
    Aes128,
    Aes192,
    Aes256,
}

/// 绑定单个密钥的 AES-CBC 加解密器
#[derive(Clone)]
pub struct SessionCipher {
    key: Vec<u8>,
    size: KeySize,
}

impl std::fmt::Debug for SessionCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 不输出密钥本身
        f.debug_struct("SessionCipher")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl SessionCipher {
    pub fn new(key: &[u8]) -> Result<Self, CipherError> {
        let size = match key.len() {
            16 => KeySize::Aes128,
            24 => KeySize::Aes192,
            32 => KeySize::Aes256,
            actual => return Err(CipherError::InvalidKeyLength { actual }),
        };
        Ok(Self {
            key: key.to_vec(),
            size,
        })
    }

    /// 密钥长度（字节）
    pub fn key_len(&self) -> usize {
        self.key.len()
    }

    /// 以新生成的随机 IV 加密 UTF-8 文本
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedMessage, CipherError> {
        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);
        let ciphertext = self.encrypt_with_iv(plaintext.as_bytes(), &iv)?;
        trace!(pt_len = plaintext.len(), ct_len = ciphertext.len(), "加密完成");
        Ok(EncryptedMessage { ciphertext, iv })
    }

    fn encrypt_with_iv(&self, pt: &[u8], iv: &[u8; IV_LEN]) -> Result<Vec<u8>, CipherError> {
        let invalid = |_| CipherError::InvalidKeyLength {
            actual: self.key.len(),
        };
        let ct = match self.size {
            KeySize::Aes128 => cbc::Encryptor::<Aes128>::new_from_slices(&self.key, iv)
                .map_err(invalid)?
                .encrypt_padded_vec_mut::<Pkcs7>(pt),
            KeySize::Aes192 => cbc::Encryptor::<Aes192>::new_from_slices(&self.key, iv)
                .map_err(invalid)?
                .encrypt_padded_vec_mut::<Pkcs7>(pt),
            KeySize::Aes256 => cbc::Encryptor::<Aes256>::new_from_slices(&self.key, iv)
                .map_err(invalid)?
                .encrypt_padded_vec_mut::<Pkcs7>(pt),
        };
        Ok(ct)
    }

    /// 用同一密钥和加密时的 IV 解密
    pub fn decrypt(&self, msg: &EncryptedMessage) -> Result<String, CipherError> {
        let invalid = |_| CipherError::InvalidKeyLength {
            actual: self.key.len(),
        };
        let ct = msg.ciphertext.as_slice();
        let pt = match self.size {
            KeySize::Aes128 => cbc::Decryptor::<Aes128>::new_from_slices(&self.key, &msg.iv)
                .map_err(invalid)?
                .decrypt_padded_vec_mut::<Pkcs7>(ct),
            KeySize::Aes192 => cbc::Decryptor::<Aes192>::new_from_slices(&self.key, &msg.iv)
                .map_err(invalid)?
                .decrypt_padded_vec_mut::<Pkcs7>(ct),
            KeySize::Aes256 => cbc::Decryptor::<Aes256>::new_from_slices(&self.key, &msg.iv)
                .map_err(invalid)?
                .decrypt_padded_vec_mut::<Pkcs7>(ct),
        }
        .map_err(|_| CipherError::BadPadding)?;
        String::from_utf8(pt).map_err(|e| CipherError::InvalidUtf8(e.to_string()))
    }
}
