use sha2::{Digest, Sha256};

use crate::models::DocumentFingerprint;

/// 计算文档字节内容的 SHA-256 指纹
pub fn fingerprint(bytes: &[u8]) -> DocumentFingerprint {
    let digest = Sha256::digest(bytes);
    DocumentFingerprint::from_hex(hex::encode(digest))
}
