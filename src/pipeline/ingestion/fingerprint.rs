use sha2::{Digest, Sha256};

/// Hex SHA-256 of the source bytes, logged and reported so a run can be
/// traced back to the exact file it loaded
pub fn source_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_hex() {
        let a = source_sha256(b"user_id,day\n1,2024-01-01\n");
        let b = source_sha256(b"user_id,day\n1,2024-01-01\n");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, source_sha256(b"user_id,day\n2,2024-01-01\n"));
    }
}
