//! Content addressing for derivatives.
//!
//! A derivative is identified by the BLAKE3 hash of its rendered text.
//! Rendering is deterministic, so equal hashes mean byte-identical output,
//! which makes hashes a cheap check that repeated runs agree.

/// A 256-bit BLAKE3 content hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Hash rendered text.
    pub fn of(text: &str) -> Self {
        Self(*blake3::hash(text.as_bytes()).as_bytes())
    }

    /// Display as full hex.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Display as short base-32 (8 characters, 40 bits).
    pub fn to_short(&self) -> String {
        const ALPHABET: &[u8] = b"0123456789abcdefghjkmnpqrstuvwxyz";
        let val = u64::from_be_bytes([
            0, 0, 0, self.0[0], self.0[1], self.0[2], self.0[3], self.0[4],
        ]);
        let mut result = String::with_capacity(8);
        for i in (0..8).rev() {
            let idx = ((val >> (i * 5)) & 0x1F) as usize;
            result.push(ALPHABET[idx] as char);
        }
        result
    }
}

impl std::fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.to_short())
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.to_short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(ContentHash::of("df←{⍺×2}"), ContentHash::of("df←{⍺×2}"));
        assert_ne!(ContentHash::of("df←{⍺×2}"), ContentHash::of("df←{⍺×3}"));
    }

    #[test]
    fn test_hex_matches_blake3() {
        let h = ContentHash::of("");
        assert_eq!(h.to_hex(), blake3::hash(b"").to_hex().to_string());
        assert_eq!(h.to_hex().len(), 64);
    }

    #[test]
    fn test_short_form() {
        let h = ContentHash::of("⍙dw");
        let short = h.to_short();
        assert_eq!(short.len(), 8);
        assert!(short.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(format!("{}", h), format!("#{}", short));
        assert_eq!(ContentHash([0; 32]).to_short(), "00000000");
    }
}
