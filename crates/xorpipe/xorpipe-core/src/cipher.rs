//! The byte transform is a pluggable collaborator: the emitter/receiver
//! steps call through this trait rather than hardcoding XOR inline, so the
//! coordination substrate stays agnostic to which transform is configured.

/// A symmetric one-byte transform: `reverse(forward(b)) == b` for every `b`.
pub trait ByteCipher {
    fn forward(&self, byte: u8) -> u8;
    fn reverse(&self, byte: u8) -> u8;
}

/// The default (and only shipped) collaborator: XOR with a fixed key. Its
/// own inverse, so `forward` and `reverse` are the same operation.
pub struct XorCipher {
    pub key: u8,
}

impl ByteCipher for XorCipher {
    fn forward(&self, byte: u8) -> u8 {
        byte ^ self.key
    }

    fn reverse(&self, byte: u8) -> u8 {
        byte ^ self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xor_cipher_is_idempotent_under_roundtrip() {
        let c = XorCipher { key: 0x5A };
        for b in 0u8..=255 {
            assert_eq!(c.reverse(c.forward(b)), b);
        }
    }

    #[test]
    fn zero_key_is_the_identity() {
        let c = XorCipher { key: 0x00 };
        assert_eq!(c.forward(0x42), 0x42);
    }
}
