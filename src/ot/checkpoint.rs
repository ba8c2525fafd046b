// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Snapshots of a document that can be restored later.
//!
//! A checkpoint carries a blake3 digest of the version and content so that a
//! snapshot that was altered after it was taken is refused on restore.

use std::time::SystemTime;

use super::op::DocumentState;

/// Type constant for checkpoint digests.
pub const TYPE_CHECKPOINT: u8 = 0x10;

/// A blake3 digest, 32 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest(pub [u8; 32]);

/// Hash a document state with domain separation.
pub fn digest(state: &DocumentState) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[TYPE_CHECKPOINT]);
    hasher.update(&state.version.to_le_bytes());
    hasher.update(&(state.content.len() as u64).to_le_bytes());
    hasher.update(state.content.as_bytes());
    return Digest(*hasher.finalize().as_bytes());
}

#[derive(Clone, Debug)]
pub struct Checkpoint {
    pub state: DocumentState,
    pub taken_at: SystemTime,
    pub digest: Digest,
}

impl Checkpoint {
    pub fn new(state: DocumentState) -> Checkpoint {
        let digest = digest(&state);
        return Checkpoint {
            state,
            taken_at: SystemTime::now(),
            digest,
        };
    }

    pub fn version(&self) -> u64 {
        return self.state.version;
    }

    /// True if the contents still match the digest taken with them.
    pub fn verify(&self) -> bool {
        return digest(&self.state) == self.digest;
    }
}

fn hex(bytes: &[u8]) -> String {
    return bytes.iter().map(|b| format!("{:02x}", b)).collect();
}

impl std::fmt::Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "Digest({})", hex(&self.0));
    }
}
