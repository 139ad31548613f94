//! Simulated content pinning: a deterministic, CID-looking identifier
//! derived from the note's content. No network involved.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::note::Note;

/// The fields that define a note's pinned content. Field order is
/// fixed so the digest is stable across runs.
#[derive(Serialize)]
struct PinPayload<'a> {
    id: &'a str,
    title: &'a str,
    content: &'a str,
    tags: &'a [String],
}

/// SHA-256 over the canonical payload, rendered as a `bafy`-prefixed
/// hex identifier.
pub fn pin_note(note: &Note) -> Result<String> {
    let id = note.id.to_string();
    let payload = PinPayload {
        id: &id,
        title: &note.title,
        content: &note.content,
        tags: &note.tags,
    };
    let bytes = serde_json::to_vec(&payload)?;

    let digest = Sha256::digest(&bytes);
    let mut pin = String::with_capacity(4 + digest.len() * 2);
    pin.push_str("bafy");
    for byte in digest {
        pin.push_str(&format!("{:02x}", byte));
    }
    Ok(pin)
}
