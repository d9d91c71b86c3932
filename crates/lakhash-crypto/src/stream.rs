//! Ratcheted ChaCha20 stream layer
//!
//! Data is processed in 256 KiB chunks. Every chunk, the first included,
//! gets a fresh key and 64-bit nonce from one ratchet step, and its
//! keystream starts at block counter 0. Chunk boundaries are pure byte
//! offsets, so encryption and decryption are the same operation.

use crate::progress::{Reporter, Stage};
use crate::ratchet::{Ratchet, STATE_SIZE};
use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::{ChaCha20Legacy, Key, LegacyNonce};

/// Bytes processed per ratchet step (256 KiB)
pub const STREAM_CHUNK_SIZE: usize = 256 * 1024;

/// Apply the ratcheted keystream to `data` in place
pub fn apply_keystream(seed: &[u8; STATE_SIZE], data: &mut [u8], reporter: &Reporter) {
    let total = data.len() as u64;
    let mut ratchet = Ratchet::new(seed);
    let mut processed = 0u64;

    for chunk in data.chunks_mut(STREAM_CHUNK_SIZE) {
        let step = ratchet.step();
        let mut cipher = ChaCha20Legacy::new(
            Key::from_slice(step.key()),
            LegacyNonce::from_slice(step.nonce()),
        );
        cipher.apply_keystream(chunk);

        processed += chunk.len() as u64;
        reporter.report(Stage::StreamCipher, processed, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratchet::advance;

    #[test]
    fn test_apply_twice_restores_input() {
        let seed = [1u8; STATE_SIZE];
        let original: Vec<u8> = (0..1000u32).map(|i| i as u8).collect();
        let mut data = original.clone();

        apply_keystream(&seed, &mut data, &Reporter::silent());
        assert_ne!(data, original);
        apply_keystream(&seed, &mut data, &Reporter::silent());
        assert_eq!(data, original);
    }

    #[test]
    fn test_first_chunk_uses_advanced_seed() {
        let seed = [2u8; STATE_SIZE];
        let mut data = vec![0u8; 64];
        apply_keystream(&seed, &mut data, &Reporter::silent());

        let next = advance(&seed);
        let mut expected = vec![0u8; 64];
        let mut cipher = ChaCha20Legacy::new(
            Key::from_slice(&next[..32]),
            LegacyNonce::from_slice(&next[32..40]),
        );
        cipher.apply_keystream(&mut expected);
        assert_eq!(data, expected);
    }

    #[test]
    fn test_second_chunk_uses_next_step() {
        let seed = [3u8; STATE_SIZE];
        let mut data = vec![0u8; STREAM_CHUNK_SIZE + 32];
        apply_keystream(&seed, &mut data, &Reporter::silent());

        // A continuous keystream would differ from one restarted under a new key
        let mut continuous = vec![0u8; STREAM_CHUNK_SIZE + 32];
        let first = advance(&seed);
        let mut cipher = ChaCha20Legacy::new(
            Key::from_slice(&first[..32]),
            LegacyNonce::from_slice(&first[32..40]),
        );
        cipher.apply_keystream(&mut continuous);
        assert_eq!(data[..STREAM_CHUNK_SIZE], continuous[..STREAM_CHUNK_SIZE]);
        assert_ne!(data[STREAM_CHUNK_SIZE..], continuous[STREAM_CHUNK_SIZE..]);

        let second = advance(&first);
        let mut tail = vec![0u8; 32];
        let mut cipher = ChaCha20Legacy::new(
            Key::from_slice(&second[..32]),
            LegacyNonce::from_slice(&second[32..40]),
        );
        cipher.apply_keystream(&mut tail);
        assert_eq!(data[STREAM_CHUNK_SIZE..], tail[..]);
    }

    #[test]
    fn test_reports_each_chunk() {
        use std::sync::{Arc, Mutex};

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let reporter = Reporter::new(Arc::new(move |p: crate::progress::Progress| {
            sink.lock().unwrap().push(p.processed);
        }));

        let mut data = vec![0u8; 2 * STREAM_CHUNK_SIZE + 1];
        apply_keystream(&[0u8; STATE_SIZE], &mut data, &reporter);

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                STREAM_CHUNK_SIZE as u64,
                2 * STREAM_CHUNK_SIZE as u64,
                2 * STREAM_CHUNK_SIZE as u64 + 1
            ]
        );
    }
}
