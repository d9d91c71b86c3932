//! Security property tests
//!
//! Checks that hold across crates: nothing readable reaches the store,
//! encryption is randomized, blinding is deterministic and secrets stay
//! out of debug output.

use lakhash_client::{VaultClient, VaultConfig};
use lakhash_crypto::blinding::blind_with;
use lakhash_crypto::{BlindingParams, MasterSecret, Pipeline, SessionContext};
use lakhash_store::{ChunkStore, FsChunkStore, MemoryChunkStore};
use rstest::rstest;
use std::path::Path;
use std::sync::Arc;

fn session() -> SessionContext {
    let master = MasterSecret::from_bytes(&[0xc3; 272]).unwrap();
    SessionContext::new(master, "carol", 0)
}

fn cheap_params(identity: &str) -> BlindingParams {
    BlindingParams {
        kdf_iterations: 2,
        ..BlindingParams::for_identity(identity)
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn read_tree(dir: &Path, out: &mut Vec<u8>) {
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            read_tree(&path, out);
        } else {
            out.extend(std::fs::read(&path).unwrap());
            out.extend(path.to_string_lossy().as_bytes());
        }
    }
}

/// Test that no plaintext name, description or content reaches the store
#[tokio::test]
async fn test_store_never_sees_plaintext() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsChunkStore::open(dir.path()).await.unwrap());
    let vault = VaultClient::new(store, Arc::new(session()), VaultConfig::default()).unwrap();

    let content = b"TOP-SECRET-CONTENT ".repeat(200);
    vault
        .upload("confidential-plan.txt", &content, Some("quarterly-merger-notes"))
        .await
        .unwrap();

    let mut stored = Vec::new();
    read_tree(dir.path(), &mut stored);
    for needle in [
        "TOP-SECRET".as_bytes(),
        b"confidential-plan",
        b"quarterly-merger",
        hex::encode("confidential-plan").as_bytes(),
        hex::encode("TOP-SECRET").as_bytes(),
    ] {
        assert!(!contains(&stored, needle), "found {:?}", String::from_utf8_lossy(needle));
    }
}

/// Test that encrypting the same data twice gives unrelated envelopes
#[test]
fn test_encryption_is_randomized() {
    let session = session();
    let pipeline = Pipeline::new();

    let first = pipeline.encrypt_file(&session, b"same input").unwrap();
    let second = pipeline.encrypt_file(&session, b"same input").unwrap();
    assert_ne!(first.envelope, second.envelope);
    assert_ne!(first.tag, second.tag);
    assert_ne!(first.record_key.as_bytes(), second.record_key.as_bytes());

    let name_a = pipeline.encrypt_metadata(&session, b"name").unwrap();
    let name_b = pipeline.encrypt_metadata(&session, b"name").unwrap();
    assert_ne!(name_a, name_b);
}

/// Test that every single-byte flip in the CBC region is noticed
#[test]
fn test_every_cbc_byte_is_covered() {
    let session = session();
    let pipeline = Pipeline::new();
    let sealed = pipeline.encrypt_file(&session, b"0123456789").unwrap();

    for offset in 32..sealed.envelope.len() {
        let mut tampered = sealed.envelope.clone();
        tampered[offset] ^= 0x04;
        let opened = pipeline.decrypt_file(&session, &tampered).unwrap();
        assert!(!opened.verdict.is_clean(), "flip at {} passed", offset);
    }
}

/// Test blinding determinism and sensitivity to both inputs
#[rstest]
#[case("alice", "pw", "alice", "pw", true)]
#[case("alice", "pw", "alice", "pW", false)]
#[case("alice", "pw", "alicf", "pw", false)]
fn test_blinding_determinism(
    #[case] id_a: &str,
    #[case] pw_a: &str,
    #[case] id_b: &str,
    #[case] pw_b: &str,
    #[case] equal: bool,
) {
    let a = blind_with(id_a, pw_a, &cheap_params(id_a)).unwrap();
    let b = blind_with(id_b, pw_b, &cheap_params(id_b)).unwrap();
    assert_eq!(a.password() == b.password(), equal);
    assert_eq!(a.master_secret().as_bytes() == b.master_secret().as_bytes(), equal);
    assert_eq!(a.fingerprint() == b.fingerprint(), equal);
    if id_a == id_b {
        // The username depends on the identity alone
        assert_eq!(a.username(), b.username());
    } else {
        assert_ne!(a.username(), b.username());
    }
}

/// Test that secrets never appear in debug output
#[tokio::test]
async fn test_debug_output_is_redacted() {
    let credentials = blind_with("dave", "pw", &cheap_params("dave")).unwrap();
    let password = credentials.password().to_string();
    let master_hex = hex::encode(credentials.master_secret().as_bytes());

    let rendered = format!("{:?}", credentials);
    assert!(!rendered.contains(&password));
    assert!(!rendered.contains(&master_hex[..16]));

    let session = credentials.into_session("dave");
    let vault = VaultClient::new(
        Arc::new(MemoryChunkStore::new()),
        Arc::new(session),
        VaultConfig::default(),
    )
    .unwrap();
    let rendered = format!("{:?}", vault);
    assert!(rendered.contains("dave"));
    assert!(!rendered.contains(&master_hex[..16]));

    let uploaded = vault.upload("x", b"y", None).await.unwrap();
    assert!(vault.store().container_exists(&uploaded.id).await.unwrap());
}
