//! Integration tests for Lakhash vaults
//!
//! These tests drive the whole stack: credential blinding, the session,
//! the pipeline, the transport codec and the filesystem chunk store.

use lakhash_client::{VaultClient, VaultConfig};
use lakhash_crypto::blinding::blind_with;
use lakhash_crypto::{BlindedCredentials, BlindingParams, MasterSecret, Pipeline, SessionContext};
use lakhash_store::{ChunkStore, Chunker, ChunkerConfig, FsChunkStore, StoreError};
use std::path::Path;
use std::sync::Arc;

const IDENTITY: &str = "alice@example.org";

/// Sign in with the real salt but only two Argon2id passes
fn sign_in(passphrase: &str) -> BlindedCredentials {
    let params = BlindingParams {
        kdf_iterations: 2,
        ..BlindingParams::for_identity(IDENTITY)
    };
    blind_with(IDENTITY, passphrase, &params).unwrap()
}

async fn open_vault(root: &Path, passphrase: &str) -> VaultClient {
    let credentials = sign_in(passphrase);
    let local = credentials.username().split('@').next().unwrap().to_string();
    let store = FsChunkStore::open(root.join(local)).await.unwrap();
    let session = credentials.into_session(IDENTITY);
    VaultClient::new(Arc::new(store), Arc::new(session), VaultConfig::default()).unwrap()
}

/// Test the full sign-in → upload → reopen → download flow on disk
#[tokio::test]
async fn test_vault_survives_reopening() {
    let dir = tempfile::tempdir().unwrap();
    let data: Vec<u8> = (0..70_000u32).map(|i| (i % 253) as u8).collect();

    let uploaded = {
        let vault = open_vault(dir.path(), "correct horse").await;
        vault
            .upload("holiday.jpg", &data, Some("Beach, 2019"))
            .await
            .unwrap()
    };
    assert_eq!(uploaded.chunk_count, 5);

    let vault = open_vault(dir.path(), "correct horse").await;
    let listed = vault.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "holiday.jpg");
    assert_eq!(listed[0].description, "Beach, 2019");

    let file = vault.download(&uploaded.id).await.unwrap();
    assert_eq!(file.data.as_ref(), data.as_slice());
    assert!(file.report.is_clean(), "{:?}", file.report.issues());
}

/// Test the persisted layout: JSON record with document field names and
/// lowercase hex chunk files
#[tokio::test]
async fn test_on_disk_layout() {
    let dir = tempfile::tempdir().unwrap();
    let vault = open_vault(dir.path(), "pw").await;
    let uploaded = vault.upload("a.txt", b"hello", None).await.unwrap();

    let local = sign_in("pw").username().split('@').next().unwrap().to_string();
    let root = dir.path().join(local);

    let json = std::fs::read_to_string(root.join("records").join(format!("{}.json", uploaded.id)))
        .unwrap();
    let record: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(record["encryptedDescription"], "4e6f206465736372697074696f6e2e");
    assert_eq!(record["encryptedTag"].as_str().unwrap().len(), 160);
    assert_eq!(record["fileSize"], 5);
    assert_eq!(record["encryptedLength"], uploaded.encrypted_length);

    let chunk = std::fs::read_to_string(root.join("chunks").join(&uploaded.id).join("0.hex"))
        .unwrap();
    assert_eq!(chunk.len() as u64, uploaded.encrypted_length * 2);
    assert!(chunk.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
}

/// Test that another passphrase opens a different vault and cannot read this one
#[tokio::test]
async fn test_wrong_passphrase_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let vault = open_vault(dir.path(), "right").await;
    let uploaded = vault.upload("s.txt", b"secret", Some("private")).await.unwrap();

    // Same identity, other passphrase: different backend account
    assert_ne!(sign_in("right").username(), sign_in("wrong").username());
    assert!(open_vault(dir.path(), "wrong").await.list().await.unwrap().is_empty());

    // Pointed at the same store, the wrong master secret fails every check
    let intruder_session = sign_in("wrong").into_session(IDENTITY);
    let intruder = VaultClient::new(
        Arc::clone(vault.store()),
        Arc::new(intruder_session),
        VaultConfig::default(),
    )
    .unwrap();

    let entry = intruder.list().await.unwrap().remove(0);
    assert!(!entry.title_integrity);
    assert!(!entry.description_integrity);

    let file = intruder.download(&uploaded.id).await.unwrap();
    assert!(file.report.content.integrity_failed || file.report.content.invalid_padding);
    assert_ne!(file.data.as_ref(), b"secret");
}

/// Test the single-byte scenario through the transport codec and a store
#[tokio::test]
async fn test_single_byte_file_through_transport() {
    let master = MasterSecret::from_bytes(&[0x11; 272]).unwrap();
    // Rescales to exactly 100 Argon2id passes
    let session = SessionContext::new(master, IDENTITY, 0);
    assert_eq!(session.pipeline_iterations(), 100);

    let pipeline = Pipeline::new();
    let sealed = pipeline.encrypt_file(&session, &[0x41]).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let store = FsChunkStore::open(dir.path()).await.unwrap();
    let chunker = Chunker::new();
    for (index, chunk) in chunker.split(&sealed.envelope).into_iter().enumerate() {
        store.put_chunk("single", index as u32, chunk).await.unwrap();
    }

    let fetched = vec![store.get_chunk("single", 0).await.unwrap().unwrap()];
    let envelope = chunker
        .join_exact(&fetched, sealed.envelope.len() as u64)
        .unwrap();

    let opened = pipeline.decrypt_file(&session, &envelope).unwrap();
    assert_eq!(opened.plaintext, vec![0x41]);
    assert!(!opened.verdict.integrity_failed);

    let mut tampered = envelope.clone();
    let last = tampered.len() - 20;
    tampered[last] ^= 0x80;
    let opened = pipeline.decrypt_file(&session, &tampered).unwrap();
    assert!(opened.verdict.integrity_failed || opened.verdict.invalid_padding);
}

/// Test that out-of-order and missing chunks are caught by length checks
#[tokio::test]
async fn test_reassembly_detects_reordering_and_gaps() {
    let chunker = Chunker::with_config(ChunkerConfig::with_chunk_size(64).unwrap());
    let ciphertext: Vec<u8> = (0..200u8).collect();
    let mut chunks = chunker.split(&ciphertext);
    assert_eq!(chunks.len(), 4);

    assert_eq!(chunker.join_exact(&chunks, 200).unwrap(), ciphertext);

    chunks.swap(2, 3);
    assert!(matches!(
        chunker.join_exact(&chunks, 200),
        Err(StoreError::LengthMismatch { .. })
    ));

    chunks.swap(2, 3);
    chunks.remove(1);
    assert!(matches!(
        chunker.join_exact(&chunks, 200),
        Err(StoreError::LengthMismatch { .. })
    ));
}
