//! Persisted container metadata
//!
//! Field names follow the document layout used by existing vaults. Every
//! field is optional on the wire so that a damaged record still loads and
//! can be listed or deleted.

use serde::{Deserialize, Serialize};

/// Metadata for one stored file
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRecord {
    /// Container id, also the chunk collection name
    #[serde(default)]
    pub id: String,
    /// Hex envelope of the file name
    #[serde(default)]
    pub encrypted_filename: String,
    /// Hex envelope of the description, or the hex of the default text
    #[serde(default)]
    pub encrypted_description: String,
    /// Hex of the 80-byte record tag envelope
    #[serde(default)]
    pub encrypted_tag: String,
    /// Plaintext size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Ciphertext size in bytes, used to know how many chunks to fetch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_length: Option<u64>,
}

impl ContainerRecord {
    /// Create an empty record for `id`
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Ciphertext length, when present and non-zero
    pub fn valid_encrypted_length(&self) -> Option<u64> {
        self.encrypted_length.filter(|&len| len > 0)
    }

    /// Ciphertext length, when present, non-zero and at most `max`.
    ///
    /// The record comes from storage, so a larger value is treated the same
    /// as a missing one.
    pub fn encrypted_length_within(&self, max: u64) -> Option<u64> {
        self.valid_encrypted_length().filter(|&len| len <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_document_field_names() {
        let record = ContainerRecord {
            id: "Ab3dE6gH9j".into(),
            encrypted_filename: "aa".into(),
            encrypted_description: "bb".into(),
            encrypted_tag: "cc".into(),
            file_size: Some(1),
            encrypted_length: Some(128),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["encryptedFilename"], "aa");
        assert_eq!(json["encryptedDescription"], "bb");
        assert_eq!(json["encryptedTag"], "cc");
        assert_eq!(json["fileSize"], 1);
        assert_eq!(json["encryptedLength"], 128);
    }

    #[test]
    fn test_broken_record_still_deserializes() {
        let record: ContainerRecord =
            serde_json::from_str(r#"{"id":"x","encryptedFilename":"zz"}"#).unwrap();
        assert_eq!(record.encrypted_filename, "zz");
        assert!(record.encrypted_tag.is_empty());
        assert_eq!(record.valid_encrypted_length(), None);
    }

    #[test]
    fn test_zero_length_is_not_valid() {
        let record = ContainerRecord {
            encrypted_length: Some(0),
            ..ContainerRecord::new("x")
        };
        assert_eq!(record.valid_encrypted_length(), None);
    }

    #[test]
    fn test_oversized_length_is_not_trusted() {
        let record = ContainerRecord {
            encrypted_length: Some(u64::MAX),
            ..ContainerRecord::new("x")
        };
        assert_eq!(record.valid_encrypted_length(), Some(u64::MAX));
        assert_eq!(record.encrypted_length_within(4096), None);

        let record = ContainerRecord {
            encrypted_length: Some(4096),
            ..record
        };
        assert_eq!(record.encrypted_length_within(4096), Some(4096));
    }
}
