//! Common types for the vault client

use bytes::Bytes;
use lakhash_crypto::Verdict;
use serde::{Deserialize, Serialize};

/// Shown in place of a title or description that cannot be decrypted
pub const BROKEN_METADATA: &str = "Broken Metadata";

/// A listed file with its decrypted metadata
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Container id
    pub id: String,
    /// Decrypted file name
    pub title: String,
    /// Decrypted description
    pub description: String,
    /// Plaintext size, when recorded
    pub file_size: Option<u64>,
    /// Ciphertext size, `None` for broken metadata
    pub encrypted_length: Option<u64>,
    /// Title tag matched
    pub title_integrity: bool,
    /// Title padding was valid
    pub title_padding_valid: bool,
    /// Description tag matched
    pub description_integrity: bool,
    /// Description padding was valid
    pub description_padding_valid: bool,
}

impl FileEntry {
    /// Title and description both decrypted cleanly
    pub fn metadata_integrity(&self) -> bool {
        self.title_integrity
            && self.title_padding_valid
            && self.description_integrity
            && self.description_padding_valid
    }

    /// The record lost its ciphertext length
    pub fn has_broken_metadata(&self) -> bool {
        self.encrypted_length.is_none()
    }
}

/// Result of a successful upload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Newly assigned container id
    pub id: String,
    /// Plaintext size
    pub file_size: u64,
    /// Ciphertext size
    pub encrypted_length: u64,
    /// Number of transport chunks written
    pub chunk_count: u64,
}

/// Every independent check made while downloading a file
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Content verdict from the pipeline
    pub content: Verdict,
    /// Record tag matched
    pub record_integrity: bool,
    /// Title tag matched
    pub title_integrity: bool,
    /// Title padding was valid
    pub title_padding_valid: bool,
    /// Description tag matched
    pub description_integrity: bool,
    /// Description padding was valid
    pub description_padding_valid: bool,
    /// Every expected chunk arrived and decoded
    pub transport_complete: bool,
    /// Chunks were located by probing because the record lost its length
    pub broken_metadata: bool,
}

impl IntegrityReport {
    /// Human-readable list of every failed check
    pub fn issues(&self) -> Vec<&'static str> {
        let mut issues = Vec::new();
        if self.broken_metadata {
            issues.push("Broken metadata: chunks were located by probing");
        }
        if !self.transport_complete {
            issues.push("Some file chunks were missing or malformed");
        }
        if self.content.invalid_padding {
            issues.push("Decryption error: invalid padding");
        }
        if self.content.integrity_failed {
            issues.push("File integrity verification failed");
        }
        issues.extend(self.metadata_issues());
        issues
    }

    /// True only when no check failed
    pub fn is_clean(&self) -> bool {
        self.issues().is_empty()
    }

    /// Summary lines in the order a user is shown them.
    ///
    /// Content failures are reported alone; metadata checks are only
    /// summarized once the content itself verified.
    pub fn messages(&self) -> Vec<&'static str> {
        let Verdict {
            invalid_padding,
            integrity_failed,
        } = self.content;

        match (invalid_padding, integrity_failed) {
            (true, true) => {
                vec!["Decryption errors: invalid padding, integrity/authenticity verification failed"]
            }
            (true, false) => vec!["Decryption error: invalid padding"],
            (false, true) => vec![
                "File integrity verification failed. The file may be corrupted or tampered with.",
            ],
            (false, false) => {
                let mut messages = vec![
                    "File decrypted successfully",
                    "File integrity verified successfully",
                ];
                let issues = self.metadata_issues();
                if issues.is_empty() {
                    messages.push("Metadata integrity verified successfully");
                } else {
                    messages.push("There are issues with the file metadata:");
                    messages.extend(issues);
                }
                messages
            }
        }
    }

    fn metadata_issues(&self) -> Vec<&'static str> {
        [
            (self.record_integrity, "Record integrity verification failed"),
            (self.title_integrity, "Title integrity verification failed"),
            (self.title_padding_valid, "Title padding is invalid"),
            (self.description_integrity, "Description integrity verification failed"),
            (self.description_padding_valid, "Description padding is invalid"),
        ]
        .into_iter()
        .filter(|(passed, _)| !passed)
        .map(|(_, issue)| issue)
        .collect()
    }
}

/// A downloaded and decrypted file
#[derive(Clone, Debug)]
pub struct DownloadedFile {
    /// Container id
    pub id: String,
    /// Decrypted file name
    pub filename: String,
    /// Decrypted description
    pub description: String,
    /// Decrypted content, returned even when a check failed
    pub data: Bytes,
    /// Outcome of every check
    pub report: IntegrityReport,
}

/// Result of deleting a file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedFile {
    /// Container id
    pub id: String,
    /// Chunks removed
    pub chunks_deleted: u64,
    /// Chunks whose deletion failed and was logged
    pub chunks_failed: u64,
    /// The record had lost its ciphertext length
    pub broken_metadata: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean_report() -> IntegrityReport {
        IntegrityReport {
            content: Verdict::default(),
            record_integrity: true,
            title_integrity: true,
            title_padding_valid: true,
            description_integrity: true,
            description_padding_valid: true,
            transport_complete: true,
            broken_metadata: false,
        }
    }

    #[test]
    fn test_clean_report() {
        let report = clean_report();
        assert!(report.is_clean());
        assert_eq!(
            report.messages(),
            vec![
                "File decrypted successfully",
                "File integrity verified successfully",
                "Metadata integrity verified successfully",
            ]
        );
    }

    #[test]
    fn test_content_failure_hides_metadata_summary() {
        let report = IntegrityReport {
            content: Verdict {
                invalid_padding: true,
                integrity_failed: true,
            },
            record_integrity: false,
            ..clean_report()
        };
        assert_eq!(report.messages().len(), 1);
        assert_eq!(report.issues().len(), 3);
    }

    #[test]
    fn test_metadata_issues_are_listed() {
        let report = IntegrityReport {
            record_integrity: false,
            description_padding_valid: false,
            ..clean_report()
        };
        assert!(!report.is_clean());
        assert_eq!(
            report.messages()[2..],
            [
                "There are issues with the file metadata:",
                "Record integrity verification failed",
                "Description padding is invalid",
            ]
        );
    }

    #[test]
    fn test_default_report_is_not_clean() {
        assert!(!IntegrityReport::default().is_clean());
    }

    #[test]
    fn test_entry_metadata_integrity() {
        let entry = FileEntry {
            id: "a".into(),
            title: BROKEN_METADATA.into(),
            description: "No description.".into(),
            file_size: None,
            encrypted_length: None,
            title_integrity: false,
            title_padding_valid: false,
            description_integrity: true,
            description_padding_valid: true,
        };
        assert!(!entry.metadata_integrity());
        assert!(entry.has_broken_metadata());
    }
}
