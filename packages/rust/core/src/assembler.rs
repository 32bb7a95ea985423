//! Channel directory assembler.
//!
//! Takes a finished [`ChannelNode`] and writes it to disk together with a
//! manifest describing the run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use imchef_shared::{ChannelNode, ChefError, Result};

/// Current manifest schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

pub const CHANNEL_FILE: &str = "channel.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Metadata written next to `channel.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelManifest {
    pub schema_version: u32,
    pub channel_source_id: String,
    pub tool_version: String,
    pub api_base_url: String,
    pub locale: String,
    pub created_at: DateTime<Utc>,
    pub topic_count: usize,
    pub document_count: usize,
    /// SHA-256 of the written `channel.json`.
    pub channel_sha256: String,
}

/// Configuration for channel assembly.
#[derive(Debug, Clone)]
pub struct AssembleConfig {
    /// Root directory; the channel lands in `<output_root>/<source_id>/`.
    pub output_root: PathBuf,
    pub tool_version: String,
    pub api_base_url: String,
    pub locale: String,
}

/// Output from a successful assembly.
#[derive(Debug, Clone)]
pub struct AssembleResult {
    pub channel_path: PathBuf,
    pub manifest: ChannelManifest,
}

/// Write a channel directory.
///
/// ```text
/// <output_root>/<channel source_id>/
/// ├── channel.json
/// └── manifest.json
/// ```
///
/// Existing files are replaced.
#[instrument(skip_all, fields(channel = %channel.info.source_id))]
pub fn assemble(config: &AssembleConfig, channel: &ChannelNode) -> Result<AssembleResult> {
    let channel_dir = config.output_root.join(&channel.info.source_id);
    std::fs::create_dir_all(&channel_dir).map_err(|e| ChefError::io(&channel_dir, e))?;

    info!(path = %channel_dir.display(), "assembling channel directory");

    let channel_json = to_json(channel)?;
    write_atomic(&channel_dir.join(CHANNEL_FILE), &channel_json)?;

    let (topic_count, document_count) = channel.counts();
    let manifest = ChannelManifest {
        schema_version: CURRENT_SCHEMA_VERSION,
        channel_source_id: channel.info.source_id.clone(),
        tool_version: config.tool_version.clone(),
        api_base_url: config.api_base_url.clone(),
        locale: config.locale.clone(),
        created_at: Utc::now(),
        topic_count,
        document_count,
        channel_sha256: sha256_hex(&channel_json),
    };
    write_atomic(&channel_dir.join(MANIFEST_FILE), &to_json(&manifest)?)?;

    info!(topic_count, document_count, "channel assembly complete");

    Ok(AssembleResult {
        channel_path: channel_dir,
        manifest,
    })
}

/// Read `channel.json` back from a channel directory.
pub fn read_channel(channel_path: &Path) -> Result<ChannelNode> {
    let path = channel_path.join(CHANNEL_FILE);
    let content = std::fs::read_to_string(&path).map_err(|e| ChefError::io(&path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| ChefError::validation(format!("invalid {CHANNEL_FILE}: {e}")))
}

/// Read `manifest.json` from a channel directory.
pub fn read_manifest(channel_path: &Path) -> Result<ChannelManifest> {
    let path = channel_path.join(MANIFEST_FILE);
    let content = std::fs::read_to_string(&path).map_err(|e| ChefError::io(&path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| ChefError::validation(format!("invalid {MANIFEST_FILE}: {e}")))
}

/// Verify that a channel directory is well-formed and self-consistent.
pub fn validate_channel(channel_path: &Path) -> Result<ChannelManifest> {
    for file in [CHANNEL_FILE, MANIFEST_FILE] {
        if !channel_path.join(file).exists() {
            return Err(ChefError::validation(format!("missing {file}")));
        }
    }

    let manifest = read_manifest(channel_path)?;
    if manifest.schema_version != CURRENT_SCHEMA_VERSION {
        return Err(ChefError::validation(format!(
            "unsupported schema_version: {} (expected {})",
            manifest.schema_version, CURRENT_SCHEMA_VERSION
        )));
    }

    let channel_file = channel_path.join(CHANNEL_FILE);
    let raw = std::fs::read_to_string(&channel_file).map_err(|e| ChefError::io(&channel_file, e))?;
    if sha256_hex(&raw) != manifest.channel_sha256 {
        return Err(ChefError::validation(format!(
            "{CHANNEL_FILE} does not match the manifest checksum"
        )));
    }

    let channel = read_channel(channel_path)?;
    if channel.info.source_id != manifest.channel_source_id {
        return Err(ChefError::validation(format!(
            "channel source_id '{}' does not match manifest '{}'",
            channel.info.source_id, manifest.channel_source_id
        )));
    }

    let counts = channel.counts();
    if counts != (manifest.topic_count, manifest.document_count) {
        return Err(ChefError::validation(format!(
            "node counts {counts:?} do not match manifest ({}, {})",
            manifest.topic_count, manifest.document_count
        )));
    }

    debug!(path = %channel_path.display(), "channel directory valid");
    Ok(manifest)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn to_json<T: Serialize>(data: &T) -> Result<String> {
    serde_json::to_string_pretty(data)
        .map_err(|e| ChefError::validation(format!("JSON serialization failed: {e}")))
}

/// Write to a temp file next to `path`, then rename over it.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, content).map_err(|e| ChefError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| ChefError::io(path, e))?;

    debug!(path = %path.display(), size = content.len(), "wrote JSON file");
    Ok(())
}

fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use imchef_shared::{
        ChannelInfo, DocumentFile, DocumentNode, LICENSE_CC_BY, ResourceType, Role, TopicNode,
    };

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("imchef-assembler-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn make_config(output_root: &Path) -> AssembleConfig {
        AssembleConfig {
            output_root: output_root.into(),
            tool_version: "0.1.0-test".into(),
            api_base_url: "https://content.example.org/api/v1".into(),
            locale: "en".into(),
        }
    }

    fn make_channel() -> ChannelNode {
        let mut channel = ChannelNode::new(ChannelInfo {
            source_domain: "https://content.example.org/api/v1".into(),
            source_id: "test-channel".into(),
            title: "Test Channel".into(),
            language: "en".into(),
            description: "A channel".into(),
            tagline: "Learn".into(),
        });

        let mut lesson = TopicNode::new("lesson-1", "Lesson 1", None);
        lesson
            .add_child(DocumentNode {
                source_id: "wb.pdf".into(),
                title: "Lesson 1 Student Workbook".into(),
                files: vec![DocumentFile {
                    path: "https://cdn.example.org/wb.pdf".into(),
                    language: "en".into(),
                }],
                resource_types: vec![ResourceType::Activity],
                license: LICENSE_CC_BY.into(),
                copyright_holder: "Open Up Resources".into(),
                role: Role::Coach,
            })
            .unwrap();

        let mut grade_band = TopicNode::new("k-5", "Grades K-5", Some("Elementary".into()));
        grade_band.add_child(lesson).unwrap();
        channel.add_child(grade_band).unwrap();
        channel
    }

    #[test]
    fn test_assemble_creates_files() {
        let root = temp_dir();
        let result = assemble(&make_config(&root), &make_channel()).unwrap();

        assert_eq!(result.channel_path, root.join("test-channel"));
        assert!(result.channel_path.join(CHANNEL_FILE).exists());
        assert!(result.channel_path.join(MANIFEST_FILE).exists());
        assert!(!result.channel_path.join(".channel.json.tmp").exists());
        assert_eq!(result.manifest.topic_count, 2);
        assert_eq!(result.manifest.document_count, 1);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_channel_roundtrips_through_disk() {
        let root = temp_dir();
        let channel = make_channel();
        let result = assemble(&make_config(&root), &channel).unwrap();

        let read = read_channel(&result.channel_path).unwrap();
        assert_eq!(read.info, channel.info);
        assert_eq!(read.counts(), channel.counts());

        let raw = std::fs::read_to_string(result.channel_path.join(CHANNEL_FILE)).unwrap();
        assert!(raw.contains("\"kind\": \"document\""));
        assert!(raw.contains("\"ACTIVITY\""));
        assert!(raw.contains("\"role\": \"coach\""));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_validate_channel_ok() {
        let root = temp_dir();
        let result = assemble(&make_config(&root), &make_channel()).unwrap();
        let manifest = validate_channel(&result.channel_path).unwrap();
        assert_eq!(manifest, result.manifest);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_validate_missing_manifest() {
        let root = temp_dir();
        let result = assemble(&make_config(&root), &make_channel()).unwrap();
        std::fs::remove_file(result.channel_path.join(MANIFEST_FILE)).unwrap();

        let err = validate_channel(&result.channel_path).unwrap_err();
        assert!(err.to_string().contains("missing manifest.json"));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_validate_detects_edited_channel() {
        let root = temp_dir();
        let result = assemble(&make_config(&root), &make_channel()).unwrap();
        let path = result.channel_path.join(CHANNEL_FILE);
        let edited = std::fs::read_to_string(&path)
            .unwrap()
            .replace("Lesson 1 Student Workbook", "Edited");
        std::fs::write(&path, edited).unwrap();

        let err = validate_channel(&result.channel_path).unwrap_err();
        assert!(err.to_string().contains("checksum"));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_validate_wrong_schema_version() {
        let root = temp_dir();
        let result = assemble(&make_config(&root), &make_channel()).unwrap();
        let mut manifest = result.manifest.clone();
        manifest.schema_version = 99;
        std::fs::write(
            result.channel_path.join(MANIFEST_FILE),
            serde_json::to_string(&manifest).unwrap(),
        )
        .unwrap();

        let err = validate_channel(&result.channel_path).unwrap_err();
        assert!(err.to_string().contains("unsupported schema_version"));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_reassemble_overwrites() {
        let root = temp_dir();
        let config = make_config(&root);
        assemble(&config, &make_channel()).unwrap();

        let mut smaller = make_channel();
        smaller.children.clear();
        let result = assemble(&config, &smaller).unwrap();

        let manifest = validate_channel(&result.channel_path).unwrap();
        assert_eq!(manifest.topic_count, 0);
        assert_eq!(manifest.document_count, 0);
        let _ = std::fs::remove_dir_all(&root);
    }
}
