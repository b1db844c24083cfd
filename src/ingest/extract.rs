//! Container format detection and section extraction
//!
//! The format is decided once, by sniffing the upload's leading bytes, never
//! by filename extension. Each format implements `Extractor`: read the
//! `content` section, the `meta` section, and the manifest of embedded
//! files. ZIP containers are fully supported; HDF5 is recognized but not
//! parsed yet.

use crate::{MetaDbError, Result};
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::io::{Read, Seek};
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

const CONTENT_MEMBER: &str = "content.json";
const META_MEMBER: &str = "meta.json";

const ZIP_MIME: &str = "application/zip";
const HDF5_MIME: &str = "application/x-hdf";

/// Supported container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Zip,
    Hdf5,
}

impl ContainerFormat {
    /// File extension used for the persisted raw container
    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::Zip => "zdc",
            ContainerFormat::Hdf5 => "h5",
        }
    }
}

fn is_hdf5(buf: &[u8]) -> bool {
    buf.starts_with(b"\x89HDF\r\n\x1a\n")
}

static SNIFFER: Lazy<infer::Infer> = Lazy::new(|| {
    let mut sniffer = infer::Infer::new();
    // infer has no builtin HDF5 matcher
    sniffer.add(HDF5_MIME, "h5", is_hdf5);
    sniffer
});

/// Detect the container format from the upload's leading bytes
pub fn sniff_format(head: &[u8]) -> Result<ContainerFormat> {
    let detected = SNIFFER.get(head);
    let mime = detected.map(|t| t.mime_type()).unwrap_or("unknown");
    debug!("Sniffed upload content type: {}", mime);

    match mime {
        ZIP_MIME => Ok(ContainerFormat::Zip),
        HDF5_MIME => Ok(ContainerFormat::Hdf5),
        other => Err(MetaDbError::UnsupportedMediaType(other.to_string())),
    }
}

/// One member of the container archive, as reported by the extractor
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    /// Uncompressed size in bytes
    pub size: i64,
    /// Parsed content for JSON members
    pub content: Option<Value>,
}

/// Format-specific extraction: the two metadata sections plus the manifest
/// of embedded files
pub trait Extractor {
    fn read_content(&mut self) -> Result<Map<String, Value>>;
    fn read_meta(&mut self) -> Result<Map<String, Value>>;
    fn read_filelist(&mut self) -> Result<Vec<FileEntry>>;
}

/// Extractor for ZIP-based containers
pub struct ZipExtractor<R> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> ZipExtractor<R> {
    pub fn open(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)
            .map_err(|e| MetaDbError::MalformedContainer(format!("unreadable zip archive: {}", e)))?;
        Ok(Self { archive })
    }

    fn read_json_member(&mut self, member: &str) -> Result<Map<String, Value>> {
        let file = self.archive.by_name(member).map_err(|e| match e {
            ZipError::FileNotFound => {
                MetaDbError::MalformedContainer(format!("container has no {} member", member))
            }
            other => MetaDbError::MalformedContainer(format!("cannot read {}: {}", member, other)),
        })?;

        let value: Value = serde_json::from_reader(file).map_err(|e| {
            MetaDbError::MalformedContainer(format!("{} is not valid JSON: {}", member, e))
        })?;

        match value {
            Value::Object(map) => Ok(map),
            _ => Err(MetaDbError::MalformedContainer(format!(
                "{} must contain a JSON object",
                member
            ))),
        }
    }
}

impl<R: Read + Seek> Extractor for ZipExtractor<R> {
    fn read_content(&mut self) -> Result<Map<String, Value>> {
        self.read_json_member(CONTENT_MEMBER)
    }

    fn read_meta(&mut self) -> Result<Map<String, Value>> {
        self.read_json_member(META_MEMBER)
    }

    fn read_filelist(&mut self) -> Result<Vec<FileEntry>> {
        let mut entries = Vec::with_capacity(self.archive.len());
        for index in 0..self.archive.len() {
            let mut member = self.archive.by_index(index).map_err(|e| {
                MetaDbError::MalformedContainer(format!("cannot read archive member: {}", e))
            })?;
            let name = member.name().to_string();
            let size = member.size() as i64;

            let content = if name.ends_with(".json") {
                let mut text = String::new();
                member.read_to_string(&mut text).map_err(|e| {
                    MetaDbError::MalformedContainer(format!("cannot read {}: {}", name, e))
                })?;
                let value: Value = serde_json::from_str(&text).map_err(|e| {
                    MetaDbError::MalformedContainer(format!("{} is not valid JSON: {}", name, e))
                })?;
                Some(value)
            } else {
                None
            };

            entries.push(FileEntry { name, size, content });
        }
        Ok(entries)
    }
}

/// Recognized but not-yet-supported HDF5 containers. Both section reads
/// signal 501; the pipeline never reaches the filelist.
pub struct Hdf5Extractor;

impl Extractor for Hdf5Extractor {
    fn read_content(&mut self) -> Result<Map<String, Value>> {
        Err(MetaDbError::UnsupportedFormat("hdf5".to_string()))
    }

    fn read_meta(&mut self) -> Result<Map<String, Value>> {
        Err(MetaDbError::UnsupportedFormat("hdf5".to_string()))
    }

    fn read_filelist(&mut self) -> Result<Vec<FileEntry>> {
        Err(MetaDbError::UnsupportedFormat("hdf5".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn build_zip(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, bytes) in members {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn sniffs_zip_and_hdf5() {
        let zip_bytes = build_zip(&[("content.json", b"{}")]);
        assert_eq!(sniff_format(&zip_bytes).unwrap(), ContainerFormat::Zip);

        let hdf5_head = b"\x89HDF\r\n\x1a\n\x00\x00";
        assert_eq!(sniff_format(hdf5_head).unwrap(), ContainerFormat::Hdf5);
    }

    #[test]
    fn sniff_rejects_other_content() {
        let err = sniff_format(b"hello, not a container").unwrap_err();
        assert_eq!(err.error_code(), 415);
    }

    #[test]
    fn zip_extractor_reads_sections_and_manifest() {
        let content = json!({"uuid": "x", "modelVersion": "0.3"}).to_string();
        let meta = json!({"author": "Jane"}).to_string();
        let bytes = build_zip(&[
            ("content.json", content.as_bytes()),
            ("meta.json", meta.as_bytes()),
            ("measurement/data.bin", &[0u8; 32]),
        ]);

        let mut extractor = ZipExtractor::open(Cursor::new(bytes)).unwrap();
        assert_eq!(extractor.read_content().unwrap()["modelVersion"], "0.3");
        assert_eq!(extractor.read_meta().unwrap()["author"], "Jane");

        let manifest = extractor.read_filelist().unwrap();
        assert_eq!(manifest.len(), 3);

        let data = manifest.iter().find(|f| f.name == "measurement/data.bin").unwrap();
        assert_eq!(data.size, 32);
        assert!(data.content.is_none());

        // JSON members carry their parsed content
        let content_entry = manifest.iter().find(|f| f.name == "content.json").unwrap();
        assert_eq!(content_entry.content.as_ref().unwrap()["modelVersion"], "0.3");
    }

    #[test]
    fn missing_member_is_a_client_error() {
        let bytes = build_zip(&[("meta.json", b"{}")]);
        let mut extractor = ZipExtractor::open(Cursor::new(bytes)).unwrap();
        let err = extractor.read_content().unwrap_err();
        assert_eq!(err.error_code(), 400);
        assert!(err.to_string().contains("content.json"));
    }

    #[test]
    fn hdf5_extractor_is_unsupported() {
        let err = Hdf5Extractor.read_content().unwrap_err();
        assert_eq!(err.error_code(), 501);
    }
}
