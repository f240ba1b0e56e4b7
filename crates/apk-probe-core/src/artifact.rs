// crates/apk-probe-core/src/artifact.rs
// ============================================================================
// Module: Synthetic Artifacts
// Description: In-memory builders for probe upload payloads.
// Purpose: Produce the minimal package and the negative-path payloads.
// Dependencies: zip
// ============================================================================

//! ## Overview
//! Builds the synthetic Android package submitted by the pipeline check, plus
//! the non-package and oversized payloads used by the contract checks. All
//! payloads are created fresh per call and never touch disk unless a caller
//! writes them out.
//!
//! The package content is placeholder data: the service only needs a
//! structurally valid archive with a manifest, a dex payload, resources, and
//! signing metadata to strip.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Cursor;
use std::io::Write;

use thiserror::Error;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// MIME type advertised for package uploads.
pub const APK_MIME: &str = "application/vnd.android.package-archive";
/// Archive entry holding the application manifest.
pub const MANIFEST_ENTRY: &str = "AndroidManifest.xml";
/// Directory prefix holding signing metadata.
pub const SIGNATURE_DIR: &str = "META-INF/";
/// File name used for synthetic package uploads.
pub const TEST_PACKAGE_NAME: &str = "test.apk";
/// Package name written into the synthetic manifest.
pub const DEFAULT_PACKAGE_ID: &str = "com.test.debug";

/// Dex magic header prefix.
const DEX_MAGIC: &[u8] = b"dex\n035\0";
/// Resource table magic prefix.
const ARSC_MAGIC: &[u8] = b"AAPT";
/// Zero padding appended to binary placeholders.
const PLACEHOLDER_PADDING: usize = 100;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while building synthetic artifacts.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Archive writer failed.
    #[error("archive build failed: {0}")]
    Archive(String),
    /// Requested payload size cannot be represented on this host.
    #[error("payload size {0} exceeds addressable memory")]
    SizeOverflow(u64),
}

impl From<zip::result::ZipError> for ArtifactError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}

impl From<std::io::Error> for ArtifactError {
    fn from(err: std::io::Error) -> Self {
        Self::Archive(err.to_string())
    }
}

// ============================================================================
// SECTION: Upload
// ============================================================================

/// A multipart file payload ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// File name reported in the multipart part.
    pub file_name: String,
    /// MIME type reported in the multipart part.
    pub mime: String,
    /// Raw payload bytes.
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Creates an upload from parts.
    #[must_use]
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Returns the payload size in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        u64::try_from(self.bytes.len()).unwrap_or(u64::MAX)
    }

    /// Returns true when the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ============================================================================
// SECTION: Package Builder
// ============================================================================

/// Builder for synthetic package archives.
///
/// # Invariants
/// - Entries are written in insertion order, deflate-compressed.
/// - The manifest and dex payload are always present.
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    /// Package id written into the manifest.
    package_id: String,
    /// Whether signing metadata entries are included.
    with_signature: bool,
    /// Additional caller-supplied entries.
    extra: Vec<(String, Vec<u8>)>,
}

impl Default for PackageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageBuilder {
    /// Creates a builder for the default test package.
    #[must_use]
    pub fn new() -> Self {
        Self {
            package_id: DEFAULT_PACKAGE_ID.to_string(),
            with_signature: true,
            extra: Vec::new(),
        }
    }

    /// Overrides the manifest package id.
    #[must_use]
    pub fn package_id(mut self, package_id: impl Into<String>) -> Self {
        self.package_id = package_id.into();
        self
    }

    /// Omits the signing metadata entries.
    #[must_use]
    pub const fn without_signature(mut self) -> Self {
        self.with_signature = false;
        self
    }

    /// Appends an extra entry after the standard ones.
    #[must_use]
    pub fn with_entry(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.extra.push((name.into(), bytes.into()));
        self
    }

    /// Builds the archive bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Archive`] when the archive writer fails.
    pub fn build(&self) -> Result<Vec<u8>, ArtifactError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut entries: Vec<(String, Vec<u8>)> = vec![
            (MANIFEST_ENTRY.to_string(), manifest_text(&self.package_id).into_bytes()),
            ("classes.dex".to_string(), padded(DEX_MAGIC)),
            ("resources.arsc".to_string(), padded(ARSC_MAGIC)),
            ("res/values/strings.xml".to_string(), STRINGS_XML.as_bytes().to_vec()),
        ];
        if self.with_signature {
            entries.push((format!("{SIGNATURE_DIR}MANIFEST.MF"), b"Manifest-Version: 1.0\n".to_vec()));
            entries.push((format!("{SIGNATURE_DIR}CERT.SF"), b"Signature-Version: 1.0\n".to_vec()));
            entries.push((format!("{SIGNATURE_DIR}CERT.RSA"), b"dummy_signature_data".to_vec()));
        }
        entries.extend(self.extra.iter().cloned());

        for (name, bytes) in entries {
            writer.start_file(name, options)?;
            writer.write_all(&bytes)?;
        }
        Ok(writer.finish()?.into_inner())
    }

    /// Builds the archive and wraps it as an upload named `test.apk`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Archive`] when the archive writer fails.
    pub fn build_upload(&self) -> Result<Upload, ArtifactError> {
        Ok(Upload::new(TEST_PACKAGE_NAME, APK_MIME, self.build()?))
    }
}

// ============================================================================
// SECTION: Negative Payloads
// ============================================================================

/// Returns a plain-text upload the service must reject by type.
#[must_use]
pub fn non_package_upload() -> Upload {
    Upload::new("test.txt", "text/plain", b"This is not an APK file".to_vec())
}

/// Returns a package-named upload one byte over `limit`.
///
/// # Errors
///
/// Returns [`ArtifactError::SizeOverflow`] when the size cannot be allocated.
pub fn oversized_upload(limit: u64) -> Result<Upload, ArtifactError> {
    let size = limit.checked_add(1).ok_or(ArtifactError::SizeOverflow(limit))?;
    let len = usize::try_from(size).map_err(|_| ArtifactError::SizeOverflow(size))?;
    Ok(Upload::new("large.apk", APK_MIME, vec![0_u8; len]))
}

// ============================================================================
// SECTION: Placeholder Content
// ============================================================================

/// Placeholder string resources.
const STRINGS_XML: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<resources>\n    <string \
                           name=\"app_name\">Test App</string>\n</resources>\n";

/// Renders the minimal text manifest for `package_id`.
fn manifest_text(package_id: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    package="{package_id}"
    android:versionCode="1"
    android:versionName="1.0">
    <uses-sdk android:minSdkVersion="21" android:targetSdkVersion="30" />
    <application android:label="Test App" android:icon="@mipmap/ic_launcher">
        <activity android:name=".MainActivity" android:exported="true">
            <intent-filter>
                <action android:name="android.intent.action.MAIN" />
                <category android:name="android.intent.category.LAUNCHER" />
            </intent-filter>
        </activity>
    </application>
</manifest>
"#
    )
}

/// Returns `magic` followed by zero padding.
fn padded(magic: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(magic.len() + PLACEHOLDER_PADDING);
    bytes.extend_from_slice(magic);
    bytes.resize(magic.len() + PLACEHOLDER_PADDING, 0);
    bytes
}

// ============================================================================
// SECTION: Tests
// ============================================================================
