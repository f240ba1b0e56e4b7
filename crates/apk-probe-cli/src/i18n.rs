// crates/apk-probe-cli/src/i18n.rs
// ============================================================================
// Module: CLI Internationalization Helpers
// Description: Message catalog and translation utilities for the probe CLI.
// Purpose: Keep every user-facing string in one catalog per locale.
// Dependencies: Standard library collections and formatting utilities.
// ============================================================================

//! ## Overview
//! The `apk-probe` CLI stores user-facing strings in a small translation
//! catalog. All runtime output is routed through the [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to English and then to the key itself.
//! - Placeholder substitutions preserve deterministic order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Supported CLI locales.
///
/// # Invariants
/// - Variants are stable for CLI parsing and catalog lookup.
/// - [`Locale::En`] is the default fallback locale.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Locale {
    /// English (default).
    En,
    /// Catalan.
    Ca,
}

impl Locale {
    /// Returns the canonical locale label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ca => "ca",
        }
    }

    /// Attempts to parse a locale value (case-insensitive, tolerant of region tags).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        let lang = normalized.split(['-', '_']).next().unwrap_or("");
        match lang {
            "en" => Some(Self::En),
            "ca" => Some(Self::Ca),
            _ => None,
        }
    }
}

/// Ordered list of supported CLI locales.
pub const SUPPORTED_LOCALES: &[Locale] = &[Locale::En, Locale::Ca];

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// Placeholder name without braces (for example, `"path"`).
    pub key: &'static str,
    /// Preformatted substitution value.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Locale Selection
// ============================================================================

/// Global locale selection for CLI output.
static CURRENT_LOCALE: OnceLock<Locale> = OnceLock::new();

/// Sets the CLI locale. Only the first call wins.
pub fn set_locale(locale: Locale) {
    let _ = CURRENT_LOCALE.set(locale);
}

/// Returns the current CLI locale (defaults to English).
#[must_use]
pub fn current_locale() -> Locale {
    CURRENT_LOCALE.get().copied().unwrap_or(Locale::En)
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// English catalog entries.
const CATALOG_EN: &[(&str, &str)] = &[
    ("main.version", "apk-probe {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("output.json_failed", "Failed to render JSON output: {error}"),
    ("logging.init_failed", "Failed to initialize logging from {env}: {error}"),
    (
        "input.read_too_large",
        "Refusing to read {kind} at {path} because it is {size} bytes (limit {limit}).",
    ),
    ("input.read_failed", "Failed to read {kind} at {path}: {error}"),
    ("input.kind.archive", "archive"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config valid."),
    ("client.init_failed", "Failed to initialize the service client: {error}"),
    ("section.header", "== {section} =="),
    ("check.pass", "[PASS] {name}: {message}"),
    ("check.fail", "[FAIL] {name}: {message}"),
    ("job.submitted", "Job accepted: {job_id}"),
    ("job.progress", "Attempt {attempt}: {status} {progress}% {step}"),
    ("job.log_line", "    | {line}"),
    ("job.transient", "Attempt {attempt}: transient error: {error}"),
    ("download.summary", "Downloaded {file_name}: {bytes} bytes in {elapsed_ms} ms"),
    ("download.header", "    {name}: {value}"),
    ("download.archive", "    entries={entries} manifest={manifest} signature_dir={signature}"),
    (
        "download.markers",
        "    debuggable={debuggable} cleartext={cleartext} network_security_config={network} \
         test_only={test_only}",
    ),
    ("tool.entry", "Tool {name}: {state}"),
    ("stats.entry", "    {name}: {value}"),
    ("diagnostic.timing", "{name} responded in {elapsed_ms} ms"),
    ("env.required", "    {name}: {state} {preview}"),
    ("env.credential", "    {name}: {state}"),
    ("env.state.set", "set"),
    ("env.state.missing", "missing"),
    (
        "summary.line",
        "Summary ({suite}): {passed}/{total} passed ({rate}%), threshold {threshold}% {verdict}",
    ),
    ("summary.verdict.met", "met"),
    ("summary.verdict.missed", "not met"),
    ("report.write_failed", "Failed to write report: {error}"),
    ("report.serialize_failed", "Failed to serialize report: {error}"),
    ("report.written", "Report written to {path}"),
    ("poll.invalid_job_id", "Job id must not be empty."),
    ("inspect.summary", "Archive {path}: {entries} entries"),
    ("inspect.invalid", "Not a valid archive: {error}"),
    ("inspect.violation", "Violation: {violation}"),
    ("inspect.ok", "No violations (signature expectation: {expectation})."),
    ("synth.build_failed", "Failed to build the synthetic package: {error}"),
    ("synth.write_failed", "Failed to write {path}: {error}"),
    ("synth.ok", "Wrote {bytes} bytes to {path}"),
    ("i18n.lang.invalid_env", "Invalid value for {env}: {value}. Expected 'en' or 'ca'."),
    (
        "i18n.disclaimer.machine_translated",
        "Note: non-English output is machine-translated and may be inaccurate.",
    ),
];

/// Catalan catalog entries.
const CATALOG_CA: &[(&str, &str)] = &[
    ("main.version", "apk-probe {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "sortida"),
    ("output.write_failed", "No s'ha pogut escriure a {stream}: {error}"),
    ("output.json_failed", "No s'ha pogut renderitzar la sortida JSON: {error}"),
    ("logging.init_failed", "No s'ha pogut inicialitzar el registre des de {env}: {error}"),
    (
        "input.read_too_large",
        "Es refusa llegir {kind} a {path} perquè té {size} bytes (límit {limit}).",
    ),
    ("input.read_failed", "No s'ha pogut llegir {kind} a {path}: {error}"),
    ("input.kind.archive", "arxiu"),
    ("config.load_failed", "No s'ha pogut carregar la configuració: {error}"),
    ("config.validate.ok", "Configuració vàlida."),
    ("client.init_failed", "No s'ha pogut inicialitzar el client del servei: {error}"),
    ("section.header", "== {section} =="),
    ("check.pass", "[OK] {name}: {message}"),
    ("check.fail", "[ERROR] {name}: {message}"),
    ("job.submitted", "Tasca acceptada: {job_id}"),
    ("job.progress", "Intent {attempt}: {status} {progress}% {step}"),
    ("job.log_line", "    | {line}"),
    ("job.transient", "Intent {attempt}: error transitori: {error}"),
    ("download.summary", "Descarregat {file_name}: {bytes} bytes en {elapsed_ms} ms"),
    ("download.header", "    {name}: {value}"),
    ("download.archive", "    entrades={entries} manifest={manifest} signature_dir={signature}"),
    (
        "download.markers",
        "    debuggable={debuggable} cleartext={cleartext} network_security_config={network} \
         test_only={test_only}",
    ),
    ("tool.entry", "Eina {name}: {state}"),
    ("stats.entry", "    {name}: {value}"),
    ("diagnostic.timing", "{name} ha respost en {elapsed_ms} ms"),
    ("env.required", "    {name}: {state} {preview}"),
    ("env.credential", "    {name}: {state}"),
    ("env.state.set", "definida"),
    ("env.state.missing", "absent"),
    (
        "summary.line",
        "Resum ({suite}): {passed}/{total} superades ({rate}%), llindar {threshold}% {verdict}",
    ),
    ("summary.verdict.met", "assolit"),
    ("summary.verdict.missed", "no assolit"),
    ("report.write_failed", "No s'ha pogut escriure l'informe: {error}"),
    ("report.serialize_failed", "No s'ha pogut serialitzar l'informe: {error}"),
    ("report.written", "Informe escrit a {path}"),
    ("poll.invalid_job_id", "L'identificador de tasca no pot estar buit."),
    ("inspect.summary", "Arxiu {path}: {entries} entrades"),
    ("inspect.invalid", "No és un arxiu vàlid: {error}"),
    ("inspect.violation", "Infracció: {violation}"),
    ("inspect.ok", "Cap infracció (expectativa de signatura: {expectation})."),
    ("synth.build_failed", "No s'ha pogut construir el paquet sintètic: {error}"),
    ("synth.write_failed", "No s'ha pogut escriure {path}: {error}"),
    ("synth.ok", "S'han escrit {bytes} bytes a {path}"),
    ("i18n.lang.invalid_env", "Valor no vàlid per a {env}: {value}. S'esperava 'en' o 'ca'."),
    (
        "i18n.disclaimer.machine_translated",
        "Nota: la sortida que no és en anglès està traduïda automàticament i pot ser inexacta.",
    ),
];

/// Returns the raw catalog entries for the requested locale.
#[cfg(test)]
pub(crate) const fn catalog_entries_for(locale: Locale) -> &'static [(&'static str, &'static str)] {
    match locale {
        Locale::En => CATALOG_EN,
        Locale::Ca => CATALOG_CA,
    }
}

/// Returns the message catalog for the requested locale.
pub(crate) fn catalog_for(locale: Locale) -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_EN_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    static CATALOG_CA_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    match locale {
        Locale::En => CATALOG_EN_MAP.get_or_init(|| CATALOG_EN.iter().copied().collect()),
        Locale::Ca => CATALOG_CA_MAP.get_or_init(|| CATALOG_CA.iter().copied().collect()),
    }
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` using the selected locale while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog_for(current_locale())
        .get(key)
        .copied()
        .or_else(|| catalog_for(Locale::En).get(key).copied())
        .unwrap_or(key);
    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a localized message from a key and named arguments.
///
/// Named arguments are substituted into `{placeholder}` positions.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}
