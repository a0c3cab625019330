//! Assembly stage: invoke the external font-generation routine and derive the
//! refreshed codepoint map from its stylesheet.
//!
//! The routine itself (glyph outlines, font binary encoding) lives behind the
//! [`FontGenerator`] trait; this crate only prepares its request and consumes
//! its output. Any generator error is fatal: no partial bundle is published.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::codepoints::CodepointMap;
use crate::download::DownloadedSet;
use crate::event::IconSetRequest;

/// Fixed generation profile: monospaced glyphs, horizontally centered,
/// normalized to a fixed height, with css/html/json sidecars enabled.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationProfile {
    pub base_tag: String,
    pub base_selector: String,
    pub class_prefix: String,
    pub fixed_width: bool,
    pub center_horizontally: bool,
    pub normalize: bool,
    pub font_height: u32,
    pub descent: u32,
    pub round: f64,
    pub css: bool,
    pub html: bool,
    pub json: bool,
    /// Public base URL the preview templates reference the bundle under.
    pub asset_base_url: String,
}

impl GenerationProfile {
    pub fn for_set(bucket: &str, name: &str) -> Self {
        Self {
            base_tag: "i".into(),
            base_selector: ".icon".into(),
            class_prefix: "icon-".into(),
            fixed_width: true,
            center_horizontally: true,
            normalize: true,
            font_height: 1000,
            descent: 150,
            round: 10e12,
            css: true,
            html: true,
            json: true,
            asset_base_url: format!("https://{bucket}.s3.amazonaws.com/{name}/"),
        }
    }
}

/// Everything the generation routine needs for one icon set.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    /// Icon-set name, doubling as font family and CSS class namespace.
    pub font_name: String,
    /// Staged icon files to render into glyphs.
    pub files: Vec<PathBuf>,
    /// Pre-assigned codepoints; unlisted icons get generator defaults.
    pub codepoints: CodepointMap,
    /// Directory the routine writes the bundle into.
    pub dest: PathBuf,
    pub profile: GenerationProfile,
}

/// Successful generation hands back the stylesheet text; the binary font
/// files land directly in the destination directory.
#[derive(Debug, Clone)]
pub struct GeneratedFont {
    pub stylesheet: String,
}

pub type GenerateError = Box<dyn std::error::Error + Send + Sync>;

/// External glyph-font generation routine.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait FontGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedFont, GenerateError>;
}

/// Generator that shells out to an external program, handing it the full
/// request as a JSON spec file and reading the stylesheet it produced.
pub struct CommandFontGenerator {
    program: PathBuf,
}

impl CommandFontGenerator {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl FontGenerator for CommandFontGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedFont, GenerateError> {
        // The spec file lives outside the working area so the uploader never
        // mistakes it for a bundle artifact.
        let mut spec = tempfile::NamedTempFile::new()?;
        spec.write_all(serde_json::to_string(request)?.as_bytes())?;

        info!(
            program = %self.program.display(),
            font = %request.font_name,
            "launching font generator"
        );
        let status = Command::new(&self.program).arg(spec.path()).status()?;
        if !status.success() {
            return Err(format!(
                "font generator {} exited with {status}",
                self.program.display()
            )
            .into());
        }

        let css_path = request.dest.join(format!("{}.css", request.font_name));
        let stylesheet = fs::read_to_string(&css_path).map_err(|e| {
            format!(
                "generator produced no stylesheet at {}: {e}",
                css_path.display()
            )
        })?;
        Ok(GeneratedFont { stylesheet })
    }
}

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("font generation failed: {0}")]
    Generate(GenerateError),
    #[error("failed to serialize codepoint map: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write codepoint map {path}: {source}")]
    WriteMap {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Run generation for the downloaded set and write the refreshed
/// `<name>.json` codepoint map next to the generated artifacts.
///
/// Returns the derived name → codepoint-string map, which becomes the next
/// invocation's persisted map once uploaded.
pub async fn assemble<G: FontGenerator>(
    generator: &G,
    request: &IconSetRequest,
    set: &DownloadedSet,
    codepoints: CodepointMap,
    work_dir: &Path,
) -> Result<BTreeMap<String, String>, AssembleError> {
    let generation = GenerationRequest {
        font_name: request.name.clone(),
        files: set.icons.iter().map(|icon| icon.path.clone()).collect(),
        codepoints,
        dest: work_dir.to_path_buf(),
        profile: GenerationProfile::for_set(&request.bucket, &request.name),
    };
    info!(
        font = %generation.font_name,
        icons = generation.files.len(),
        assigned = generation.codepoints.len(),
        "invoking font generation"
    );

    let font = match generator.generate(&generation).await {
        Ok(font) => font,
        Err(e) => {
            error!(font = %generation.font_name, error = %e, "font generation failed");
            return Err(AssembleError::Generate(e));
        }
    };

    let map = codepoint_map_from_stylesheet(&font.stylesheet);
    let map_path = work_dir.join(format!("{}.json", request.name));
    let serialized = serde_json::to_string_pretty(&map)?;
    fs::write(&map_path, serialized).map_err(|source| AssembleError::WriteMap {
        path: map_path.clone(),
        source,
    })?;
    info!(
        path = %map_path.display(),
        entries = map.len(),
        "wrote refreshed codepoint map"
    );
    Ok(map)
}

/// Scan the generated stylesheet for `<selector>:before { content: "<code>" }`
/// rules and collect the icon name → codepoint-string pairs.
pub fn codepoint_map_from_stylesheet(css: &str) -> BTreeMap<String, String> {
    let rule = Regex::new(r#"-(.*):before.*\n\s*content: "(.*)""#).unwrap();
    let mut map = BTreeMap::new();
    for caps in rule.captures_iter(css) {
        map.insert(caps[1].to_string(), caps[2].to_string());
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_map_from_before_rules() {
        let css = "\
.icon {\n  font-family: \"social\";\n}\n\
.icon-twitter:before {\n  content: \"\\f101\"\n}\n\
.icon-arrow-left:before {\n  content: \"\\f102\"\n}\n";
        let map = codepoint_map_from_stylesheet(css);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("twitter").map(String::as_str), Some("\\f101"));
        assert_eq!(map.get("arrow-left").map(String::as_str), Some("\\f102"));
    }

    #[test]
    fn ignores_rules_without_content() {
        let css = ".icon-alone:before {\n  color: red\n}\n";
        assert!(codepoint_map_from_stylesheet(css).is_empty());
    }

    #[test]
    fn profile_carries_fixed_generation_settings() {
        let profile = GenerationProfile::for_set("assets", "social");
        assert!(profile.fixed_width);
        assert!(profile.center_horizontally);
        assert!(profile.normalize);
        assert_eq!(profile.font_height, 1000);
        assert_eq!(profile.class_prefix, "icon-");
        assert_eq!(
            profile.asset_base_url,
            "https://assets.s3.amazonaws.com/social/"
        );
    }
}
