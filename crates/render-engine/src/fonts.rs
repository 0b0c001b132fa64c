//! Font discovery and loading.
//!
//! Text overlays name a font family and a weight. [`FontBook`] maps those to
//! font files found in a list of directories (configured ones first, then
//! the platform font directories) and keeps every loaded face so a family is
//! parsed once per book. Generic families (`sans-serif`, `serif`,
//! `monospace`) and unknown families fall back to a list of common faces; a
//! bold request with no bold file uses the regular face emboldened at draw
//! time.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use ab_glyph::FontArc;

use clipforge_common::error::{ClipforgeError, ClipforgeResult};

const FONT_EXTENSIONS: [&str; 3] = ["ttf", "otf", "ttc"];

const SANS_FAMILIES: [&str; 10] = [
    "dejavusans",
    "liberationsans",
    "notosans",
    "arial",
    "helvetica",
    "helveticaneue",
    "roboto",
    "opensans",
    "verdana",
    "segoeui",
];

const SERIF_FAMILIES: [&str; 6] = [
    "dejavuserif",
    "liberationserif",
    "notoserif",
    "timesnewroman",
    "times",
    "georgia",
];

const MONO_FAMILIES: [&str; 6] = [
    "dejavusansmono",
    "liberationmono",
    "notosansmono",
    "couriernew",
    "menlo",
    "consolas",
];

const BOLD_SUFFIXES: [&str; 2] = ["bold", "bd"];
const REGULAR_SUFFIXES: [&str; 3] = ["", "regular", "book"];

/// A parsed font ready for rasterization.
#[derive(Clone)]
pub struct Face {
    pub(crate) font: FontArc,
    pub(crate) synthetic_bold: bool,
    path: PathBuf,
}

impl Face {
    /// Parse the font file at `path`.
    pub fn load(path: &Path) -> ClipforgeResult<Self> {
        let bytes = std::fs::read(path)?;
        let font = FontArc::try_from_vec(bytes).map_err(|e| {
            ClipforgeError::render(format!("Invalid font {}: {e}", path.display()))
        })?;
        Ok(Self {
            font,
            synthetic_bold: false,
            path: path.to_path_buf(),
        })
    }

    /// File the face was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether bold is produced by widening the regular outlines.
    pub fn is_synthetic_bold(&self) -> bool {
        self.synthetic_bold
    }

    fn emboldened(mut self) -> Self {
        self.synthetic_bold = true;
        self
    }
}

impl fmt::Debug for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Face")
            .field("path", &self.path)
            .field("synthetic_bold", &self.synthetic_bold)
            .finish()
    }
}

/// Font faces resolved by family and weight.
#[derive(Debug, Clone, Default)]
pub struct FontBook {
    dirs: Vec<PathBuf>,
    files: Option<Vec<PathBuf>>,
    faces: HashMap<(String, bool), Face>,
}

impl FontBook {
    /// A book searching only `dirs`.
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self {
            dirs,
            files: None,
            faces: HashMap::new(),
        }
    }

    /// A book searching `extra_dirs` first, then the platform font
    /// directories.
    pub fn system(extra_dirs: &[PathBuf]) -> Self {
        let mut dirs = extra_dirs.to_vec();
        dirs.extend(system_font_dirs());
        Self::new(dirs)
    }

    /// Resolve and cache the face for `family` at the given weight.
    pub fn load(&mut self, family: &str, bold: bool) -> ClipforgeResult<Face> {
        let key = (normalize(family), bold);
        if let Some(face) = self.faces.get(&key) {
            return Ok(face.clone());
        }
        let face = self.resolve(family, bold)?;
        tracing::debug!(
            family,
            bold,
            path = %face.path.display(),
            synthetic_bold = face.synthetic_bold,
            "Loaded font"
        );
        self.faces.insert(key, face.clone());
        Ok(face)
    }

    /// A face previously resolved by [`FontBook::load`].
    pub fn get(&self, family: &str, bold: bool) -> Option<&Face> {
        self.faces.get(&(normalize(family), bold))
    }

    fn resolve(&mut self, family: &str, bold: bool) -> ClipforgeResult<Face> {
        let requested = normalize(family);
        let files = self.files().to_vec();

        for name in candidate_families(&requested) {
            if bold {
                if let Some(face) = load_named(&files, &name, &BOLD_SUFFIXES) {
                    return Ok(face);
                }
            }
            if let Some(face) = load_named(&files, &name, &REGULAR_SUFFIXES) {
                return Ok(if bold { face.emboldened() } else { face });
            }
        }

        // Last resort: the first readable font.
        for path in &files {
            if let Ok(face) = Face::load(path) {
                tracing::warn!(
                    family,
                    path = %path.display(),
                    "No matching font family, using first available font"
                );
                return Ok(if bold { face.emboldened() } else { face });
            }
        }

        Err(ClipforgeError::render(format!(
            "No font found for family '{family}' (searched {} directories)",
            self.dirs.len()
        )))
    }

    /// Font files under the search directories, scanned on first use.
    fn files(&mut self) -> &[PathBuf] {
        if self.files.is_none() {
            let mut found = Vec::new();
            for dir in &self.dirs {
                collect_font_files(dir, &mut found);
            }
            tracing::debug!(dirs = self.dirs.len(), fonts = found.len(), "Scanned font directories");
            self.files = Some(found);
        }
        self.files.as_deref().unwrap_or_default()
    }
}

/// Lowercase alphanumerics only: `"DejaVu Sans"` and `DejaVuSans` compare
/// equal.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Families to try for a requested name, most specific first.
fn candidate_families(requested: &str) -> Vec<String> {
    let generic: &[&str] = match requested {
        "serif" => &SERIF_FAMILIES,
        "monospace" | "mono" => &MONO_FAMILIES,
        _ => &SANS_FAMILIES,
    };
    let mut names = Vec::with_capacity(generic.len() + 1);
    if !matches!(requested, "sansserif" | "sans" | "serif" | "monospace" | "mono" | "") {
        names.push(requested.to_string());
    }
    for name in generic {
        if !names.iter().any(|n| n == name) {
            names.push((*name).to_string());
        }
    }
    names
}

/// Load the first file whose normalized stem is `family` plus one of
/// `suffixes`.
fn load_named(files: &[PathBuf], family: &str, suffixes: &[&str]) -> Option<Face> {
    for suffix in suffixes {
        let wanted = format!("{family}{suffix}");
        for path in files {
            let stem = path.file_stem().and_then(|s| s.to_str()).map(normalize);
            if stem.as_deref() != Some(wanted.as_str()) {
                continue;
            }
            match Face::load(path) {
                Ok(face) => return Some(face),
                Err(e) => tracing::debug!(path = %path.display(), error = %e, "Skipping font"),
            }
        }
    }
    None
}

fn collect_font_files(dir: &Path, found: &mut Vec<PathBuf>) {
    let mut pending = vec![dir.to_path_buf()];
    let mut batch = Vec::new();
    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if is_font_file(&path) {
                batch.push(path);
            }
        }
    }
    // Stable order within a directory tree; earlier trees keep priority.
    batch.sort();
    found.extend(batch);
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FONT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn system_font_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![
        PathBuf::from("/usr/share/fonts"),
        PathBuf::from("/usr/local/share/fonts"),
        PathBuf::from("/System/Library/Fonts"),
        PathBuf::from("/Library/Fonts"),
    ];
    if let Ok(home) = std::env::var("HOME") {
        let home = PathBuf::from(home);
        dirs.push(home.join(".local/share/fonts"));
        dirs.push(home.join(".fonts"));
        dirs.push(home.join("Library/Fonts"));
    }
    if let Ok(windir) = std::env::var("WINDIR") {
        dirs.push(PathBuf::from(windir).join("Fonts"));
    }
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ignores_case_and_separators() {
        assert_eq!(normalize("DejaVu Sans"), "dejavusans");
        assert_eq!(normalize("DejaVuSans-Bold"), "dejavusansbold");
        assert_eq!(normalize("sans-serif"), "sansserif");
    }

    #[test]
    fn test_generic_family_expands_to_common_faces() {
        let names = candidate_families("sansserif");
        assert_eq!(names.first().map(String::as_str), Some("dejavusans"));
        assert!(!names.iter().any(|n| n == "sansserif"));

        let mono = candidate_families("monospace");
        assert_eq!(mono.first().map(String::as_str), Some("dejavusansmono"));
    }

    #[test]
    fn test_named_family_tried_before_fallbacks() {
        let names = candidate_families("roboto");
        assert_eq!(names[0], "roboto");
        assert_eq!(names.iter().filter(|n| *n == "roboto").count(), 1);
        assert!(names.contains(&"dejavusans".to_string()));
    }

    #[test]
    fn test_font_file_extensions() {
        assert!(is_font_file(Path::new("/fonts/DejaVuSans.ttf")));
        assert!(is_font_file(Path::new("/fonts/Inter.OTF")));
        assert!(!is_font_file(Path::new("/fonts/readme.txt")));
    }

    #[test]
    fn test_empty_directories_have_no_fonts() {
        let dir = std::env::temp_dir().join(format!("clipforge-fonts-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut book = FontBook::new(vec![dir.clone()]);
        let err = book.load("sans-serif", false).unwrap_err();
        assert!(err.to_string().contains("No font found"));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_system_faces_are_cached() {
        let mut book = FontBook::system(&[]);
        let face = book.load("sans-serif", false).unwrap();
        assert_eq!(book.get("Sans Serif", false).map(Face::path), Some(face.path()));
        assert!(book.get("sans-serif", true).is_none());

        let bold = book.load("sans-serif", true).unwrap();
        assert!(bold.is_synthetic_bold() || bold.path() != face.path());
    }
}
