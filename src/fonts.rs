//! Find installed fonts that can draw the Chinese labels of the figures.
//!
//! Font files are parsed with `ttf-parser` and kept when their character map has a glyph for a
//! test character. The family names are what the `font_family` setting expects.
use log::{debug, warn};
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

/// Font family used when none is configured.
pub const DEFAULT_FONT_FAMILY: &str = "sans-serif";

/// Character that must be in a font for it to be listed.
pub const TEST_CHARACTER: char = '又';

/// Directories searched for fonts on Linux, macOS and Windows.
pub fn system_font_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = [
        "/usr/share/fonts",
        "/usr/local/share/fonts",
        "/Library/Fonts",
        "/System/Library/Fonts",
        "C:\\Windows\\Fonts",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();

    if let Some(home) = std::env::var_os("HOME") {
        let home = PathBuf::from(home);
        dirs.push(home.join(".fonts"));
        dirs.push(home.join(".local/share/fonts"));
        dirs.push(home.join("Library/Fonts"));
    }

    dirs
}

/// A font face with a glyph for the test character.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FontMatch {
    /// Family name.
    pub family: String,
    /// File the face was found in.
    pub path: PathBuf,
}

/// Every font under `dirs` that can draw `ch`, sorted by family name.
///
/// Unreadable files are logged and skipped.
pub fn fonts_with_char(dirs: &[PathBuf], ch: char) -> Vec<FontMatch> {
    let mut found = BTreeSet::new();

    for file in dirs.iter().flat_map(|dir| font_files(dir)) {
        let data = match std::fs::read(&file) {
            Ok(data) => data,
            Err(err) => {
                warn!("cannot read font {}: {}", file.display(), err);
                continue;
            }
        };

        for family in families_with_char(&data, ch) {
            found.insert(FontMatch {
                family,
                path: file.clone(),
            });
        }
    }

    found.into_iter().collect()
}

/// Unique family names of the fonts under the system directories that can draw Chinese.
pub fn list_chinese_fonts() -> Vec<String> {
    let families: BTreeSet<String> = fonts_with_char(&system_font_dirs(), TEST_CHARACTER)
        .into_iter()
        .map(|m| m.family)
        .collect();
    families.into_iter().collect()
}

/// Family names of the faces in a font file (or collection) that have a glyph for `ch`.
pub fn families_with_char(data: &[u8], ch: char) -> Vec<String> {
    let faces = ttf_parser::fonts_in_collection(data).unwrap_or(1);

    (0..faces)
        .filter_map(|index| match ttf_parser::Face::parse(data, index) {
            Ok(face) => Some(face),
            Err(err) => {
                debug!("skipping face {}: {}", index, err);
                None
            }
        })
        .filter(|face| face.glyph_index(ch).is_some())
        .filter_map(|face| family_name(&face))
        .collect()
}

fn family_name(face: &ttf_parser::Face) -> Option<String> {
    let names: Vec<_> = face
        .names()
        .into_iter()
        .filter(|name| name.name_id == ttf_parser::name_id::FAMILY)
        .collect();

    // Prefer the English name, any readable one otherwise.
    names
        .iter()
        .filter(|name| name.language_id == 0x0409)
        .chain(names.iter())
        .find_map(|name| name.to_string())
}

/// Font files under `dir`, a missing directory has none.
///
/// Links to directories are never descended into, links to files are kept.
fn font_files(dir: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|res| res.ok())
        .filter(|entry| {
            entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
        })
        .map(|entry| entry.into_path())
        .filter(|path| is_font_file(path))
        .collect()
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            ext == "ttf" || ext == "otf" || ext == "ttc" || ext == "otc"
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_font_extensions() {
        assert!(is_font_file(Path::new("/usr/share/fonts/NotoSansCJK-Regular.ttc")));
        assert!(is_font_file(Path::new("Heiti.TTF")));
        assert!(!is_font_file(Path::new("fonts.conf")));
        assert!(!is_font_file(Path::new("README")));
    }

    #[test]
    fn test_garbage_is_not_a_font() {
        assert!(families_with_char(b"definitely not a font", TEST_CHARACTER).is_empty());
    }

    #[test]
    fn test_search_skips_missing_and_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.ttf"), b"nope").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/also_broken.otf"), b"nope").unwrap();

        assert_eq!(font_files(dir.path()).len(), 2);

        let dirs = vec![dir.path().to_path_buf(), dir.path().join("does-not-exist")];
        assert!(fonts_with_char(&dirs, TEST_CHARACTER).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_search_survives_symlink_loops() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("cjk")).unwrap();
        std::fs::write(dir.path().join("cjk/broken.ttc"), b"nope").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("cjk/loop")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("cjk/broken.ttc"), dir.path().join("link.ttc"))
            .unwrap();

        let mut files = font_files(dir.path());
        files.sort();
        assert_eq!(
            files,
            vec![dir.path().join("cjk/broken.ttc"), dir.path().join("link.ttc")]
        );
    }
}
