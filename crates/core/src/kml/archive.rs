//! Reading `.kml` files and `.kmz` archives.

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use base64::Engine as _;

use super::KmlError;

/// Archive directory holding icon images.
pub const IMAGES_DIR: &str = "images/";

/// Input formats accepted by the importer, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Kml,
    Kmz,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self, KmlError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "kml" => Ok(Self::Kml),
            "kmz" => Ok(Self::Kmz),
            _ => Err(KmlError::UnsupportedExtension(ext)),
        }
    }
}

/// KML text plus the images shipped alongside it.
#[derive(Debug, Clone, Default)]
pub struct KmlSource {
    pub kml: String,
    /// Archive path (e.g. `images/a.png`) to `data:` URI.
    pub images: HashMap<String, String>,
}

pub fn read_source(path: &Path) -> Result<KmlSource, KmlError> {
    let io_err = |source| KmlError::Io {
        path: path.to_path_buf(),
        source,
    };

    match SourceFormat::from_path(path)? {
        SourceFormat::Kml => {
            let bytes = std::fs::read(path).map_err(io_err)?;
            Ok(KmlSource {
                kml: String::from_utf8_lossy(&bytes).into_owned(),
                images: HashMap::new(),
            })
        }
        SourceFormat::Kmz => {
            let file = std::fs::File::open(path).map_err(io_err)?;
            read_kmz(file, path)
        }
    }
}

/// Read the first `.kml` member and every image under [`IMAGES_DIR`].
/// `origin` is only used in error values.
pub fn read_kmz<R: Read + Seek>(reader: R, origin: &Path) -> Result<KmlSource, KmlError> {
    let mut archive = zip::ZipArchive::new(reader)?;
    let mut kml = None;
    let mut images = HashMap::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let lower = name.to_ascii_lowercase();

        let wanted_kml = kml.is_none() && lower.ends_with(".kml");
        let mime = image_mime(&lower).filter(|_| lower.starts_with(IMAGES_DIR));
        if !wanted_kml && mime.is_none() {
            continue;
        }

        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes).map_err(|source| KmlError::Io {
            path: origin.join(&name),
            source,
        })?;

        if wanted_kml {
            tracing::debug!(member = %name, "Using KML member");
            kml = Some(String::from_utf8_lossy(&bytes).into_owned());
        } else if let Some(mime) = mime {
            images.insert(name, data_uri(mime, &bytes));
        }
    }

    let kml = kml.ok_or_else(|| KmlError::MissingKmlMember(origin.to_path_buf()))?;
    Ok(KmlSource { kml, images })
}

fn image_mime(lower_name: &str) -> Option<&'static str> {
    let (_, ext) = lower_name.rsplit_once('.')?;
    match ext {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime};base64,{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    fn kmz(entries: &[(&str, &[u8])]) -> Cursor<Vec<u8>> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, bytes) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(bytes).unwrap();
        }
        let mut cursor = writer.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(SourceFormat::from_path(Path::new("a.KMZ")).unwrap(), SourceFormat::Kmz);
        assert_eq!(SourceFormat::from_path(Path::new("dir/a.kml")).unwrap(), SourceFormat::Kml);
        assert_matches!(
            SourceFormat::from_path(Path::new("a.xlsx")),
            Err(KmlError::UnsupportedExtension(ext)) if ext == "xlsx"
        );
        assert_matches!(
            SourceFormat::from_path(Path::new("noext")),
            Err(KmlError::UnsupportedExtension(_))
        );
    }

    #[test]
    fn first_kml_member_wins() {
        let archive = kmz(&[
            ("readme.txt", b"x"),
            ("doc.kml", b"<kml>first</kml>"),
            ("other.kml", b"<kml>second</kml>"),
        ]);
        let source = read_kmz(archive, Path::new("t.kmz")).unwrap();
        assert_eq!(source.kml, "<kml>first</kml>");
    }

    #[test]
    fn images_become_data_uris() {
        let archive = kmz(&[
            ("doc.kml", b"<kml/>"),
            ("images/a.png", b"A"),
            ("images/b.JPG", b"B"),
            ("images/notes.txt", b"no"),
            ("icons/c.png", b"C"),
        ]);
        let source = read_kmz(archive, Path::new("t.kmz")).unwrap();
        assert_eq!(source.images.len(), 2);
        assert_eq!(source.images["images/a.png"], "data:image/png;base64,QQ==");
        assert_eq!(source.images["images/b.JPG"], "data:image/jpeg;base64,Qg==");
    }

    #[test]
    fn archive_without_kml_fails() {
        let archive = kmz(&[("images/a.png", b"A")]);
        assert_matches!(
            read_kmz(archive, Path::new("t.kmz")),
            Err(KmlError::MissingKmlMember(p)) if p == Path::new("t.kmz")
        );
    }

    #[test]
    fn garbage_is_an_archive_error() {
        let result = read_kmz(Cursor::new(b"not a zip".to_vec()), Path::new("t.kmz"));
        assert_matches!(result, Err(KmlError::Archive(_)));
    }

    #[test]
    fn kml_file_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.kml");
        std::fs::write(&path, "<kml/>").unwrap();
        let source = read_source(&path).unwrap();
        assert_eq!(source.kml, "<kml/>");
        assert!(source.images.is_empty());
    }

    #[test]
    fn missing_file_names_path() {
        let err = read_source(Path::new("/nonexistent/x.kml")).unwrap_err();
        assert_matches!(err, KmlError::Io { path, .. } if path == Path::new("/nonexistent/x.kml"));
    }
}
