//! Structure document files.

use std::path::{Path, PathBuf};

use keystone_common::error::{KeystoneError, KeystoneResult};
use keystone_common::models::StructureDocument;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

pub fn load_document(path: impl AsRef<Path>) -> KeystoneResult<StructureDocument> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => KeystoneError::NotFound {
            resource: format!("Structure file {}", path.display()),
        },
        _ => KeystoneError::Io(e),
    })?;
    serde_json::from_str(&text).map_err(|e| KeystoneError::MalformedDocument {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Write the document as UTF-8 JSON with a four-space indent.
pub fn save_document(path: impl AsRef<Path>, document: &StructureDocument) -> KeystoneResult<()> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    document.serialize(&mut ser)?;
    buf.push(b'\n');
    std::fs::write(path.as_ref(), buf)?;
    tracing::info!(
        path = %path.as_ref().display(),
        categories = document.categories.len(),
        "Structure document saved"
    );
    Ok(())
}

/// File name used when capturing an arbitrary server.
pub fn capture_path(server_id: &str) -> PathBuf {
    PathBuf::from(format!("new_server_structure_{server_id}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_common::models::CategoryBlock;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("keystone-{}-{name}", std::process::id()))
    }

    #[test]
    fn saved_file_uses_four_spaces_and_keeps_unicode() {
        let path = temp_file("unicode.json");
        let doc = StructureDocument::new(vec![CategoryBlock::named("Общение").text("чат")]);
        save_document(&path, &doc).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n    \"categories\""));
        assert!(text.contains("Общение"));
        assert_eq!(load_document(&path).unwrap(), doc);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_document(temp_file("absent.json")).unwrap_err();
        assert!(matches!(err, KeystoneError::NotFound { .. }));
    }

    #[test]
    fn bad_json_is_malformed() {
        let path = temp_file("broken.json");
        std::fs::write(&path, "{ \"categories\": [ { \"name\": 3 } ] }").unwrap();
        let err = load_document(&path).unwrap_err();
        assert!(matches!(err, KeystoneError::MalformedDocument { .. }));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn capture_path_embeds_server_id() {
        assert_eq!(capture_path("42"), PathBuf::from("new_server_structure_42.json"));
    }
}
