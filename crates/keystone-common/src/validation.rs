//! Input validation for blueprints and structure documents.
//!
//! Names double as identity keys on the live server, so duplicates would make
//! reconciliation ambiguous. Everything here runs before any remote mutation.

use std::collections::HashSet;

use validator::Validate;

use crate::blueprint::Blueprint;
use crate::error::KeystoneError;
use crate::models::StructureDocument;

/// Validate a value, returning a KeystoneError::Validation on failure.
pub fn validate_request<T: Validate>(body: &T) -> Result<(), KeystoneError> {
    body.validate().map_err(|e| KeystoneError::Validation {
        message: format_validation_errors(e),
    })
}

/// Format validation errors into a human-readable string.
fn format_validation_errors(errors: validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for '{field}'"))
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn invalid(message: impl Into<String>) -> KeystoneError {
    KeystoneError::Validation { message: message.into() }
}

/// Check role names and tags are unique and every mapped scheme exists.
pub fn validate_blueprint(blueprint: &Blueprint) -> Result<(), KeystoneError> {
    let mut names = HashSet::new();
    let mut tags = HashSet::new();
    for role in &blueprint.roles {
        validate_request(role)?;
        if !names.insert(role.name.as_str()) {
            return Err(invalid(format!("Duplicate role name '{}'", role.name)));
        }
        if let Some(tag) = role.tag.as_deref() {
            if tag == "everyone" || tag == "@everyone" {
                return Err(invalid(format!("Role '{}' uses the reserved tag '{tag}'", role.name)));
            }
            if !tags.insert(tag) {
                return Err(invalid(format!("Duplicate role tag '{tag}'")));
            }
        }
    }

    if let Some(identity) = &blueprint.identity {
        validate_request(identity)?;
    }

    let map = &blueprint.permission_map;
    for (target, key) in map.categories.iter().chain(map.channels.iter()) {
        if !blueprint.schemes.contains_key(key) {
            return Err(invalid(format!("'{target}' refers to unknown permission scheme '{key}'")));
        }
    }

    Ok(())
}

/// Check the document's identity-key invariants.
///
/// - at most one uncategorized block
/// - category names unique
/// - channel names unique across the whole document
pub fn validate_document(doc: &StructureDocument) -> Result<(), KeystoneError> {
    let mut unnamed = 0;
    let mut categories = HashSet::new();
    let mut channels = HashSet::new();

    for block in &doc.categories {
        match block.name.as_deref() {
            None => {
                unnamed += 1;
                if unnamed > 1 {
                    return Err(invalid("Only one uncategorized block is allowed"));
                }
            }
            Some(name) => {
                if name.trim().is_empty() {
                    return Err(invalid("Category name cannot be empty or whitespace only"));
                }
                if !categories.insert(name) {
                    return Err(invalid(format!("Duplicate category '{name}'")));
                }
            }
        }

        for (_, spec) in block.ordered_channels() {
            validate_request(spec)?;
            if !channels.insert(spec.name.as_str()) {
                return Err(invalid(format!("Duplicate channel '{}'", spec.name)));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategoryBlock, ChannelPermissionScheme, RoleSpec};

    fn doc(blocks: Vec<CategoryBlock>) -> StructureDocument {
        StructureDocument::new(blocks)
    }

    #[test]
    fn accepts_well_formed_document() {
        let d = doc(vec![
            CategoryBlock::uncategorized().text("rules"),
            CategoryBlock::named("A").text("x").voice("y"),
            CategoryBlock::named("B"),
        ]);
        assert!(validate_document(&d).is_ok());
    }

    #[test]
    fn rejects_second_uncategorized_block() {
        let d = doc(vec![CategoryBlock::uncategorized(), CategoryBlock::uncategorized()]);
        assert!(matches!(validate_document(&d), Err(KeystoneError::Validation { .. })));
    }

    #[test]
    fn rejects_duplicate_channel_across_categories() {
        let d = doc(vec![
            CategoryBlock::named("A").text("chat"),
            CategoryBlock::named("B").voice("chat"),
        ]);
        let err = validate_document(&d).unwrap_err();
        assert!(err.to_string().contains("Duplicate channel 'chat'"));
    }

    #[test]
    fn rejects_empty_channel_name() {
        let d = doc(vec![CategoryBlock::named("A").text("")]);
        let err = validate_document(&d).unwrap_err();
        assert!(err.to_string().contains("1-100"));
    }

    #[test]
    fn blueprint_rejects_duplicate_tags() {
        let bp = Blueprint {
            roles: vec![RoleSpec::new("A").with_tag("admin"), RoleSpec::new("B").with_tag("admin")],
            ..Blueprint::default()
        };
        assert!(validate_blueprint(&bp).unwrap_err().to_string().contains("Duplicate role tag"));
    }

    #[test]
    fn blueprint_rejects_unknown_scheme_reference() {
        let mut bp = Blueprint::default();
        bp.permission_map.channels.insert("news".into(), "missing".into());
        assert!(validate_blueprint(&bp).is_err());

        bp.schemes.insert("missing".into(), ChannelPermissionScheme::default());
        assert!(validate_blueprint(&bp).is_ok());
    }
}
