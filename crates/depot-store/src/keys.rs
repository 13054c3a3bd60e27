//! Remote object key layout.

use uuid::Uuid;

/// Build the remote object key for an entry: `entries/{id}/{name}`.
///
/// The id segment keeps keys unique across renames and same-named files
/// in different folders.
pub fn object_key(id: Uuid, name: &str) -> String {
    format!("entries/{id}/{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_layout() {
        let id = Uuid::nil();
        assert_eq!(
            object_key(id, "report.pdf"),
            "entries/00000000-0000-0000-0000-000000000000/report.pdf"
        );
    }
}
