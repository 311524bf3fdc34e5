//! JSON export of a document
//!
//! Short exports are shown inline as a fenced code block; anything longer
//! than [`EXPORT_INLINE_LIMIT`] characters is delivered as a `.json` file.

use embed_types::limits::EXPORT_INLINE_LIMIT;
use embed_types::Document;

use crate::error::Result;

/// File stem used when the document has no saved name.
pub const DEFAULT_EXPORT_NAME: &str = "embed";

/// How an export should be delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportPayload {
    /// Message text: the JSON inside a ```` ```json ```` fence.
    Inline(String),
    /// File attachment.
    Attachment { filename: String, bytes: Vec<u8> },
}

/// Serialize `document` canonically and choose inline or attachment
/// delivery.
pub fn export(document: &Document, name: Option<&str>) -> Result<ExportPayload> {
    let json = document.to_pretty_json()?;

    if json.chars().count() > EXPORT_INLINE_LIMIT {
        let stem = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_EXPORT_NAME);
        return Ok(ExportPayload::Attachment {
            filename: format!("{}.json", stem),
            bytes: json.into_bytes(),
        });
    }

    Ok(ExportPayload::Inline(format!("```json\n{}\n```", json)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use embed_types::DocumentField;

    fn big_document() -> Document {
        let mut doc = Document::new();
        for i in 0..10 {
            doc.push_field(DocumentField::new(format!("field {i}"), "v".repeat(300), false))
                .unwrap();
        }
        doc
    }

    #[test]
    fn test_small_document_is_inline() {
        let payload = export(&Document::new(), Some("promo")).unwrap();
        match payload {
            ExportPayload::Inline(text) => {
                assert!(text.starts_with("```json\n{"));
                assert!(text.ends_with("}\n```"));
                assert!(text.contains("\"color\": 3447003"));
            }
            other => panic!("expected inline, got {:?}", other),
        }
    }

    #[test]
    fn test_large_document_is_named_attachment() {
        let doc = big_document();
        let payload = export(&doc, Some("promo")).unwrap();
        match payload {
            ExportPayload::Attachment { filename, bytes } => {
                assert_eq!(filename, "promo.json");
                let back: Document = serde_json::from_slice(&bytes).unwrap();
                assert_eq!(back, doc);
            }
            other => panic!("expected attachment, got {:?}", other),
        }
    }

    #[test]
    fn test_unnamed_attachment_uses_default_name() {
        let payload = export(&big_document(), None).unwrap();
        assert!(matches!(
            payload,
            ExportPayload::Attachment { ref filename, .. } if filename == "embed.json"
        ));
    }

    #[test]
    fn test_threshold_is_on_json_length() {
        let mut doc = Document::new();
        let base = doc.to_pretty_json().unwrap().chars().count();
        // "description": null → "description": "<text>" adds len + 2 chars.
        let filler = EXPORT_INLINE_LIMIT - base + 4 - 2;
        doc.description = Some("d".repeat(filler));
        assert_eq!(doc.to_pretty_json().unwrap().chars().count(), EXPORT_INLINE_LIMIT);
        assert!(matches!(export(&doc, None).unwrap(), ExportPayload::Inline(_)));

        doc.description = Some("d".repeat(filler + 1));
        assert!(matches!(
            export(&doc, None).unwrap(),
            ExportPayload::Attachment { .. }
        ));
    }
}
