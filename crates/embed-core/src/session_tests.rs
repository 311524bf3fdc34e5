#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use embed_types::limits::MAX_FIELDS;
    use embed_types::{Document, EditCommand, InitialInput, ValidationError};

    use crate::error::Error;
    use crate::session::{summarize, ApplyOutcome, SessionRegistry, NO_SESSION_SUMMARY};
    use crate::storage::MemBacking;
    use crate::store::DocumentStore;

    async fn registry() -> (SessionRegistry<MemBacking>, Arc<DocumentStore<MemBacking>>) {
        let store = Arc::new(DocumentStore::new(MemBacking::new()));
        store.load().await;
        (SessionRegistry::new(store.clone()), store)
    }

    fn add_field(i: usize) -> EditCommand {
        EditCommand::AddField {
            name: format!("name {i}"),
            value: format!("value {i}"),
            inline: i % 2 == 0,
        }
    }

    fn set_title(t: &str) -> EditCommand {
        EditCommand::SetTitle {
            value: Some(t.to_string()),
        }
    }

    // ── lifecycle ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_begin_title_finalize_removes_session() {
        let (reg, _) = registry().await;
        reg.begin(42).await;
        reg.apply(42, set_title("Hello")).await.unwrap();

        let outcome = reg.apply(42, EditCommand::Finalize).await.unwrap();
        match outcome {
            ApplyOutcome::Finalized(doc) => assert_eq!(doc.title.as_deref(), Some("Hello")),
            other => panic!("expected Finalized, got {:?}", other),
        }
        assert!(!reg.has_session(42).await);

        let err = reg.apply(42, add_field(0)).await.unwrap_err();
        assert!(matches!(err, Error::NoActiveSession { owner: 42 }));
    }

    #[tokio::test]
    async fn test_begin_returns_default_document() {
        let (reg, _) = registry().await;
        let doc = reg.begin(1).await;
        assert_eq!(doc, Document::new());
        assert_eq!(reg.active_sessions().await, 1);
    }

    #[tokio::test]
    async fn test_begin_twice_resets_state() {
        let (reg, _) = registry().await;
        reg.begin(1).await;
        reg.apply(1, set_title("first")).await.unwrap();
        reg.begin(1).await;

        assert!(reg.document(1).await.unwrap().title.is_none());
        assert_eq!(reg.active_sessions().await, 1);
    }

    #[tokio::test]
    async fn test_begin_with_existing_document() {
        let (reg, _) = registry().await;
        let mut doc = Document::new();
        doc.set_title(Some("loaded".to_string())).unwrap();
        reg.begin_with(3, doc.clone()).await;

        assert_eq!(reg.document(3).await, Some(doc));
    }

    #[tokio::test]
    async fn test_commands_without_session_are_rejected() {
        let (reg, _) = registry().await;
        for cmd in [
            set_title("x"),
            EditCommand::Preview,
            EditCommand::Finalize,
            EditCommand::Save {
                name: "n".to_string(),
            },
        ] {
            let err = reg.apply(9, cmd).await.unwrap_err();
            assert!(matches!(err, Error::NoActiveSession { owner: 9 }));
        }
        assert_eq!(reg.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_sessions_are_per_owner() {
        let (reg, _) = registry().await;
        reg.begin(1).await;
        reg.begin(2).await;
        reg.apply(1, set_title("one")).await.unwrap();

        assert!(reg.document(2).await.unwrap().title.is_none());
        reg.apply(2, EditCommand::Finalize).await.unwrap();
        assert!(reg.has_session(1).await);
    }

    // ── fields ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_field_limit() {
        let (reg, _) = registry().await;
        reg.begin(7).await;
        for i in 0..MAX_FIELDS {
            assert_eq!(reg.apply(7, add_field(i)).await.unwrap(), ApplyOutcome::Updated);
        }

        let err = reg.apply(7, add_field(99)).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::FieldLimitExceeded { limit: 25 })
        ));
        assert_eq!(reg.document(7).await.unwrap().fields.len(), 25);
    }

    #[tokio::test]
    async fn test_fields_keep_order() {
        let (reg, _) = registry().await;
        reg.begin(7).await;
        reg.apply(7, add_field(1)).await.unwrap();
        reg.apply(7, add_field(2)).await.unwrap();

        let doc = reg.document(7).await.unwrap();
        assert_eq!(doc.fields[0].name, "name 1");
        assert_eq!(doc.fields[1].name, "name 2");
        assert!(doc.fields[1].inline);
    }

    // ── colors ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_set_color_palette_and_hex() {
        let (reg, _) = registry().await;
        reg.begin(1).await;

        reg.apply(1, EditCommand::SetColor { value: "red".to_string() })
            .await
            .unwrap();
        assert_eq!(reg.document(1).await.unwrap().color, 0xE74C3C);

        reg.apply(1, EditCommand::SetColor { value: "0xFF0000".to_string() })
            .await
            .unwrap();
        assert_eq!(reg.document(1).await.unwrap().color, 0xFF0000);
    }

    #[tokio::test]
    async fn test_set_color_invalid_leaves_state() {
        let (reg, _) = registry().await;
        reg.begin(1).await;
        reg.apply(1, EditCommand::SetColor { value: "GREEN".to_string() })
            .await
            .unwrap();

        let err = reg
            .apply(1, EditCommand::SetColor { value: "notacolor".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::InvalidColor(_))));
        assert_eq!(reg.document(1).await.unwrap().color, 0x2ECC71);
    }

    #[tokio::test]
    async fn test_fill_initial_defaults_bad_color() {
        let (reg, _) = registry().await;
        reg.begin(1).await;
        reg.fill_initial(
            1,
            InitialInput {
                title: Some("T".to_string()),
                description: "D".to_string(),
                color: Some("notacolor".to_string()),
            },
        )
        .await
        .unwrap();

        let doc = reg.document(1).await.unwrap();
        assert_eq!(doc.color, 0x3498DB);
        assert_eq!(doc.title.as_deref(), Some("T"));
        assert_eq!(doc.description.as_deref(), Some("D"));
    }

    #[tokio::test]
    async fn test_fill_initial_without_session() {
        let (reg, _) = registry().await;
        let err = reg
            .fill_initial(5, InitialInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoActiveSession { owner: 5 }));
        assert!(!reg.has_session(5).await);
    }

    #[tokio::test]
    async fn test_fill_initial_rejects_long_description_atomically() {
        let (reg, _) = registry().await;
        reg.begin(1).await;
        let err = reg
            .fill_initial(
                1,
                InitialInput {
                    title: Some("T".to_string()),
                    description: "d".repeat(5000),
                    color: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::TooLong { .. })));
        assert!(reg.document(1).await.unwrap().title.is_none());
    }

    // ── preview / save ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_preview_does_not_mutate() {
        let (reg, _) = registry().await;
        reg.begin(1).await;
        reg.apply(1, set_title("P")).await.unwrap();

        let outcome = reg.apply(1, EditCommand::Preview).await.unwrap();
        assert_eq!(outcome, ApplyOutcome::Preview(reg.document(1).await.unwrap()));
        assert!(reg.has_session(1).await);
    }

    #[tokio::test]
    async fn test_save_writes_to_store_and_keeps_session() {
        let (reg, store) = registry().await;
        reg.begin(11).await;
        reg.apply(11, set_title("Saved")).await.unwrap();

        let outcome = reg
            .apply(11, EditCommand::Save { name: " promo ".to_string() })
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Saved { name: "promo".to_string() });
        assert_eq!(
            store.get(11, "promo").await.unwrap().title.as_deref(),
            Some("Saved")
        );
        assert!(reg.has_session(11).await);
    }

    #[tokio::test]
    async fn test_save_rejects_bad_names() {
        let (reg, store) = registry().await;
        reg.begin(1).await;

        let err = reg
            .apply(1, EditCommand::Save { name: "  ".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::EmptyName)));

        let err = reg
            .apply(1, EditCommand::Save { name: "n".repeat(51) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::TooLong { .. })));
        assert!(store.list_names(1).await.is_empty());
    }

    // ── summary ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_summary_without_session() {
        let (reg, _) = registry().await;
        assert_eq!(reg.summary(1).await, NO_SESSION_SUMMARY);
    }

    #[tokio::test]
    async fn test_summary_default_document() {
        let (reg, _) = registry().await;
        reg.begin(1).await;
        assert_eq!(reg.summary(1).await, "Color: #3498DB");
    }

    #[test]
    fn test_summarize_full_document() {
        let mut doc = Document::new();
        doc.set_title(Some("Hi".to_string())).unwrap();
        doc.set_description("x".repeat(80)).unwrap();
        doc.fields.push(embed_types::DocumentField::new("a", "b", false));
        doc.color = 0xFF;

        let summary = summarize(&doc);
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "Title: Hi");
        assert_eq!(lines[1], format!("Description: {}...", "x".repeat(50)));
        assert_eq!(lines[2], "Fields: 1");
        assert_eq!(lines[3], "Color: #0000FF");
    }

    // ── idle eviction ─────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_evict_idle_drops_only_stale_sessions() {
        let (reg, _) = registry().await;
        reg.begin(1).await;
        tokio::time::advance(Duration::from_secs(120)).await;
        reg.begin(2).await;

        assert_eq!(reg.evict_idle(Duration::from_secs(60)).await, 1);
        assert!(!reg.has_session(1).await);
        assert!(reg.has_session(2).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_keep_session_alive() {
        let (reg, _) = registry().await;
        reg.begin(1).await;
        tokio::time::advance(Duration::from_secs(50)).await;
        reg.apply(1, set_title("still here")).await.unwrap();
        tokio::time::advance(Duration::from_secs(50)).await;

        assert_eq!(reg.evict_idle(Duration::from_secs(60)).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_evicts_and_stops() {
        let (reg, _) = registry().await;
        let reg = Arc::new(reg);
        reg.begin(1).await;

        let cancel = tokio_util::sync::CancellationToken::new();
        let handle = reg.start_cleanup(Duration::from_secs(30), cancel.clone());

        tokio::time::sleep(Duration::from_secs(70)).await;
        assert!(!reg.has_session(1).await);

        cancel.cancel();
        handle.await.unwrap();
    }
}
