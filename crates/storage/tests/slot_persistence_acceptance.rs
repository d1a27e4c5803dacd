use storage::{SheetRow, Storage};

#[tokio::test]
async fn slots_and_rows_survive_reopen() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("waitlist.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    {
        let storage = Storage::new(&database_url).await.expect("db");
        storage
            .write_slot("credupi_waitlist", r#"[{"intent":"x"}]"#)
            .await
            .expect("write slot");
        storage
            .append_sheet_row(&SheetRow {
                timestamp: "2025-01-01T00:00:00.000Z".to_string(),
                intent: "x".to_string(),
                user_type: String::new(),
                phone: String::new(),
            })
            .await
            .expect("append row");
        storage.pool().close().await;
    }

    let reopened = Storage::new(&database_url).await.expect("reopen");
    assert_eq!(
        reopened
            .read_slot("credupi_waitlist")
            .await
            .expect("read")
            .as_deref(),
        Some(r#"[{"intent":"x"}]"#)
    );
    assert_eq!(reopened.list_sheet_rows().await.expect("rows").len(), 1);
}
