use tokio_test::assert_ok;

use super::*;

fn test_record(track: usize, seq: u16) -> SampledRecord {
    SampledRecord {
        track,
        ntp: 0xE2C4_D0F1_8000_0000,
        timestamp: 123456,
        sequence_number: seq,
        payload_type: 96,
        payload_length: 188,
    }
}

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("rtp-sampler-{}-{}", std::process::id(), name))
}

#[tokio::test]
async fn test_memory_store_insert_and_close() -> Result<()> {
    let store = MemoryStore::new();
    assert_ok!(store.ping().await);
    assert!(store.is_empty().await);

    store.insert(&test_record(0, 1)).await?;
    store.insert(&test_record(1, 2)).await?;
    assert_eq!(store.records().await, vec![test_record(0, 1), test_record(1, 2)]);

    store.close().await?;
    assert!(matches!(store.ping().await, Err(Error::ErrStoreClosed)));
    assert!(matches!(
        store.insert(&test_record(0, 3)).await,
        Err(Error::ErrStoreClosed)
    ));
    assert_eq!(store.len().await, 2);

    Ok(())
}

#[tokio::test]
async fn test_sqlite_store_round_trips_full_width_ntp() -> Result<()> {
    let store = SqliteStore::open(sqlite::MEMORY_PATH).await?;
    store.ping().await?;

    let mut high = test_record(3, 42);
    high.ntp = u64::MAX;
    store.insert(&test_record(0, 1)).await?;
    store.insert(&high).await?;

    assert_eq!(store.records().await?, vec![test_record(0, 1), high]);

    store.close().await?;
    assert!(matches!(
        store.insert(&test_record(0, 2)).await,
        Err(Error::ErrStoreClosed)
    ));

    Ok(())
}

#[tokio::test]
async fn test_sqlite_store_persists_across_reopen() -> Result<()> {
    let path = temp_path("reopen.db");
    let _ = std::fs::remove_file(&path);
    let path_str = path.to_string_lossy().to_string();

    {
        let store = SqliteStore::open(&path_str).await?;
        store.insert(&test_record(2, 7)).await?;
        store.close().await?;
    }

    let store = SqliteStore::open(&path_str).await?;
    assert_eq!(store.records().await?, vec![test_record(2, 7)]);
    store.close().await?;

    let _ = std::fs::remove_file(&path);
    Ok(())
}

#[tokio::test]
async fn test_json_lines_store_layout() -> Result<()> {
    let path = temp_path("records.jsonl");
    let _ = std::fs::remove_file(&path);

    let store = JsonLinesStore::open(&path).await?;
    store.ping().await?;
    store.insert(&test_record(3, 42)).await?;
    store.insert(&test_record(4, 43)).await?;

    let raw = tokio::fs::read_to_string(&path).await?;
    let first: serde_json::Value = serde_json::from_str(raw.lines().next().unwrap())?;
    assert_eq!(first["track"], 3);
    assert_eq!(first["NTP"], 0xE2C4_D0F1_8000_0000u64);
    assert_eq!(first["timestamp"], 123456);
    assert_eq!(first["sequence_number"], 42);
    assert_eq!(first["payload_type"], 96);
    assert_eq!(first["payload_length"], 188);

    assert_eq!(
        store.records().await?,
        vec![test_record(3, 42), test_record(4, 43)]
    );

    store.close().await?;
    assert!(matches!(store.ping().await, Err(Error::ErrStoreClosed)));

    let _ = std::fs::remove_file(&path);
    Ok(())
}

#[tokio::test]
async fn test_open_by_url() -> Result<()> {
    let store = open("memory://").await?;
    store.insert(&test_record(0, 1)).await?;
    store.close().await?;

    let store = open("sqlite://:memory:").await?;
    store.ping().await?;
    store.close().await?;

    let tests = vec![
        ("mongodb://localhost:27017", "unsupported"),
        ("packets.db", "invalid"),
        ("sqlite://", "invalid"),
        ("file://", "invalid"),
    ];
    for (url, kind) in tests {
        match (open(url).await, kind) {
            (Err(Error::ErrUnsupportedScheme(_)), "unsupported") => {}
            (Err(Error::ErrInvalidUrl(_)), "invalid") => {}
            (Err(err), _) => panic!("{url}: unexpected error {err}"),
            (Ok(_), _) => panic!("{url}: expected error"),
        }
    }

    Ok(())
}
