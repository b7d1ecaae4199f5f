//! Client Tests
//!
//! ## Test Scopes
//! - **Chunker**: id format, ordering, empty input, missing chunks.
//! - **Upload / download**: byte-identical round trip through balancer,
//!   cluster manager and storage nodes; all-or-nothing metadata.
//! - **Delete**: idempotence, partial failure followed by a successful retry,
//!   already-absent chunks, downgraded cleanup failures.
//! - **Search**: results limited to files that still have metadata.

#[cfg(test)]
mod tests {
    use crate::balancer::{self, service::GlobalBalancer};
    use crate::client::chunker::{ChunkSource, Chunker, FixedSizeChunker, chunk_id};
    use crate::client::client::DfsClient;
    use crate::client::delete::DeleteOutcome;
    use crate::cluster::{self, manager::ClusterManager};
    use crate::config::{BalancerConfig, ClientConfig, ClusterConfig};
    use crate::error::{ClientError, IndexError};
    use crate::metadata::types::FileMetadata;
    use crate::node::store::ChunkStore;
    use crate::search::index::{DocumentIndex, TermIndex};
    use crate::test_support::{dead_address, spawn_node, spawn_router};

    use axum::Router;
    use axum::extract::{Extension, Path};
    use axum::http::StatusCode;
    use axum::routing::delete;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    struct Stack {
        balancer_url: String,
        stores: Vec<Arc<ChunkStore>>,
        _dirs: Vec<TempDir>,
    }

    /// Storage nodes behind one cluster manager behind a global balancer.
    async fn spawn_stack(node_count: usize) -> Stack {
        let mut dirs = Vec::new();
        let mut stores = Vec::new();
        let mut node_urls = Vec::new();
        for _ in 0..node_count {
            let dir = TempDir::new().unwrap();
            let (url, store, _handle) = spawn_node(dir.path(), 100).await;
            dirs.push(dir);
            stores.push(store);
            node_urls.push(url);
        }

        let manager = ClusterManager::new(ClusterConfig::new(node_urls));
        manager.refresh().await;
        let (cluster_url, _handle) = spawn_router(cluster::router(manager)).await;

        let mut clusters = BTreeMap::new();
        clusters.insert("cluster_1".to_string(), cluster_url);
        let global = GlobalBalancer::new(BalancerConfig::new(clusters));
        global.refresh().await;
        let (balancer_url, _handle) = spawn_router(balancer::router(global)).await;

        Stack {
            balancer_url,
            stores,
            _dirs: dirs,
        }
    }

    fn client_config(balancer_url: &str, workspace: &TempDir) -> ClientConfig {
        let mut config = ClientConfig::new(balancer_url, workspace.path());
        config.chunk_size = 4;
        config
    }

    fn open_client(balancer_url: &str, workspace: &TempDir) -> DfsClient {
        DfsClient::open(client_config(balancer_url, workspace)).unwrap()
    }

    fn stored_chunks(stores: &[Arc<ChunkStore>]) -> u64 {
        stores.iter().map(|s| s.status().chunk_count).sum()
    }

    /// Storage node whose delete endpoint fails while `failing` is set.
    #[derive(Clone)]
    struct FlakyNode {
        store: Arc<ChunkStore>,
        failing: Arc<AtomicBool>,
    }

    async fn flaky_delete(
        Extension(node): Extension<FlakyNode>,
        Path(chunk_id): Path<String>,
    ) -> StatusCode {
        if node.failing.load(Ordering::SeqCst) {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        match node.store.delete(&chunk_id).await {
            Ok(_) => StatusCode::OK,
            Err(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Index whose writes always fail.
    struct BrokenIndex;

    impl DocumentIndex for BrokenIndex {
        fn add(&self, _filename: &str, _text: &str) -> Result<(), IndexError> {
            Err(IndexError::Io(std::io::Error::other("disk full")))
        }

        fn remove(&self, _filename: &str) -> Result<bool, IndexError> {
            Err(IndexError::Io(std::io::Error::other("disk full")))
        }

        fn search(&self, _query: &str, _limit: usize) -> Vec<(String, usize)> {
            Vec::new()
        }
    }

    // ============================================================
    // CHUNKER TESTS
    // ============================================================

    #[test]
    fn test_chunk_ids_are_indexed_and_content_addressed() {
        let id = chunk_id("a.txt", 3, b"abc");

        assert!(id.starts_with("00000003-"));
        assert_eq!(id.len(), 9 + 16);
        // sha256("a.txt\0abc") = a79df2cab4c7a35b...
        assert_eq!(id, "00000003-a79df2cab4c7a35b");
        assert_ne!(chunk_id("a.txt", 3, b"abd"), id);
    }

    #[test]
    fn test_same_bytes_in_different_files_get_different_ids() {
        let chunker = FixedSizeChunker::new(4);

        let a = chunker.split("a.txt", b"identical bytes");
        let b = chunker.split("b.txt", b"identical bytes");

        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.data, y.data);
            assert_ne!(x.id, y.id);
            assert_eq!(x.id[..9], y.id[..9]);
        }
        assert_eq!(chunk_id("b.txt", 0, b"abc"), "00000000-4a66fb6cc7d1de4d");
    }

    #[test]
    fn test_split_order_matches_lexical_id_order() {
        let chunker = FixedSizeChunker::new(1);
        let data: Vec<u8> = (0..12).collect();

        let chunks = chunker.split("digits.bin", &data);
        let mut sorted: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
        sorted.sort();

        assert_eq!(chunks.len(), 12);
        assert_eq!(sorted, chunks.iter().map(|c| c.id.clone()).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_file_yields_one_empty_chunk() {
        let chunks = FixedSizeChunker::default().split("empty.txt", b"");

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].data.is_empty());
        assert!(chunks[0].id.starts_with("00000000-"));
    }

    #[test]
    fn test_reconstruct_follows_given_order_and_reports_gaps() {
        let chunker = FixedSizeChunker::new(4);
        let chunks = chunker.split("hello.txt", b"hello world!");
        let ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
        let source: HashMap<String, Vec<u8>> =
            chunks.into_iter().map(|c| (c.id, c.data)).collect();

        assert_eq!(chunker.reconstruct(&ids, &source).unwrap(), b"hello world!");
        assert_eq!(source.chunk(&ids[1]), Some(&b"o wo"[..]));

        let mut with_gap = ids.clone();
        with_gap.push("00000099-missing".to_string());
        assert!(matches!(
            chunker.reconstruct(&with_gap, &source),
            Err(ClientError::MissingChunk(id)) if id == "00000099-missing"
        ));
    }

    // ============================================================
    // UPLOAD / DOWNLOAD TESTS
    // ============================================================

    #[tokio::test]
    async fn test_round_trip_is_byte_identical() {
        let stack = spawn_stack(3).await;
        let workspace = TempDir::new().unwrap();
        let client = open_client(&stack.balancer_url, &workspace);
        let content = b"chunks scattered over three storage nodes".to_vec();

        let report = client.upload("notes.txt", content.clone()).await.unwrap();

        assert_eq!(report.metadata.len(), content.len().div_ceil(4));
        assert!(report.index_warning.is_none());
        assert_eq!(stored_chunks(&stack.stores), report.metadata.len() as u64);
        assert_eq!(client.list().await.unwrap(), vec!["notes.txt"]);

        let path = client.download("notes.txt").await.unwrap();

        assert_eq!(path, workspace.path().join("downloaded_files/notes.txt"));
        assert_eq!(std::fs::read(&path).unwrap(), content);
        for chunk_id in report.metadata.chunk_ids() {
            assert!(workspace.path().join("chunks").join(&chunk_id).is_file());
        }
    }

    #[tokio::test]
    async fn test_upload_of_existing_file_is_refused() {
        let stack = spawn_stack(1).await;
        let workspace = TempDir::new().unwrap();
        let client = open_client(&stack.balancer_url, &workspace);

        client.upload("a.txt", b"first".to_vec()).await.unwrap();
        let chunks_before = stored_chunks(&stack.stores);

        assert!(matches!(
            client.upload("a.txt", b"second".to_vec()).await,
            Err(ClientError::AlreadyExists(name)) if name == "a.txt"
        ));
        assert_eq!(stored_chunks(&stack.stores), chunks_before);
    }

    #[tokio::test]
    async fn test_concurrent_uploads_of_one_name_have_one_winner() {
        let stack = spawn_stack(2).await;
        let workspace = TempDir::new().unwrap();
        let client = open_client(&stack.balancer_url, &workspace);
        let first = b"first writer content".to_vec();
        let second = b"second writer, other bytes".to_vec();

        let (a, b) = tokio::join!(
            client.upload("race.txt", first.clone()),
            client.upload("race.txt", second.clone())
        );

        let (report, expected) = match (a, b) {
            (Ok(report), Err(ClientError::AlreadyExists(_))) => (report, first),
            (Err(ClientError::AlreadyExists(_)), Ok(report)) => (report, second),
            other => panic!("expected exactly one winner, got {:?}", other),
        };
        assert_eq!(stored_chunks(&stack.stores), report.metadata.len() as u64);
        assert_eq!(client.metadata().load("race.txt").await.unwrap(), Some(report.metadata));

        let path = client.download("race.txt").await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), expected);
    }

    #[tokio::test]
    async fn test_failed_upload_writes_no_metadata() {
        let global = GlobalBalancer::new(BalancerConfig::new(BTreeMap::new()));
        let (balancer_url, _server) = spawn_router(balancer::router(global)).await;
        let workspace = TempDir::new().unwrap();
        let client = open_client(&balancer_url, &workspace);

        let result = client.upload("lost.txt", b"twelve bytes".to_vec()).await;

        match result {
            Err(ClientError::UploadFailed { filename, failed }) => {
                assert_eq!(filename, "lost.txt");
                assert_eq!(failed.len(), 3);
                assert!(failed.windows(2).all(|w| w[0] < w[1]));
            }
            other => panic!("expected UploadFailed, got {:?}", other),
        }
        assert!(!client.metadata().exists("lost.txt").await.unwrap());
        assert!(client.search("twelve", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_download_of_unknown_file_is_not_found() {
        let workspace = TempDir::new().unwrap();
        let client = open_client("http://127.0.0.1:1", &workspace);

        assert!(matches!(
            client.download("ghost.txt").await,
            Err(ClientError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_download_aborts_on_unreachable_node() {
        let workspace = TempDir::new().unwrap();
        let client = open_client("http://127.0.0.1:1", &workspace);
        let dead = dead_address().await;
        let mut metadata = FileMetadata::new();
        metadata.insert("00000000-aaaa", dead.clone());
        client.metadata().save("gone.txt", &metadata).await.unwrap();

        match client.download("gone.txt").await {
            Err(ClientError::DownloadFailed { chunk_id, .. }) => assert_eq!(chunk_id, "00000000-aaaa"),
            other => panic!("expected DownloadFailed, got {:?}", other),
        }
        assert!(!workspace.path().join("downloaded_files/gone.txt").exists());
    }

    // ============================================================
    // DELETE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_delete_removes_everything_then_reports_not_found() {
        let stack = spawn_stack(2).await;
        let workspace = TempDir::new().unwrap();
        let client = open_client(&stack.balancer_url, &workspace);
        let report = client.upload("doc.txt", b"delete me entirely".to_vec()).await.unwrap();
        client.download("doc.txt").await.unwrap();

        assert_eq!(client.delete("doc.txt").await.unwrap(), DeleteOutcome::Deleted);

        assert_eq!(stored_chunks(&stack.stores), 0);
        assert!(!client.metadata().exists("doc.txt").await.unwrap());
        assert!(!workspace.path().join("downloaded_files/doc.txt").exists());
        for chunk_id in report.metadata.chunk_ids() {
            assert!(!workspace.path().join("chunks").join(&chunk_id).exists());
        }
        assert!(client.search("delete", 10).await.unwrap().is_empty());

        for _ in 0..2 {
            assert!(matches!(
                client.delete("doc.txt").await,
                Err(ClientError::NotFound(name)) if name == "doc.txt"
            ));
        }
    }

    #[tokio::test]
    async fn test_deleting_one_copy_keeps_identical_file_readable() {
        let stack = spawn_stack(1).await;
        let workspace = TempDir::new().unwrap();
        let client = open_client(&stack.balancer_url, &workspace);
        let content = b"same bytes in two files".to_vec();

        let a = client.upload("a.txt", content.clone()).await.unwrap();
        let b = client.upload("b.txt", content.clone()).await.unwrap();
        for id in a.metadata.chunk_ids() {
            assert!(b.metadata.node_for(&id).is_none());
        }
        assert_eq!(stored_chunks(&stack.stores), (a.metadata.len() + b.metadata.len()) as u64);
        client.download("b.txt").await.unwrap();

        assert_eq!(client.delete("a.txt").await.unwrap(), DeleteOutcome::Deleted);

        assert_eq!(client.list().await.unwrap(), vec!["b.txt"]);
        assert_eq!(stored_chunks(&stack.stores), b.metadata.len() as u64);
        for id in b.metadata.chunk_ids() {
            assert!(workspace.path().join("chunks").join(&id).is_file());
        }
        let path = client.download("b.txt").await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), content);
    }

    #[tokio::test]
    async fn test_delete_when_chunks_already_absent() {
        let dir = TempDir::new().unwrap();
        let (node_url, _store, _server) = spawn_node(dir.path(), 100).await;
        let workspace = TempDir::new().unwrap();
        let client = open_client("http://127.0.0.1:1", &workspace);
        let mut metadata = FileMetadata::new();
        metadata.insert("00000000-aaaa", node_url.clone());
        metadata.insert("00000001-bbbb", node_url);
        client.metadata().save("stale.txt", &metadata).await.unwrap();

        assert_eq!(client.delete("stale.txt").await.unwrap(), DeleteOutcome::Deleted);
        assert!(!client.metadata().exists("stale.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_partial_delete_then_retry_succeeds() {
        let dir_a = TempDir::new().unwrap();
        let dir_b = TempDir::new().unwrap();
        let (url_a, store_a, _sa) = spawn_node(dir_a.path(), 100).await;
        let store_b = Arc::new(ChunkStore::open(dir_b.path(), 100).await.unwrap());
        let failing = Arc::new(AtomicBool::new(true));
        let flaky = Router::new()
            .route("/chunk/:chunk_id", delete(flaky_delete))
            .layer(Extension(FlakyNode {
                store: store_b.clone(),
                failing: failing.clone(),
            }));
        let (url_b, _sb) = spawn_router(flaky).await;

        store_a.store("00000000-aaaa", b"left").await.unwrap();
        store_b.store("00000001-bbbb", b"right").await.unwrap();
        let workspace = TempDir::new().unwrap();
        let client = open_client("http://127.0.0.1:1", &workspace);
        let mut metadata = FileMetadata::new();
        metadata.insert("00000000-aaaa", url_a);
        metadata.insert("00000001-bbbb", url_b);
        client.metadata().save("split.txt", &metadata).await.unwrap();

        match client.delete("split.txt").await {
            Err(ClientError::PartialDelete { filename, failed }) => {
                assert_eq!(filename, "split.txt");
                assert_eq!(failed, vec!["00000001-bbbb"]);
            }
            other => panic!("expected PartialDelete, got {:?}", other),
        }
        assert!(client.metadata().exists("split.txt").await.unwrap());
        assert!(!store_a.contains("00000000-aaaa"));
        assert!(store_b.contains("00000001-bbbb"));

        failing.store(false, Ordering::SeqCst);

        assert_eq!(client.delete("split.txt").await.unwrap(), DeleteOutcome::Deleted);
        assert!(!client.metadata().exists("split.txt").await.unwrap());
        assert!(!store_b.contains("00000001-bbbb"));
    }

    #[tokio::test]
    async fn test_index_failures_are_warnings_only() {
        let stack = spawn_stack(1).await;
        let workspace = TempDir::new().unwrap();
        let client = DfsClient::with_parts(
            client_config(&stack.balancer_url, &workspace),
            Arc::new(FixedSizeChunker::new(4)),
            Arc::new(BrokenIndex),
        );

        let report = client.upload("w.txt", b"warned".to_vec()).await.unwrap();
        assert!(report.index_warning.is_some());

        match client.delete("w.txt").await.unwrap() {
            DeleteOutcome::DeletedWithWarning(warning) => {
                assert!(warning.contains("Index cleanup failed"));
            }
            other => panic!("expected a warning, got {:?}", other),
        }
        assert!(!client.metadata().exists("w.txt").await.unwrap());
        assert_eq!(stored_chunks(&stack.stores), 0);
    }

    // ============================================================
    // SEARCH TESTS
    // ============================================================

    #[tokio::test]
    async fn test_search_skips_files_without_metadata() {
        let workspace = TempDir::new().unwrap();
        let config = client_config("http://127.0.0.1:1", &workspace);
        let index = Arc::new(TermIndex::open(&config.index_dir()).unwrap());
        index.add("kept.txt", "heartbeat protocol").unwrap();
        index.add("orphan.txt", "heartbeat protocol notes").unwrap();
        let client = DfsClient::with_parts(config, Arc::new(FixedSizeChunker::new(4)), index);

        let mut metadata = FileMetadata::new();
        metadata.insert("00000000-aaaa", "http://node");
        client.metadata().save("kept.txt", &metadata).await.unwrap();

        let results = client.search("heartbeat protocol", 10).await.unwrap();

        assert_eq!(results, vec![("kept.txt".to_string(), 2)]);
        assert!(client.search("heartbeat", 0).await.unwrap().is_empty());
    }
}
