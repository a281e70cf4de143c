//! Crawl integration tests against a synthetic local site.

use axum::response::Html;
use axum::routing::get;
use axum::Router;
use crawldex::config::Config;
use crawldex::server::Daemon;
use tempfile::TempDir;

/// Serve a router on an ephemeral port, returning its base URL.
async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn test_config(tmp: &TempDir, depth: usize) -> Config {
    let mut config = Config::default();
    config.data_dir = tmp.path().join("corpus");
    config.cache.l2_dir = tmp.path().join("l2");
    config.search_depth = depth;
    config
}

#[tokio::test]
async fn cyclic_link_graph_terminates_and_visits_each_page_once() {
    let app = Router::new()
        .route(
            "/a",
            get(|| async { Html(r#"<p>alpha page</p><a href="/b">to b</a>"#) }),
        )
        .route(
            "/b",
            get(|| async { Html(r#"<p>beta page</p><a href="/a">back to a</a>"#) }),
        );
    let base = serve(app).await;

    let tmp = TempDir::new().unwrap();
    let daemon = Daemon::new(test_config(&tmp, 3)).unwrap();
    let index = daemon.index();

    daemon.crawl_once(&format!("{base}/a")).await.unwrap();

    // The cycle a -> b -> a is cut by the visited set: one stored file
    // and one indexed document per page.
    let stored = std::fs::read_dir(tmp.path().join("corpus")).unwrap().count();
    assert_eq!(stored, 2);
    assert!(index.document_count() <= 2);

    let results = index.search("beta", 10);
    assert_eq!(results.len(), 1);
    assert!(results[0].url.ends_with("/b"));
}

#[tokio::test]
async fn depth_bound_cuts_the_frontier() {
    // A chain a -> b -> c; depth 2 fetches the seed and its links only.
    let app = Router::new()
        .route("/a", get(|| async { Html(r#"<a href="/b">next</a>"#) }))
        .route("/b", get(|| async { Html(r#"<a href="/c">next</a>"#) }))
        .route("/c", get(|| async { Html("<p>too deep</p>") }));
    let base = serve(app).await;

    let tmp = TempDir::new().unwrap();
    let daemon = Daemon::new(test_config(&tmp, 2)).unwrap();

    daemon.crawl_once(&format!("{base}/a")).await.unwrap();

    let stored = std::fs::read_dir(tmp.path().join("corpus")).unwrap().count();
    assert_eq!(stored, 2, "page c lies beyond the depth bound");
}

#[tokio::test]
async fn failed_fetches_do_not_abort_the_crawl() {
    let app = Router::new().route(
        "/a",
        get(|| async {
            Html(r#"<p>landing</p><a href="/missing">dead link</a><a href="/b">live</a>"#)
        }),
    )
    .route("/b", get(|| async { Html("<p>still reachable</p>") }));
    let base = serve(app).await;

    let tmp = TempDir::new().unwrap();
    let daemon = Daemon::new(test_config(&tmp, 3)).unwrap();
    let index = daemon.index();

    daemon.crawl_once(&format!("{base}/a")).await.unwrap();

    // The 404 is isolated; both live pages made it into the corpus.
    let stored = std::fs::read_dir(tmp.path().join("corpus")).unwrap().count();
    assert_eq!(stored, 2);
    assert!(!index.search("reachable", 10).is_empty());
}

#[tokio::test]
async fn crawled_pages_record_their_source_urls() {
    let app = Router::new().route(
        "/page",
        get(|| async { Html("<p>solitary page about lighthouses</p>") }),
    );
    let base = serve(app).await;

    let tmp = TempDir::new().unwrap();
    let daemon = Daemon::new(test_config(&tmp, 1)).unwrap();
    let index = daemon.index();

    let seed = format!("{base}/page");
    daemon.crawl_once(&seed).await.unwrap();

    let results = index.search("lighthouses", 10);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].url, seed);
    assert_eq!(results[0].doc_id, crawldex::doc_id_for_url(&seed));
}
