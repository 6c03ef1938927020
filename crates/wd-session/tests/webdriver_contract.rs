//! Contract tests for `WebDriverSession` against a real chromedriver. Ignored
//! by default because they need Chrome/Chromium on the host machine.

use std::env;
use std::fs;

use static_origin::StaticOrigin;
use tempfile::tempdir;
use wd_session::{BrowserSession, DriverConfig, ElementQuery, WebDriverSession};

fn contract_enabled() -> bool {
    env::var("RENDER_SNAPSHOT_WEBDRIVER_CONTRACT")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

#[tokio::test]
#[ignore = "requires chromedriver; set RENDER_SNAPSHOT_WEBDRIVER_CONTRACT=1"]
async fn contract_query_and_inner_html() {
    if !contract_enabled() {
        eprintln!("skipping webdriver contract test (RENDER_SNAPSHOT_WEBDRIVER_CONTRACT not enabled)");
        return;
    }

    let site = tempdir().unwrap();
    fs::write(
        site.path().join("index.html"),
        "<html><head></head><body><p class=\"present\">hi</p></body></html>",
    )
    .unwrap();
    let origin = StaticOrigin::on_port(site.path(), 0)
        .spawn()
        .await
        .expect("origin starts");

    let session = WebDriverSession::connect(&DriverConfig::default())
        .await
        .expect("session starts");
    let url = origin.base_url().join("index.html").unwrap();
    session.navigate(url.as_str()).await.expect("navigate");

    let present = session
        .query(&ElementQuery::css(".present"))
        .await
        .expect("query present");
    assert!(present.is_some());

    let absent = session
        .query(&ElementQuery::css("#never-there"))
        .await
        .expect("query absent");
    assert!(absent.is_none());

    let root = session
        .query(&ElementQuery::tag("html"))
        .await
        .expect("query root")
        .expect("root element");
    let markup = session
        .property(root, "innerHTML")
        .await
        .expect("innerHTML")
        .expect("markup");
    assert!(markup.contains("<p class=\"present\">hi</p>"), "{markup}");
    assert!(!markup.starts_with("<html"));

    session.close().await.expect("close");
    assert!(session.navigate(url.as_str()).await.is_err());
    assert!(session.metrics().commands >= 4);
    origin.abort();
}
