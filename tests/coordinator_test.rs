mod common;

use assert2::{check, let_assert};
use common::MockPlugin;
use frc_docs_mcp::{
    PluginRegistry, QueryRequest, RequestError, SearchCoordinator, SearchError, VendorFilter,
};
use std::sync::Arc;
use std::time::Duration;

const DEADLINE: Duration = Duration::from_secs(2);

fn coordinator(registry: &Arc<PluginRegistry>) -> SearchCoordinator {
    SearchCoordinator::new(Arc::clone(registry), DEADLINE)
}

/// Test: hits from several plugins are merged by descending score and truncated.
#[tokio::test]
async fn test_merges_rankings_across_plugins() {
    let registry = Arc::new(PluginRegistry::new());
    MockPlugin::new("alpha")
        .with_hit("a1", 9.0)
        .with_hit("a2", 4.0)
        .with_hit("a3", 1.0)
        .register(&registry)
        .await;
    MockPlugin::new("beta")
        .with_hit("b1", 7.0)
        .with_hit("b2", 3.0)
        .register(&registry)
        .await;

    let outcome = coordinator(&registry)
        .coordinate(&QueryRequest::new("anything", 4))
        .await
        .unwrap();

    let scores: Vec<f64> = outcome.results.iter().map(|r| r.score).collect();
    check!(scores == vec![9.0, 7.0, 4.0, 3.0]);
    check!(outcome.failures.is_empty());
}

/// Test: equal scores keep plugin (name) order.
#[tokio::test]
async fn test_ties_follow_plugin_order() {
    let registry = Arc::new(PluginRegistry::new());
    MockPlugin::new("zulu").with_hit("z", 2.0).register(&registry).await;
    MockPlugin::new("alpha").with_hit("a", 2.0).register(&registry).await;

    let outcome = coordinator(&registry)
        .coordinate(&QueryRequest::new("anything", 10))
        .await
        .unwrap();

    let vendors: Vec<&str> = outcome.results.iter().map(|r| r.vendor.as_str()).collect();
    check!(vendors == vec!["ALPHA", "ZULU"]);
}

/// Test: the same page reported by two plugins appears once, at its best score.
#[tokio::test]
async fn test_duplicate_urls_are_collapsed() {
    let registry = Arc::new(PluginRegistry::new());
    MockPlugin::new("alpha")
        .with_url_hit("https://shared.example.com/page/", 1.5)
        .register(&registry)
        .await;
    MockPlugin::new("beta")
        .with_url_hit("https://SHARED.example.com/page#intro", 3.0)
        .register(&registry)
        .await;

    let outcome = coordinator(&registry)
        .coordinate(&QueryRequest::new("anything", 10))
        .await
        .unwrap();

    let_assert!([only] = outcome.results.as_slice());
    check!(only.vendor == "BETA");
    check!(only.score == 3.0);
}

/// Test: a failing plugin is reported while the others still answer.
#[tokio::test]
async fn test_partial_failure_keeps_other_results() {
    let registry = Arc::new(PluginRegistry::new());
    MockPlugin::new("good").with_hit("g", 1.0).register(&registry).await;
    MockPlugin::new("bad").failing().register(&registry).await;

    let outcome = coordinator(&registry)
        .coordinate(&QueryRequest::new("anything", 10))
        .await
        .unwrap();

    check!(outcome.results.len() == 1);
    let_assert!([failure] = outcome.failures.as_slice());
    check!(failure.plugin == "bad");
    check!(failure.reason.contains("not initialized"));
}

/// Test: a panicking plugin is contained and reported as a failure.
#[tokio::test]
async fn test_panicking_plugin_is_contained() {
    let registry = Arc::new(PluginRegistry::new());
    MockPlugin::new("good").with_hit("g", 1.0).register(&registry).await;
    MockPlugin::new("broken").panicking().register(&registry).await;

    let outcome = coordinator(&registry)
        .coordinate(&QueryRequest::new("anything", 10))
        .await
        .unwrap();

    check!(outcome.results.len() == 1);
    let_assert!([failure] = outcome.failures.as_slice());
    check!(failure.plugin == "broken");
    check!(failure.reason == "search panicked");
}

/// Test: a plugin that misses the deadline is abandoned; the rest are returned on time.
#[tokio::test(start_paused = true)]
async fn test_slow_plugin_is_abandoned_at_deadline() {
    let registry = Arc::new(PluginRegistry::new());
    MockPlugin::new("fast").with_hit("f", 1.0).register(&registry).await;
    let slow = MockPlugin::new("slow")
        .with_hit("s", 99.0)
        .with_delay(Duration::from_secs(60))
        .register(&registry)
        .await;

    let started = tokio::time::Instant::now();
    let outcome = coordinator(&registry)
        .coordinate(&QueryRequest::new("anything", 10))
        .await
        .unwrap();

    check!(started.elapsed() >= DEADLINE);
    check!(started.elapsed() < Duration::from_secs(60));
    check!(slow.searches() == 1);

    let_assert!([result] = outcome.results.as_slice());
    check!(result.vendor == "FAST");
    let_assert!([failure] = outcome.failures.as_slice());
    check!(failure.plugin == "slow");
    check!(failure.reason.contains("timed out"));
}

/// Test: when every plugin fails the search reports each of them.
#[tokio::test(start_paused = true)]
async fn test_all_plugins_failing_is_an_error() {
    let registry = Arc::new(PluginRegistry::new());
    MockPlugin::new("bad").failing().register(&registry).await;
    MockPlugin::new("slow")
        .with_delay(Duration::from_secs(60))
        .register(&registry)
        .await;

    let result = coordinator(&registry)
        .coordinate(&QueryRequest::new("anything", 10))
        .await;

    let_assert!(Err(SearchError::AllPluginsFailed(failures)) = result);
    let plugins: Vec<&str> = failures.iter().map(|f| f.plugin.as_str()).collect();
    check!(plugins == vec!["bad", "slow"]);
}

/// Test: plugins that matched nothing are not failures.
#[tokio::test]
async fn test_empty_results_are_not_an_error() {
    let registry = Arc::new(PluginRegistry::new());
    MockPlugin::new("alpha").register(&registry).await;

    let outcome = coordinator(&registry)
        .coordinate(&QueryRequest::new("anything", 10))
        .await
        .unwrap();

    check!(outcome.results.is_empty());
    check!(outcome.failures.is_empty());
}

/// Test: malformed requests are rejected before any plugin runs.
#[tokio::test]
async fn test_invalid_requests_never_reach_plugins() {
    let registry = Arc::new(PluginRegistry::new());
    let plugin = MockPlugin::new("alpha").with_hit("a", 1.0).register(&registry).await;
    let coordinator = coordinator(&registry);

    for request in [
        QueryRequest::new("   ", 5),
        QueryRequest::new("pid", 0),
        QueryRequest::new("pid", 26),
    ] {
        let_assert!(
            Err(SearchError::Request(RequestError::InvalidRequest(_))) =
                coordinator.coordinate(&request).await
        );
    }
    check!(plugin.searches() == 0);
}

/// Test: only unknown vendors fails with suggestions; a mix ignores the unknown ones.
#[tokio::test]
async fn test_unknown_vendor_names() {
    let registry = Arc::new(PluginRegistry::new());
    MockPlugin::new("rev").with_hit("r", 1.0).register(&registry).await;
    MockPlugin::new("ctre").with_hit("c", 1.0).register(&registry).await;
    let coordinator = coordinator(&registry);

    let request =
        QueryRequest::new("motor", 5).with_vendors(VendorFilter::from_names(["revv"]));
    let_assert!(
        Err(SearchError::Request(RequestError::UnknownVendors {
            requested,
            suggestions
        })) = coordinator.coordinate(&request).await
    );
    check!(requested == vec!["revv".to_string()]);
    check!(suggestions.first().map(String::as_str) == Some("rev"));

    let request = QueryRequest::new("motor", 5)
        .with_vendors(VendorFilter::from_names(["revv", "ctre"]));
    let outcome = coordinator.coordinate(&request).await.unwrap();
    check!(outcome.results.len() == 1);
    check!(outcome.results[0].vendor == "CTRE");
}

/// Test: with nothing enabled the search fails instead of returning nothing.
#[tokio::test]
async fn test_no_enabled_plugins() {
    let registry = Arc::new(PluginRegistry::new());
    MockPlugin::new("rev")
        .failing_init("index missing")
        .register(&registry)
        .await;
    let coordinator = coordinator(&registry);

    let_assert!(
        Err(SearchError::NoPlugins) =
            coordinator.coordinate(&QueryRequest::new("motor", 5)).await
    );

    let request = QueryRequest::new("motor", 5).with_vendors(VendorFilter::from_names(["rev"]));
    let_assert!(Err(SearchError::NoPlugins) = coordinator.coordinate(&request).await);
}

/// Test: page fetches are routed by URL prefix.
#[tokio::test]
async fn test_fetch_page_routes_by_url() {
    let registry = Arc::new(PluginRegistry::new());
    MockPlugin::new("alpha").register(&registry).await;
    MockPlugin::new("beta").register(&registry).await;
    let coordinator = coordinator(&registry);

    let page = coordinator
        .fetch_page("https://beta.example.com/guide")
        .await
        .unwrap();
    check!(page.vendor == "BETA");

    let_assert!(
        Err(frc_docs_mcp::FetchError::UnsupportedUrl { .. }) =
            coordinator.fetch_page("https://gamma.example.com/guide").await
    );
    let_assert!(
        Err(frc_docs_mcp::FetchError::UnsupportedUrl { .. }) = coordinator.fetch_page("  ").await
    );
}

/// Test: a URL owned only by a disabled plugin is unavailable, not unsupported.
#[tokio::test]
async fn test_fetch_page_disabled_owner_is_unavailable() {
    let registry = Arc::new(PluginRegistry::new());
    MockPlugin::new("alpha").register(&registry).await;
    MockPlugin::new("beta")
        .failing_init("index missing")
        .register(&registry)
        .await;
    let coordinator = coordinator(&registry);

    let_assert!(
        Err(frc_docs_mcp::FetchError::Unavailable { plugin }) =
            coordinator.fetch_page("https://beta.example.com/guide").await
    );
    check!(plugin == "beta");
    check!(coordinator.fetch_page("https://alpha.example.com/guide").await.is_ok());
}

/// Test: listing sections skips a failing vendor but keeps the rest.
#[tokio::test]
async fn test_list_sections_skips_failures() {
    let registry = Arc::new(PluginRegistry::new());
    MockPlugin::new("alpha").with_hit("a", 1.0).register(&registry).await;
    MockPlugin::new("beta").failing().register(&registry).await;

    let vendors = coordinator(&registry)
        .list_sections(&VendorFilter::All, None, None)
        .await
        .unwrap();

    let_assert!([alpha] = vendors.as_slice());
    check!(alpha.vendor == "alpha");
    check!(alpha.sections[0].page_count == 1);
}
