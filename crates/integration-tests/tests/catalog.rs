//! Catalog paging, query resets and filter metadata.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use reqwest::StatusCode;
use serde_json::json;
use vitrine_core::{FilterValueId, ProductId};
use vitrine_integration_tests::{Harness, catalog_json, product_json};
use vitrine_storefront::api::{ApiResponse, Method};
use vitrine_storefront::testing::ScriptedTransport;

/// `GET catalog`: 30 products in pages of the requested size, or a single
/// hit (id 100) for any search.
fn script_catalog(transport: &ScriptedTransport) {
    transport.route(Method::Get, "catalog", |request, _| {
        if ScriptedTransport::query_param(request, "search").is_some() {
            return Ok(ApiResponse::json(StatusCode::OK, &catalog_json(&[100], 1)));
        }
        let page: i64 = ScriptedTransport::query_param(request, "page")
            .and_then(|p| p.parse().ok())
            .unwrap_or(1);
        let per_page: i64 = ScriptedTransport::query_param(request, "per_page")
            .and_then(|p| p.parse().ok())
            .unwrap_or(12);
        let first = (page - 1) * per_page + 1;
        let ids: Vec<i64> = (first..first + per_page).filter(|id| *id <= 30).collect();
        Ok(ApiResponse::json(StatusCode::OK, &catalog_json(&ids, 30)))
    });
}

fn ids(harness: &Harness) -> Vec<i64> {
    harness
        .app
        .catalog()
        .snapshot()
        .items
        .iter()
        .map(|p| p.id.get())
        .collect()
}

#[tokio::test]
async fn test_load_more_appends_until_exhausted() {
    let harness = Harness::new();
    script_catalog(&harness.transport);
    let catalog = harness.app.catalog();

    catalog.refresh().await.unwrap();
    assert!(catalog.load_more().await.unwrap());
    assert!(catalog.load_more().await.unwrap());
    assert!(!catalog.load_more().await.unwrap());

    assert_eq!(ids(&harness), (1..=30).collect::<Vec<_>>());
    let state = catalog.snapshot();
    assert_eq!(state.query.page, 3);
    assert!(!state.has_more);
    assert_eq!(harness.transport.calls_to(Method::Get, "catalog"), 3);
}

#[tokio::test]
async fn test_new_search_resets_to_first_page() {
    let harness = Harness::new();
    script_catalog(&harness.transport);
    let catalog = harness.app.catalog();
    catalog.refresh().await.unwrap();
    catalog.load_more().await.unwrap();
    assert_eq!(ids(&harness).len(), 24);

    catalog.set_search("lamp").await.unwrap();

    assert_eq!(ids(&harness), vec![100]);
    let state = catalog.snapshot();
    assert_eq!(state.query.page, 1);
    assert_eq!(state.total, 1);
    let last = harness.transport.last_call(Method::Get, "catalog").unwrap();
    assert_eq!(ScriptedTransport::query_param(&last, "page").as_deref(), Some("1"));
}

#[tokio::test]
async fn test_filter_change_resets_page_and_sends_selection() {
    let harness = Harness::new();
    script_catalog(&harness.transport);
    let catalog = harness.app.catalog();
    catalog.refresh().await.unwrap();
    catalog.load_more().await.unwrap();

    catalog.toggle_filter("brand", FilterValueId::new(4)).await.unwrap();
    catalog.toggle_filter("brand", FilterValueId::new(2)).await.unwrap();

    let last = harness.transport.last_call(Method::Get, "catalog").unwrap();
    assert_eq!(ScriptedTransport::query_param(&last, "brand").as_deref(), Some("2,4"));
    assert_eq!(ScriptedTransport::query_param(&last, "page").as_deref(), Some("1"));
    assert_eq!(ids(&harness), (1..=12).collect::<Vec<_>>());

    catalog.clear_filters().await.unwrap();
    let last = harness.transport.last_call(Method::Get, "catalog").unwrap();
    assert_eq!(ScriptedTransport::query_param(&last, "brand"), None);
}

#[tokio::test]
async fn test_superseded_search_is_discarded() {
    let harness = Harness::new();
    harness.transport.route(Method::Get, "catalog", |request, _| {
        let search = ScriptedTransport::query_param(request, "search").unwrap_or_default();
        let id = if search == "old" { 1 } else { 2 };
        Ok(ApiResponse::json(StatusCode::OK, &catalog_json(&[id], 1)))
    });
    let gate = harness.transport.hold(Method::Get, "catalog");
    let catalog = harness.app.catalog();

    let release = async {
        while harness.transport.calls_to(Method::Get, "catalog") < 2 {
            tokio::task::yield_now().await;
        }
        gate.release_many(2);
    };
    let (old, new, ()) = tokio::join!(catalog.set_search("old"), catalog.set_search("new"), release);

    old.unwrap();
    new.unwrap();
    assert_eq!(ids(&harness), vec![2]);
    assert_eq!(catalog.snapshot().query.search, "new");
    assert!(!catalog.snapshot().loading);
}

#[tokio::test]
async fn test_filter_metadata_survives_restart() {
    let harness = Harness::new();
    harness.transport.reply(
        Method::Get,
        "catalog",
        StatusCode::OK,
        json!({
            "items": [product_json(1)],
            "total": 1,
            "filters": [{"field": "brand", "title": "Brand", "values": [{"id": 4, "label": "Acme"}]}]
        }),
    );
    harness.app.catalog().refresh().await.unwrap();

    let restarted = harness.restart();
    restarted.start().await;

    let groups = restarted.catalog().snapshot().filter_groups;
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].values[0].label, "Acme");
    assert_eq!(harness.transport.calls_to(Method::Get, "catalog"), 1);
}

#[tokio::test]
async fn test_missing_product_is_reported() {
    let harness = Harness::new();
    let mut notices = harness.app.notifier().subscribe();

    let result = harness.app.catalog().load_item(ProductId::new(404)).await;

    assert!(result.is_err());
    assert!(harness.app.catalog().snapshot().current.is_none());
    assert_eq!(notices.try_recv().unwrap().message, "Not found");
}
