use std::time::Duration;

use folio_core::sources::{manning, oreilly, yes24};
use folio_core::{
    AppError, FailurePolicy, HarvestConfig, HarvestService, RawContent, RetryPolicy,
    ThrottleConfig, ThrottledFactory, TracingHarvestReporter,
};

use crate::common::SiteFetcher;

fn config(failure_policy: FailurePolicy) -> HarvestConfig {
    HarvestConfig {
        retry: RetryPolicy::immediate(3),
        failure_policy,
        ..Default::default()
    }
}

#[tokio::test]
async fn manning_catalog_becomes_flat_records() {
    let catalog = serde_json::json!({
        "catalog": {"items": [
            {"title": "Foo", "link": "/p/1", "imageUrl": "covers/a.jpg"},
            {"title": "   "},
            "not an object",
        ]}
    });
    let site = SiteFetcher::new().route(manning::API_URL, Ok(RawContent::Json(catalog)));
    let service = HarvestService::new(
        site.clone(),
        TracingHarvestReporter,
        config(FailurePolicy::Propagate),
    );

    let target = manning::CatalogQuery::default().target().unwrap();
    let results = service.run(&manning::PROFILE, &[target]).await.unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&results.to_json(manning::PROFILE.output).unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!([{
            "title": "Foo",
            "detail_link": "/p/1",
            "cover_image": "https://images.manning.com/320/400/resize/covers/a.jpg",
        }])
    );
    assert_eq!(*site.closed.lock().unwrap(), 1);
}

#[tokio::test]
async fn manning_failure_is_fatal_after_retries() {
    let site = SiteFetcher::new().route(
        manning::API_URL,
        Err(AppError::HttpError("HTTP 502".into())),
    );
    let service = HarvestService::new(
        site.clone(),
        TracingHarvestReporter,
        HarvestConfig {
            session_attempts: 1,
            ..config(FailurePolicy::Propagate)
        },
    );

    let target = manning::CatalogQuery::default().target().unwrap();
    assert!(service.run(&manning::PROFILE, &[target]).await.is_err());
    assert_eq!(site.fetched().len(), 3);
    assert_eq!(*site.closed.lock().unwrap(), 1);
}

#[tokio::test]
async fn oreilly_cards_never_rendering_yield_an_empty_listing() {
    let site = SiteFetcher::new().route(oreilly::SEARCH_URL, Err(AppError::Timeout(30)));
    let service = HarvestService::new(
        site.clone(),
        TracingHarvestReporter,
        config(FailurePolicy::Propagate),
    );

    let results = service
        .run(&oreilly::PROFILE, &[oreilly::target()])
        .await
        .unwrap();

    assert_eq!(results.len(), 0);
    assert_eq!(results.to_json(oreilly::PROFILE.output).unwrap(), "[]");
    assert_eq!(site.fetched().len(), 3);
    assert_eq!(*site.closed.lock().unwrap(), 1);
}

#[tokio::test]
async fn oreilly_duplicates_keep_the_more_complete_card() {
    let page = r#"<main>
      <div data-testid="search-card-0">
        <h4 class="title">Fluent Rust</h4>
        <a class="MuiTypography-link" href="/library/view/fluent-rust/1/">Fluent Rust</a>
      </div>
      <div data-testid="search-card-1">
        <h4 class="title">Other Book</h4>
        <a class="MuiTypography-link" href="/library/view/other/2/">Other Book</a>
      </div>
      <div data-testid="search-card-2">
        <h4 class="title">Fluent Rust, 2nd Edition</h4>
        <a class="MuiTypography-link" href="/library/view/fluent-rust/1/">x</a>
        <p data-testid="search-card-description-2">All about it.</p>
        <span class="MuiTypography-cardFooter">June 2025</span>
      </div>
    </main>"#;
    let site = SiteFetcher::new().html(oreilly::SEARCH_URL, page);
    let service = HarvestService::new(
        site,
        TracingHarvestReporter,
        config(FailurePolicy::Propagate),
    );

    let results = service
        .run(&oreilly::PROFILE, &[oreilly::target()])
        .await
        .unwrap();
    let records: Vec<_> = results.records().collect();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].title, "Fluent Rust, 2nd Edition");
    assert_eq!(records[0].published_at.as_deref(), Some("June 2025"));
    assert_eq!(records[1].title, "Other Book");
}

#[tokio::test]
async fn yes24_failed_publisher_is_an_empty_group() {
    let publishers = vec![
        yes24::Publisher::new("골든래빗", "287363"),
        yes24::Publisher::new("한빛미디어", "1469"),
        yes24::Publisher::new("인사이트", "289113"),
    ];
    let page = |title: &str| {
        format!(
            r#"<ul><li class="itemUnit" data-goods-no="9"><a class="info_name">[도서] {title}</a></li></ul>"#
        )
    };

    let site = SiteFetcher::new()
        .html("https://m.yes24.com", "<body></body>")
        .html(&publishers[0].search_url(), &page("첫 번째 책"))
        .route(&publishers[1].search_url(), Err(AppError::Timeout(30)))
        .html(&publishers[2].search_url(), &page("세 번째 책"));

    let factory = ThrottledFactory::new(site.clone(), ThrottleConfig::new(Duration::ZERO));
    let service = HarvestService::new(
        factory,
        TracingHarvestReporter,
        HarvestConfig {
            item_cap: Some(yes24::DEFAULT_ITEM_CAP),
            ..config(FailurePolicy::Isolate)
        },
    );

    let results = service
        .run(&yes24::PROFILE, &yes24::targets(&publishers))
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("books_data.json");
    results.write_json(&path, yes24::PROFILE.output).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();

    assert!(written.contains("첫 번째 책"));
    let order: Vec<_> = ["골든래빗", "한빛미디어", "인사이트"]
        .iter()
        .map(|name| written.find(name).unwrap())
        .collect();
    assert!(order.windows(2).all(|w| w[0] < w[1]));

    let json: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(json["한빛미디어"], serde_json::json!([]));
    assert_eq!(json["인사이트"][0]["title"], "세 번째 책");
    assert_eq!(json["골든래빗"][0]["author"], "저자 정보 없음");
    assert_eq!(
        json["골든래빗"][0]["detail_link"],
        "https://www.yes24.com/product/goods/9"
    );

    let fetched = site.fetched();
    assert_eq!(fetched[0], "https://m.yes24.com");
    assert_eq!(fetched.len(), 1 + 1 + 3 + 1);
}

#[test]
fn bundled_publisher_list_loads() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/publishers.json");
    let publishers = yes24::load_publishers(&path).unwrap();

    assert_eq!(publishers.len(), 18);
    assert_eq!(&publishers[..2], yes24::default_publishers().as_slice());
    assert!(publishers.iter().all(|p| !p.id.is_empty()));
}
