//! End-to-end harvest tests
//!
//! Configuration is parsed from TOML, the coordinator runs against
//! scripted listing and item pages, and the outcome goes through the CSV
//! and SQLite sinks.

use profile_harvest::config::{parse_config, validate, Config};
use profile_harvest::harvest::{Coordinator, Discoverer, Enricher, PipelineMode, StopReason};
use profile_harvest::output::{build_sinks, write_outcome};
use profile_harvest::page::{SnapshotPage, SnapshotSite};
use profile_harvest::storage::{open_storage, RunStatus, Storage};
use profile_harvest::url::profile_url;
use profile_harvest::{FineMetric, NOT_AVAILABLE};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PROFILE: &str = "https://example.com/@creator";

fn video(n: u32) -> String {
    format!("https://example.com/@creator/video/{}", n)
}

/// A listing frame holding one container per id
fn listing(ids: &[u32]) -> String {
    let containers: String = ids
        .iter()
        .map(|n| {
            format!(
                r#"<div data-e2e="user-post-item"><a href="/@creator/video/{n}"><img></a><strong data-e2e="video-views">{n}.5K</strong></div>"#,
            )
        })
        .collect();
    format!("<html><body><main>{}</main></body></html>", containers)
}

/// An item page with every field rendered
fn item_page(n: u32) -> String {
    format!(
        r#"<html><body>
            <h1 data-e2e="browse-video-desc">Clip number {n}, "quoted"</h1>
            <span data-e2e="browser-nickname"><span>creator</span><span> · </span><span>2024-3-{n}</span></span>
            <strong data-e2e="like-count">{likes}</strong>
            <strong data-e2e="comment-count">{comments}</strong>
            <strong data-e2e="share-count">{shares}</strong>
        </body></html>"#,
        likes = n * 100,
        comments = n * 10,
        shares = n,
    )
}

fn item_pages(ids: &[u32]) -> SnapshotSite {
    ids.iter()
        .fold(SnapshotSite::new(), |site, n| site.page(&video(*n), [item_page(*n)]))
}

fn test_config(mode: &str, count: u32, out: &Path) -> Config {
    let toml = format!(
        r#"
[target]
handle = "creator"
count = {count}

[pipeline]
mode = "{mode}"

[discovery]
max-scroll-attempts = 3
scroll-delay = 1
load-timeout = 200

[enrichment]
navigation-timeout = 200
settle-delay = 1

[browser]
base-url = "https://example.com"

[output]
csv-dir = "{csv}"
database-path = "{db}"
"#,
        count = count,
        mode = mode,
        csv = out.join("csv").display(),
        db = out.join("harvest.db").display(),
    );
    let config = parse_config(&toml).expect("config should parse");
    validate(&config).expect("config should be valid");
    config
}

fn coordinator(
    config: &Config,
    listing_site: SnapshotSite,
    detail_site: SnapshotSite,
) -> Coordinator<SnapshotPage, SnapshotPage> {
    let run = config.run_config();
    let profile = profile_url(&config.browser.base_url, &run.target_handle).unwrap();
    assert_eq!(profile.as_str(), PROFILE);

    let discoverer = Discoverer::new(
        SnapshotPage::new(listing_site),
        run,
        profile,
        &config.discovery,
    );
    let enricher = Enricher::new(SnapshotPage::new(detail_site), &config.enrichment);
    Coordinator::new(
        config.target.handle.clone(),
        config.pipeline.mode,
        discoverer,
        enricher,
    )
}

#[tokio::test]
async fn test_streaming_harvest_writes_csv_and_database() {
    let dir = TempDir::new().unwrap();
    let config = test_config("streaming", 3, dir.path());
    let listing_site = SnapshotSite::new().page(PROFILE, [listing(&[1, 2]), listing(&[1, 2, 3, 4])]);

    let outcome = coordinator(&config, listing_site, item_pages(&[1, 2, 3, 4]))
        .run()
        .await;

    assert_eq!(outcome.mode, PipelineMode::Streaming);
    assert_eq!(outcome.discovery.stop, StopReason::TargetReached);
    assert_eq!(outcome.discovery.emitted, 3);
    assert_eq!(outcome.discovery.scrolls, 1);
    assert!(!outcome.is_partial());

    let second = &outcome.records[1];
    assert_eq!(second.id, video(2));
    assert_eq!(second.coarse_metric, "2.5K");
    assert_eq!(second.get(FineMetric::Likes), "200");
    assert_eq!(second.get(FineMetric::Comments), "20");
    assert_eq!(second.get(FineMetric::Shares), "2");
    assert_eq!(second.get(FineMetric::Caption), "Clip number 2, \"quoted\"");
    assert_eq!(second.get(FineMetric::UploadTime), "2024-3-2");

    let mut sinks = build_sinks(&config, "creator", "hash").unwrap();
    let locations = write_outcome(&mut sinks, &outcome).unwrap();
    assert_eq!(locations.len(), 2);

    let csv = fs::read_to_string(dir.path().join("csv").join("creator.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        r#""Url","Views","Likes","Comments","Shares","Caption","UploadTime""#
    );
    assert_eq!(
        lines[1],
        r#""https://example.com/@creator/video/1","1.5K","100","10","1","Clip number 1, ""quoted""","2024-3-1""#
    );
    assert!(lines[3].starts_with(r#""https://example.com/@creator/video/3""#));

    let storage = open_storage(&dir.path().join("harvest.db")).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.handle, "creator");
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.stop_reason.as_deref(), Some("target_reached"));
    assert_eq!(storage.count_records(run.id).unwrap(), 3);
}

#[tokio::test]
async fn test_batch_harvest_drops_failed_item() {
    let dir = TempDir::new().unwrap();
    let config = test_config("batch", 5, dir.path());
    let listing_site = SnapshotSite::new().page(PROFILE, [listing(&[1, 2, 3, 4, 5])]);
    let detail_site = item_pages(&[1, 2, 3, 4, 5]).failing(&video(3));

    let outcome = coordinator(&config, listing_site, detail_site).run().await;

    let ids: Vec<&str> = outcome.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![video(1), video(2), video(4), video(5)]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].position, 3);
    assert_eq!(outcome.failures[0].id, video(3));
    assert!(outcome.is_partial());

    let mut sinks = build_sinks(&config, "creator", "hash").unwrap();
    write_outcome(&mut sinks, &outcome).unwrap();

    let csv = fs::read_to_string(dir.path().join("csv").join("creator.csv")).unwrap();
    assert_eq!(csv.lines().count(), 5);
    assert!(!csv.contains(&video(3)));

    let storage = open_storage(&dir.path().join("harvest.db")).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Partial);
    assert_eq!(storage.load_failures(run.id).unwrap(), outcome.failures);
}

#[tokio::test]
async fn test_modes_agree_when_budget_runs_out() {
    let dir = TempDir::new().unwrap();
    let frames = [listing(&[1]), listing(&[1, 2]), listing(&[2, 3])];

    let mut outcomes = Vec::new();
    for mode in ["batch", "streaming"] {
        let config = test_config(mode, 10, dir.path());
        let listing_site = SnapshotSite::new().page(PROFILE, frames.clone());
        outcomes.push(
            coordinator(&config, listing_site, item_pages(&[1, 2, 3]))
                .run()
                .await,
        );
    }

    for outcome in &outcomes {
        assert_eq!(outcome.discovery.stop, StopReason::ScrollBudgetExhausted);
        assert_eq!(outcome.discovery.scrolls, 3);
        assert_eq!(outcome.records.len(), 3);
        assert!(outcome.is_partial());
    }
    assert_eq!(outcomes[0].records, outcomes[1].records);
}

#[tokio::test]
async fn test_missing_fields_become_sentinel() {
    let dir = TempDir::new().unwrap();
    let config = test_config("streaming", 1, dir.path());
    let listing_site = SnapshotSite::new().page(
        PROFILE,
        [r#"<div data-e2e="user-post-item"><a href="/@creator/video/8">x</a><strong data-e2e="video-views">  </strong></div>"#],
    );
    let detail_site = SnapshotSite::new().page(
        &video(8),
        [r#"<html><body><strong data-e2e="like-count">9</strong></body></html>"#],
    );

    let outcome = coordinator(&config, listing_site, detail_site).run().await;

    let record = &outcome.records[0];
    assert_eq!(record.coarse_metric, NOT_AVAILABLE);
    assert_eq!(record.get(FineMetric::Likes), "9");
    assert_eq!(record.get(FineMetric::Caption), NOT_AVAILABLE);
    assert_eq!(record.get(FineMetric::UploadTime), NOT_AVAILABLE);
}

#[tokio::test]
async fn test_zero_target_writes_header_only() {
    let dir = TempDir::new().unwrap();
    let config = test_config("streaming", 0, dir.path());
    let listing_site = SnapshotSite::new().page(PROFILE, [listing(&[1, 2])]);

    let coordinator = coordinator(&config, listing_site, item_pages(&[1, 2]));
    let outcome = coordinator.run().await;

    assert!(coordinator.discoverer().page().calls().is_empty());
    assert!(coordinator.enricher().page().calls().is_empty());
    assert_eq!(outcome.discovery.stop, StopReason::TargetReached);

    let mut sinks = build_sinks(&config, "creator", "hash").unwrap();
    write_outcome(&mut sinks, &outcome).unwrap();
    let csv = fs::read_to_string(dir.path().join("csv").join("creator.csv")).unwrap();
    assert_eq!(csv.lines().count(), 1);
}
