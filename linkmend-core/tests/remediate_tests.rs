// Tests for remediation planning and submission

mod common;

use common::{FakeSite, MemoryRepository, SITE};
use linkmend_core::remediate::default_branch_name;
use linkmend_core::{
    BrokenLinkRecord, Error, RemediationOptions, ScanContext, ScanOptions, ScanSettings,
    build_patches, describe, scan, submit,
};
use linkmend_scanner::{BreakReason, SitemapCache, Suggestion};
use std::sync::Arc;

fn record(path: &str, broken: &str, suggested: Option<(&str, f64)>) -> BrokenLinkRecord {
    BrokenLinkRecord::new(
        path,
        broken,
        suggested.map(|(url, confidence)| Suggestion::new(url.to_string(), confidence)),
        BreakReason::Status(404),
    )
}

#[tokio::test]
async fn test_patch_replaces_every_occurrence() {
    let repo = MemoryRepository::new(&[(
        "docs/intro.md",
        "See https://d.io/old.\nAlso [here](https://d.io/old) and https://d.io/old",
    )]);
    let records = vec![record("docs/intro.md", "https://d.io/old", Some(("https://d.io/new", 0.9)))];

    let plan = build_patches(&repo, &records, &RemediationOptions::default())
        .await
        .unwrap();

    assert_eq!(plan.patches.len(), 1);
    assert_eq!(
        plan.patches[0].content,
        "See https://d.io/new.\nAlso [here](https://d.io/new) and https://d.io/new"
    );
    assert_eq!(plan.manifest.len(), 1);
    assert_eq!(plan.manifest[0].confidence, 90);
}

#[tokio::test]
async fn test_same_url_in_two_files_gives_two_patches() {
    let repo = MemoryRepository::new(&[
        ("a.md", "link https://d.io/old"),
        ("b.md", "other https://d.io/old"),
    ]);
    let records = vec![
        record("a.md", "https://d.io/old", Some(("https://d.io/new", 0.8))),
        record("b.md", "https://d.io/old", Some(("https://d.io/new", 0.8))),
    ];

    let plan = build_patches(&repo, &records, &RemediationOptions::default())
        .await
        .unwrap();

    let paths: Vec<&str> = plan.patches.iter().map(|p| p.path.as_str()).collect();
    assert_eq!(paths, vec!["a.md", "b.md"]);
    assert_eq!(plan.patches[0].content, "link https://d.io/new");
    assert_eq!(plan.patches[1].content, "other https://d.io/new");
}

#[tokio::test]
async fn test_each_file_fetched_once() {
    let repo = MemoryRepository::new(&[("a.md", "https://d.io/x https://d.io/y https://d.io/z")]);
    let records = vec![
        record("a.md", "https://d.io/x", Some(("https://d.io/x2", 0.5))),
        record("a.md", "https://d.io/y", Some(("https://d.io/y2", 0.5))),
        record("a.md", "https://d.io/z", Some(("https://d.io/z2", 0.5))),
    ];

    let plan = build_patches(&repo, &records, &RemediationOptions::default())
        .await
        .unwrap();

    assert_eq!(repo.reads_of("a.md"), 1);
    assert_eq!(plan.patches.len(), 1);
    assert_eq!(
        plan.patches[0].content,
        "https://d.io/x2 https://d.io/y2 https://d.io/z2"
    );
    assert_eq!(plan.manifest.len(), 3);
}

#[tokio::test]
async fn test_later_substitutions_see_earlier_results() {
    let repo = MemoryRepository::new(&[("a.md", "https://d.io/a")]);
    let records = vec![
        record("a.md", "https://d.io/a", Some(("https://d.io/b", 0.5))),
        record("a.md", "https://d.io/b", Some(("https://d.io/c", 0.5))),
    ];

    let plan = build_patches(&repo, &records, &RemediationOptions::default())
        .await
        .unwrap();

    assert_eq!(plan.patches[0].content, "https://d.io/c");
}

#[tokio::test]
async fn test_skips_records_without_usable_suggestion() {
    let repo = MemoryRepository::new(&[
        ("a.md", "https://d.io/none"),
        ("b.md", "https://d.io/weak"),
        ("c.md", "https://d.io/strong"),
    ]);
    let records = vec![
        record("a.md", "https://d.io/none", None),
        record("b.md", "https://d.io/weak", Some(("https://d.io/w", 0.3))),
        record("c.md", "https://d.io/strong", Some(("https://d.io/s", 0.9))),
    ];

    let options = RemediationOptions { min_confidence: 50 };
    let plan = build_patches(&repo, &records, &options).await.unwrap();

    assert_eq!(plan.patches.len(), 1);
    assert_eq!(plan.patches[0].path, "c.md");
    assert_eq!(repo.reads_of("a.md"), 0);
    assert_eq!(repo.reads_of("b.md"), 0);
}

#[tokio::test]
async fn test_duplicate_records_applied_once() {
    let repo = MemoryRepository::new(&[("a.md", "https://d.io/old")]);
    let records = vec![
        record("a.md", "https://d.io/old", Some(("https://d.io/new", 0.7))),
        record("a.md", "https://d.io/old", Some(("https://d.io/new", 0.7))),
    ];

    let plan = build_patches(&repo, &records, &RemediationOptions::default())
        .await
        .unwrap();

    assert_eq!(plan.manifest.len(), 1);
}

#[tokio::test]
async fn test_unchanged_file_produces_no_patch() {
    let repo = MemoryRepository::new(&[("a.md", "no links here")]);
    let records = vec![record("a.md", "https://d.io/old", Some(("https://d.io/new", 0.7)))];

    let plan = build_patches(&repo, &records, &RemediationOptions::default())
        .await
        .unwrap();

    assert!(plan.is_empty());
    assert!(plan.manifest.is_empty());
}

#[tokio::test]
async fn test_build_patches_is_idempotent() {
    let repo = MemoryRepository::new(&[
        ("a.md", "https://d.io/1 https://d.io/2"),
        ("b.md", "https://d.io/2"),
    ]);
    let records = vec![
        record("a.md", "https://d.io/1", Some(("https://d.io/one", 0.6))),
        record("a.md", "https://d.io/2", Some(("https://d.io/two", 0.6))),
        record("b.md", "https://d.io/2", Some(("https://d.io/two", 0.6))),
    ];
    let options = RemediationOptions::default();

    let first = build_patches(&repo, &records, &options).await.unwrap();
    let second = build_patches(&repo, &records, &options).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_fetch_failure_is_reported() {
    let repo = MemoryRepository::new(&[("a.md", "x")]).unreadable("a.md");
    let records = vec![record("a.md", "https://d.io/old", Some(("https://d.io/new", 0.7)))];

    let err = build_patches(&repo, &records, &RemediationOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::DocumentFetch { ref path, .. } if path == "a.md"));
}

#[tokio::test]
async fn test_submit_hands_patches_to_repository() {
    let repo = MemoryRepository::new(&[("a.md", "https://d.io/old")]);
    let records = vec![record("a.md", "https://d.io/old", Some(("https://d.io/new", 0.7)))];
    let plan = build_patches(&repo, &records, &RemediationOptions::default())
        .await
        .unwrap();
    let text = describe(&plan);

    let url = submit(&repo, &plan, &text, "fix-doc-links-1").await.unwrap();

    assert_eq!(url, "https://github.com/acme/docs/pull/1");
    let submissions = repo.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].branch, "fix-doc-links-1");
    assert_eq!(submissions[0].title, "chore: fix broken documentation links");
    assert!(
        submissions[0]
            .description
            .contains("- [ ] a.md: https://d.io/old -> https://d.io/new")
    );
    assert_eq!(submissions[0].patches, plan.patches);
}

#[tokio::test]
async fn test_submit_rejects_empty_plan() {
    let repo = MemoryRepository::new(&[]);
    let plan = linkmend_core::RemediationPlan::default();

    let err = submit(&repo, &plan, &describe(&plan), "fix").await.unwrap_err();

    assert!(matches!(err, Error::NothingToFix));
    assert!(repo.submissions().is_empty());
}

#[test]
fn test_default_branch_name_prefix() {
    let name = default_branch_name(chrono::Utc::now());
    assert!(name.starts_with("fix-doc-links-"));
    assert!(name["fix-doc-links-".len()..].parse::<i64>().is_ok());
}

#[tokio::test]
async fn test_scan_then_fix_end_to_end() {
    let site = Arc::new(FakeSite::with_sitemap(&[
        "https://docs.example.com/guides/getting-started",
        "https://docs.example.com/reference/errors",
    ]));
    let repo = MemoryRepository::new(&[(
        "docs/intro.md",
        "First https://docs.example.com/old/getting-started then https://docs.example.com/old/getting-started/",
    )]);
    let context = ScanContext::prepare(
        site.clone(),
        &ScanSettings::new(SITE),
        &SitemapCache::new(),
        None,
    )
    .await
    .unwrap();

    let report = scan(&repo, &context, ScanOptions::default()).await.unwrap();
    let plan = build_patches(&repo, &report.records, &RemediationOptions::default())
        .await
        .unwrap();

    assert_eq!(report.records.len(), 2);
    assert_eq!(plan.patches.len(), 1);
    assert!(!plan.patches[0].content.contains("/old/"));
    assert_eq!(
        plan.patches[0].content,
        "First https://docs.example.com/guides/getting-started then https://docs.example.com/guides/getting-started/"
    );
}
