//! End-to-end page compilation through the public API.

use folio::config::{Hooks, OutputMode, SiteConfig};
use folio::data::StaticDataStore;
use folio::error::{ContentAccessError, DataCascadeError};
use folio::pipeline::{render_page_entry, write, write_all};
use folio::template::{PageEntry, Template};
use folio::{SiteContext, build::expand_templates, collections::Collections};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn site(store: StaticDataStore, config: SiteConfig, hooks: Hooks) -> Arc<SiteContext> {
    SiteContext::new(config)
        .with_data_store(Arc::new(store))
        .with_hooks(hooks)
        .into_shared()
}

fn reporting_config() -> SiteConfig {
    let mut config = SiteConfig::default();
    config.build.output_mode = OutputMode::Json;
    config
}

async fn entries_of(ctx: &Arc<SiteContext>, templates: &[(&str, &str)]) -> Vec<PageEntry> {
    let templates: Vec<Arc<Template>> = templates
        .iter()
        .map(|(path, source)| Template::new_virtual(path, *source, ctx).unwrap())
        .collect();
    let mut entries = expand_templates(&templates).await.unwrap();
    let collections = Collections::build(&entries).to_value();
    for entry in &mut entries {
        entry.process_remaining_data(&collections).await.unwrap();
    }
    entries
}

#[tokio::test]
async fn post_with_directory_layout_lands_in_its_own_folder() {
    let store = StaticDataStore::new()
        .with_global(json!({}))
        .with_directory("posts", json!({"layout": "base"}));
    let ctx = site(store, reporting_config(), Hooks::new());
    ctx.layouts
        .insert_virtual("base", "base.html", "<body>{{ content }}</body>", &ctx)
        .await
        .unwrap();

    let mut entries = entries_of(&ctx, &[("posts/a.md", "---\ntitle: Hi\n---\n{{ title }}")]).await;
    let entry = &mut entries[0];
    assert_eq!(entry.data["title"], json!("Hi"));
    assert_eq!(entry.data["layout"], json!("base"));
    assert_eq!(entry.output_path(), Some("_site/posts/a/index.html"));

    let content = render_page_entry(entry).await.unwrap();
    assert_eq!(content.as_text(), Some("<body><p>Hi</p>\n</body>"));
}

#[tokio::test]
async fn front_matter_wins_at_any_depth() {
    let store = StaticDataStore::new()
        .with_global(json!({"seo": {"title": "global", "robots": "index"}}))
        .with_directory("docs", json!({"seo": {"title": "dir", "lang": "en"}}));
    let ctx = site(store, reporting_config(), Hooks::new());
    let entries = entries_of(&ctx, &[("docs/x.md", "---\nseo:\n  title: mine\n---\n")]).await;
    assert_eq!(
        entries[0].data["seo"],
        json!({"title": "mine", "robots": "index", "lang": "en"})
    );
}

#[tokio::test]
async fn reserved_key_in_user_data_is_rejected() {
    let ctx = site(StaticDataStore::new(), reporting_config(), Hooks::new());
    let template = Template::new_virtual("a.md", "---\ncollections: []\n---\n", &ctx).unwrap();
    let err = template.page_entries().await.unwrap_err();
    let cascade = err.downcast_ref::<DataCascadeError>().unwrap();
    assert_eq!(cascade.reserved_keys(), ["collections"]);
    assert!(err.to_string().contains("collections"));
}

#[tokio::test]
async fn permalink_false_renders_but_is_never_written() {
    let ctx = site(StaticDataStore::new(), reporting_config(), Hooks::new());
    let mut entries = entries_of(&ctx, &[("hidden.md", "---\npermalink: false\n---\nsecret")]).await;
    let entry = &mut entries[0];
    assert_eq!(entry.data["page"]["url"], json!(false));

    let content = render_page_entry(entry).await.unwrap();
    assert_eq!(content.as_text(), Some("<p>secret</p>\n"));
    assert!(write(entry, &content).await.unwrap().is_none());
}

#[tokio::test]
async fn content_access_before_render_is_typed() {
    let ctx = site(StaticDataStore::new(), reporting_config(), Hooks::new());
    let entries = entries_of(
        &ctx,
        &[
            ("a.md", "text"),
            ("b.md", "---\npermalink:\n  serverless: /b/\n---\ntext"),
        ],
    )
    .await;
    assert!(matches!(
        entries[0].template_content(),
        Err(ContentAccessError::NotYetRendered { .. })
    ));
    assert!(matches!(
        entries[1].template_content(),
        Err(ContentAccessError::Unrenderable { .. })
    ));
}

#[tokio::test]
async fn rendering_twice_runs_transforms_once() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let hooks = Hooks::new().transform("wrap", move |content, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("<div>{content}</div>"))
    });
    let ctx = site(StaticDataStore::new(), reporting_config(), hooks);
    let mut entries = entries_of(&ctx, &[("a.html", "x")]).await;

    let first = render_page_entry(&mut entries[0]).await.unwrap();
    let second = render_page_entry(&mut entries[0]).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.as_text(), Some("<div>x</div>"));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn front_matter_date_is_utc_midnight() {
    let ctx = site(StaticDataStore::new(), reporting_config(), Hooks::new());
    let entries = entries_of(&ctx, &[("a.md", "---\ndate: \"2021-03-04\"\n---\n")]).await;
    assert_eq!(entries[0].data["page"]["date"], json!("2021-03-04T00:00:00Z"));
}

#[tokio::test]
async fn computed_data_sees_collections_in_second_phase() {
    let ctx = site(StaticDataStore::new(), reporting_config(), Hooks::new());
    let entries = entries_of(
        &ctx,
        &[
            ("posts/one.md", "---\ntags: post\ndate: 2021-01-01\n---\n"),
            ("posts/two.md", "---\ntags: post\ndate: 2021-02-01\n---\n"),
            (
                "index.html",
                "---\ncomputed:\n  title: 'Home of {{ site }}'\n  latest: '{{ collections.post | json }}'\nsite: demo\n---\n",
            ),
        ],
    )
    .await;

    let index = &entries[2];
    assert_eq!(index.data["title"], json!("Home of demo"));
    let latest: Value = serde_json::from_str(index.data["latest"].as_str().unwrap()).unwrap();
    let urls: Vec<&Value> = latest.as_array().unwrap().iter().map(|p| &p["url"]).collect();
    assert_eq!(urls, [&json!("/posts/one/"), &json!("/posts/two/")]);
    assert!(!index.has_pending_data());
}

#[tokio::test]
async fn computed_permalink_moves_the_page() {
    let ctx = site(StaticDataStore::new(), reporting_config(), Hooks::new());
    let entries = entries_of(
        &ctx,
        &[(
            "notes/draft.md",
            "---\ntitle: Big News\ncomputed:\n  permalink: '/news/{{ title | slug }}/'\n---\n",
        )],
    )
    .await;
    assert_eq!(entries[0].url(), Some("/news/big-news/"));
    assert_eq!(entries[0].output_path(), Some("_site/news/big-news/index.html"));
}

#[tokio::test]
async fn paginated_template_writes_every_page() {
    let store = StaticDataStore::new().with_global(json!({"items": ["a", "b", "c"]}));
    let ctx = site(store, reporting_config(), Hooks::new());
    let mut entries = entries_of(
        &ctx,
        &[(
            "list.html",
            "---\npagination:\n  data: items\n  size: 2\n---\n{{ pagination.pageNumber }}:{{ pagination.items | json }}",
        )],
    )
    .await;

    let report = write_all(&mut entries, None).await.unwrap();
    assert!(report.is_success());
    let pages: Vec<(&str, String)> = report
        .results
        .iter()
        .map(|r| (r.output_path.as_str(), r.content.to_string()))
        .collect();
    assert_eq!(
        pages,
        [
            ("_site/list/index.html", r#"0:["a","b"]"#.to_owned()),
            ("_site/list/1/index.html", r#"1:["c"]"#.to_owned()),
        ]
    );
}

#[tokio::test]
async fn json_records_carry_raw_input_and_selected_data() {
    let mut config = reporting_config();
    config.data.selectors = vec!["title".into(), "page.fileSlug".into()];
    let ctx = site(StaticDataStore::new(), config, Hooks::new());
    let source = "---\ntitle: T\n---\nbody";
    let mut entries = entries_of(&ctx, &[("a.html", source)]).await;

    let report = write_all(&mut entries, None).await.unwrap();
    let record = serde_json::to_value(&report.results[0]).unwrap();
    assert_eq!(record["url"], json!("/a/"));
    assert_eq!(record["inputPath"], json!("src/a.html"));
    assert_eq!(record["outputPath"], json!("_site/a/index.html"));
    assert_eq!(record["rawInput"], json!(source));
    assert_eq!(record["content"], json!("body"));
    assert_eq!(record["data"], json!({"title": "T", "page": {"fileSlug": "a"}}));
}
