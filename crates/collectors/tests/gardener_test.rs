mod common;

use chrono::Duration;
use inventory_core::{
    models::{ColumnValue, Record},
    traits::Scope,
};
use inventory_domain::{
    task_names::{G_COLLECT_CLOUD_PROFILE_IMAGES, G_COLLECT_PROJECTS, G_COLLECT_SHOOTS, G_LINK_ALL},
    Project, Shoot,
};
use serde_json::{json, Value};

use common::{harness, task};

fn project(name: &str) -> Value {
    json!({
        "metadata": {"name": name},
        "spec": {"namespace": format!("garden-{name}"), "owner": {"name": "ops"}},
        "status": {"phase": "Ready"}
    })
}

fn shoot(name: &str, project: &str, seed: &str) -> Value {
    json!({
        "metadata": {"name": name, "namespace": format!("garden-{project}")},
        "spec": {"seedName": seed, "cloudProfileName": "aws", "region": "eu-west-1",
                 "kubernetes": {"version": "1.30.2"}},
        "status": {"technicalID": format!("shoot--{project}--{name}")}
    })
}

fn gardener() -> Scope {
    Scope::new("gardener")
}

#[tokio::test]
async fn test_second_run_over_same_data_inserts_nothing() {
    let h = harness();
    h.source
        .add_page("projects", &gardener(), vec![project("dev"), project("ops")]);
    let handler = h.handler(G_COLLECT_PROJECTS);
    let run = task(G_COLLECT_PROJECTS, None).await;

    handler.handle(&run).await.unwrap();
    assert_eq!(h.store.rows(Project::TABLE).await.len(), 2);
    let first = h.samples("inventory_g_projects");
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].value, 2.0);

    h.clock.advance(Duration::minutes(10));
    handler.handle(&run).await.unwrap();
    let rows = h.store.rows(Project::TABLE).await;
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.updated_at > r.created_at));
    assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
}

#[tokio::test]
async fn test_omitted_record_keeps_its_row_untouched() {
    let h = harness();
    h.source
        .set_pages("projects", &gardener(), vec![vec![project("dev"), project("ops")]]);
    let handler = h.handler(G_COLLECT_PROJECTS);
    let run = task(G_COLLECT_PROJECTS, None).await;
    handler.handle(&run).await.unwrap();

    let key = [ColumnValue::text("ops")];
    let before = h.store.row_by_key(Project::TABLE, &key).await.unwrap();

    h.clock.advance(Duration::minutes(10));
    h.source
        .set_pages("projects", &gardener(), vec![vec![project("dev")]]);
    handler.handle(&run).await.unwrap();

    let after = h.store.row_by_key(Project::TABLE, &key).await.unwrap();
    assert_eq!(after, before);
    let dev = h
        .store
        .row_by_key(Project::TABLE, &[ColumnValue::text("dev")])
        .await
        .unwrap();
    assert!(dev.updated_at > before.updated_at);
}

#[tokio::test]
async fn test_shoots_meta_task_fans_out_per_project() {
    let h = harness();
    h.source
        .add_page("projects", &gardener(), vec![project("dev"), project("ops")]);
    h.handler(G_COLLECT_PROJECTS)
        .handle(&task(G_COLLECT_PROJECTS, None).await)
        .await
        .unwrap();

    h.handler(G_COLLECT_SHOOTS)
        .handle(&task(G_COLLECT_SHOOTS, None).await)
        .await
        .unwrap();

    assert_eq!(
        h.enqueued_payloads(G_COLLECT_SHOOTS).await,
        vec![r#"{"project":"dev"}"#, r#"{"project":"ops"}"#]
    );
}

#[tokio::test]
async fn test_shoots_across_pages_are_deduplicated() {
    let h = harness();
    let scope = gardener().with("project", "dev");
    h.source.set_pages(
        "shoots",
        &scope,
        vec![
            vec![shoot("api", "dev", "aws-eu1"), shoot("web", "dev", "aws-eu1")],
            vec![shoot("api", "dev", "aws-eu1"), json!({"metadata": {"namespace": "garden-dev"}})],
        ],
    );

    h.handler(G_COLLECT_SHOOTS)
        .handle(&task(G_COLLECT_SHOOTS, Some(json!({"project": "dev"}))).await)
        .await
        .unwrap();

    let rows = h.store.rows(Shoot::TABLE).await;
    assert_eq!(rows.len(), 2);
    let samples = h.samples("inventory_g_shoots");
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].label_values, vec!["dev".to_string()]);
    assert_eq!(samples[0].value, 2.0);
}

#[tokio::test]
async fn test_empty_partition_reports_zero() {
    let h = harness();
    h.handler(G_COLLECT_SHOOTS)
        .handle(&task(G_COLLECT_SHOOTS, Some(json!({"project": "idle"}))).await)
        .await
        .unwrap();

    let samples = h.samples("inventory_g_shoots");
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].value, 0.0);
}

#[tokio::test]
async fn test_invalid_payload_is_not_retried() {
    let h = harness();
    let handler = h.handler(G_COLLECT_SHOOTS);

    let malformed = handler
        .handle(&task(G_COLLECT_SHOOTS, Some(json!({"name": "dev"}))).await)
        .await
        .unwrap_err();
    assert!(malformed.is_skip_retry());

    let empty = handler
        .handle(&task(G_COLLECT_SHOOTS, Some(json!({"project": " "}))).await)
        .await
        .unwrap_err();
    assert!(empty.is_skip_retry());

    let images = h
        .handler(G_COLLECT_CLOUD_PROFILE_IMAGES)
        .handle(&task(G_COLLECT_CLOUD_PROFILE_IMAGES, Some(json!({"cloud_profile": ""}))).await)
        .await
        .unwrap_err();
    assert!(images.is_skip_retry());
}

#[tokio::test]
async fn test_source_failure_is_retryable_and_reports_no_sample() {
    let h = harness();
    let scope = gardener().with("project", "dev");
    h.source.fail_with("shoots", &scope, "connection reset");

    let err = h
        .handler(G_COLLECT_SHOOTS)
        .handle(&task(G_COLLECT_SHOOTS, Some(json!({"project": "dev"}))).await)
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(!err.is_skip_retry());
    assert!(h.samples("inventory_g_shoots").is_empty());
}

#[tokio::test]
async fn test_cloud_profile_images_fan_out_over_referenced_profiles() {
    let h = harness();
    h.source.add_page(
        "shoots",
        &gardener().with("project", "dev"),
        vec![shoot("api", "dev", "aws-eu1")],
    );
    h.handler(G_COLLECT_SHOOTS)
        .handle(&task(G_COLLECT_SHOOTS, Some(json!({"project": "dev"}))).await)
        .await
        .unwrap();

    h.handler(G_COLLECT_CLOUD_PROFILE_IMAGES)
        .handle(&task(G_COLLECT_CLOUD_PROFILE_IMAGES, None).await)
        .await
        .unwrap();

    assert_eq!(
        h.enqueued_payloads(G_COLLECT_CLOUD_PROFILE_IMAGES).await,
        vec![r#"{"cloud_profile":"aws"}"#]
    );
}

#[tokio::test]
async fn test_link_pass_connects_shoots_to_projects_and_seeds() {
    let h = harness();
    h.source.add_page("projects", &gardener(), vec![project("dev")]);
    h.source.add_page(
        "seeds",
        &gardener(),
        vec![json!({"metadata": {"name": "aws-eu1"}})],
    );
    h.source.add_page(
        "shoots",
        &gardener().with("project", "dev"),
        vec![shoot("api", "dev", "aws-eu1"), shoot("web", "dev", "unknown-seed")],
    );

    for (name, payload) in [
        (G_COLLECT_PROJECTS, None),
        ("g:collect-seeds", None),
        (G_COLLECT_SHOOTS, Some(json!({"project": "dev"}))),
    ] {
        h.handler(name).handle(&task(name, payload).await).await.unwrap();
    }

    let link = h.handler(G_LINK_ALL);
    link.handle(&task(G_LINK_ALL, None).await).await.unwrap();
    assert_eq!(h.store.links("g_shoot_to_project").await.len(), 2);
    assert_eq!(h.store.links("g_shoot_to_seed").await.len(), 1);

    // 再次执行只刷新已有关系
    h.metrics.collect();
    link.handle(&task(G_LINK_ALL, None).await).await.unwrap();
    assert_eq!(h.store.links("g_shoot_to_project").await.len(), 2);
    let samples = h.samples("inventory_links");
    assert_eq!(samples.len(), 2);
}
