mod common;

use inventory_core::{
    models::{ColumnValue, Record},
    traits::Scope,
};
use inventory_domain::{
    task_names::{AWS_COLLECT_INSTANCES, AWS_COLLECT_REGIONS, AWS_COLLECT_VPCS, AWS_LINK_ALL},
    AwsInstance, AwsRegion, AwsVpc,
};
use serde_json::json;

use common::{harness, task};

fn account(id: &str) -> Scope {
    Scope::new(format!("aws/{id}"))
}

#[tokio::test]
async fn test_regions_meta_task_fans_out_per_configured_account() {
    let h = harness();
    h.handler(AWS_COLLECT_REGIONS)
        .handle(&task(AWS_COLLECT_REGIONS, None).await)
        .await
        .unwrap();

    assert_eq!(
        h.enqueued_payloads(AWS_COLLECT_REGIONS).await,
        vec![r#"{"account_id":"111"}"#, r#"{"account_id":"222"}"#]
    );
}

#[tokio::test]
async fn test_same_region_in_two_accounts_is_two_rows() {
    let h = harness();
    for id in ["111", "222"] {
        h.source.add_page(
            "regions",
            &account(id),
            vec![json!({"RegionName": "eu-west-1", "OptInStatus": "opt-in-not-required"})],
        );
        h.handler(AWS_COLLECT_REGIONS)
            .handle(&task(AWS_COLLECT_REGIONS, Some(json!({"account_id": id}))).await)
            .await
            .unwrap();
    }

    let rows = h.store.rows(AwsRegion::TABLE).await;
    assert_eq!(rows.len(), 2);

    let samples = h.samples("inventory_aws_regions");
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].label_values, vec!["111".to_string()]);
}

#[tokio::test]
async fn test_vpcs_fan_out_over_collected_regions() {
    let h = harness();
    h.source.add_page(
        "regions",
        &account("111"),
        vec![json!({"RegionName": "eu-west-1"}), json!({"RegionName": "us-east-1"})],
    );
    h.handler(AWS_COLLECT_REGIONS)
        .handle(&task(AWS_COLLECT_REGIONS, Some(json!({"account_id": "111"}))).await)
        .await
        .unwrap();

    h.handler(AWS_COLLECT_VPCS)
        .handle(&task(AWS_COLLECT_VPCS, None).await)
        .await
        .unwrap();

    assert_eq!(
        h.enqueued_payloads(AWS_COLLECT_VPCS).await,
        vec![
            r#"{"account_id":"111","region":"eu-west-1"}"#,
            r#"{"account_id":"111","region":"us-east-1"}"#,
        ]
    );
}

#[tokio::test]
async fn test_instances_and_links_for_one_region() {
    let h = harness();
    let regional = account("111").with("region", "eu-west-1");
    h.source
        .add_page("regions", &account("111"), vec![json!({"RegionName": "eu-west-1"})]);
    h.source.add_page(
        "vpcs",
        &regional,
        vec![json!({"VpcId": "vpc-1", "IsDefault": true, "State": "available"})],
    );
    h.source.add_page(
        "instances",
        &regional,
        vec![
            json!({"Instances": [
                {"InstanceId": "i-1", "VpcId": "vpc-1", "State": {"Name": "running"},
                 "LaunchTime": "2024-05-01T10:00:00Z"},
                {"InstanceId": "i-2", "VpcId": "vpc-1"}
            ]}),
            json!({"Instances": [{"InstanceId": "i-1", "VpcId": "vpc-1"}]}),
        ],
    );

    let region = json!({"account_id": "111", "region": "eu-west-1"});
    h.handler(AWS_COLLECT_REGIONS)
        .handle(&task(AWS_COLLECT_REGIONS, Some(json!({"account_id": "111"}))).await)
        .await
        .unwrap();
    h.handler(AWS_COLLECT_VPCS)
        .handle(&task(AWS_COLLECT_VPCS, Some(region.clone())).await)
        .await
        .unwrap();
    h.handler(AWS_COLLECT_INSTANCES)
        .handle(&task(AWS_COLLECT_INSTANCES, Some(region)).await)
        .await
        .unwrap();

    assert_eq!(h.store.rows(AwsVpc::TABLE).await.len(), 1);
    assert_eq!(h.store.rows(AwsInstance::TABLE).await.len(), 2);
    let vpc = h
        .store
        .row_by_key(AwsVpc::TABLE, &[ColumnValue::text("vpc-1"), ColumnValue::text("111")])
        .await
        .unwrap();
    assert_eq!(vpc.values[2], ColumnValue::text("eu-west-1"));

    let samples = h.samples("inventory_aws_instances");
    assert_eq!(samples.len(), 1);
    assert_eq!(
        samples[0].label_values,
        vec!["111".to_string(), "eu-west-1".to_string()]
    );

    h.handler(AWS_LINK_ALL)
        .handle(&task(AWS_LINK_ALL, None).await)
        .await
        .unwrap();
    assert_eq!(h.store.links("aws_instance_to_vpc").await.len(), 2);
    assert_eq!(h.store.links("aws_vpc_to_region").await.len(), 1);
}

#[tokio::test]
async fn test_region_payload_requires_both_fields() {
    let h = harness();
    let err = h
        .handler(AWS_COLLECT_VPCS)
        .handle(&task(AWS_COLLECT_VPCS, Some(json!({"account_id": "111", "region": ""}))).await)
        .await
        .unwrap_err();
    assert!(err.is_skip_retry());

    let err = h
        .handler(AWS_COLLECT_REGIONS)
        .handle(&task(AWS_COLLECT_REGIONS, Some(json!({"account": "111"}))).await)
        .await
        .unwrap_err();
    assert!(err.is_skip_retry());
}
