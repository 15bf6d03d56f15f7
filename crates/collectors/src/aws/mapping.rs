use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use inventory_domain::{AwsInstance, AwsRegion, AwsVpc};

use crate::raw::{decode, lenient_timestamp, nullable, required, tag, trimmed, Tag, Unmappable};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct RawRegion {
    #[serde(deserialize_with = "trimmed")]
    region_name: String,
    #[serde(deserialize_with = "trimmed")]
    endpoint: String,
    #[serde(deserialize_with = "trimmed")]
    opt_in_status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct RawVpc {
    #[serde(deserialize_with = "trimmed")]
    vpc_id: String,
    #[serde(deserialize_with = "trimmed")]
    cidr_block: String,
    #[serde(deserialize_with = "trimmed")]
    state: String,
    #[serde(deserialize_with = "nullable")]
    is_default: bool,
    #[serde(deserialize_with = "nullable")]
    tags: Vec<Tag>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct RawReservation {
    #[serde(deserialize_with = "nullable")]
    instances: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct RawInstance {
    #[serde(deserialize_with = "trimmed")]
    instance_id: String,
    #[serde(deserialize_with = "trimmed")]
    vpc_id: String,
    #[serde(deserialize_with = "trimmed")]
    instance_type: String,
    #[serde(deserialize_with = "nullable")]
    state: InstanceState,
    #[serde(deserialize_with = "trimmed")]
    image_id: String,
    #[serde(deserialize_with = "lenient_timestamp")]
    launch_time: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "nullable")]
    tags: Vec<Tag>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct InstanceState {
    #[serde(deserialize_with = "trimmed")]
    name: String,
}

pub fn region(account_id: &str, item: &Value) -> Vec<Result<AwsRegion, Unmappable>> {
    vec![decode::<RawRegion>(item).and_then(|raw| {
        Ok(AwsRegion {
            name: required(&raw.region_name, "RegionName")?,
            account_id: account_id.to_string(),
            endpoint: raw.endpoint,
            opt_in_status: raw.opt_in_status,
        })
    })]
}

pub fn vpc(account_id: &str, region: &str, item: &Value) -> Vec<Result<AwsVpc, Unmappable>> {
    vec![decode::<RawVpc>(item).and_then(|raw| {
        Ok(AwsVpc {
            vpc_id: required(&raw.vpc_id, "VpcId")?,
            account_id: account_id.to_string(),
            region: region.to_string(),
            name: tag(&raw.tags, "Name"),
            cidr_block: raw.cidr_block,
            state: raw.state,
            is_default: raw.is_default,
        })
    })]
}

/// 一个 reservation 包含多个实例；同一实例可能出现在多个 reservation 页面中
pub fn instances(
    account_id: &str,
    region: &str,
    reservation: &Value,
) -> Vec<Result<AwsInstance, Unmappable>> {
    let reservation: RawReservation = match decode(reservation) {
        Ok(raw) => raw,
        Err(e) => return vec![Err(e)],
    };
    reservation
        .instances
        .iter()
        .map(|item| {
            let raw: RawInstance = decode(item)?;
            Ok(AwsInstance {
                instance_id: required(&raw.instance_id, "InstanceId")?,
                account_id: account_id.to_string(),
                region: region.to_string(),
                vpc_id: raw.vpc_id,
                name: tag(&raw.tags, "Name"),
                instance_type: raw.instance_type,
                state: raw.state.name,
                image_id: raw.image_id,
                launch_time: raw.launch_time,
            })
        })
        .collect()
}
