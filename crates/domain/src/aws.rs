//! AWS 资源：区域、VPC 和 EC2 实例。所有资源都以账号ID作为自然键的一部分。

use chrono::{DateTime, Utc};
use inventory_core::models::{ColumnValue, Record};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AwsRegion {
    pub name: String,
    pub account_id: String,
    pub endpoint: String,
    pub opt_in_status: String,
}

impl Record for AwsRegion {
    const TABLE: &'static str = "aws_region";
    const KEY_COLUMNS: &'static [&'static str] = &["name", "account_id"];
    const COLUMNS: &'static [&'static str] = &["name", "account_id", "endpoint", "opt_in_status"];
    type Key = (String, String);

    fn natural_key(&self) -> Self::Key {
        (self.name.clone(), self.account_id.clone())
    }

    fn values(&self) -> Vec<ColumnValue> {
        vec![
            ColumnValue::text(&self.name),
            ColumnValue::text(&self.account_id),
            ColumnValue::text(&self.endpoint),
            ColumnValue::text(&self.opt_in_status),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AwsVpc {
    pub vpc_id: String,
    pub account_id: String,
    pub region: String,
    pub name: String,
    pub cidr_block: String,
    pub state: String,
    pub is_default: bool,
}

impl Record for AwsVpc {
    const TABLE: &'static str = "aws_vpc";
    const KEY_COLUMNS: &'static [&'static str] = &["vpc_id", "account_id"];
    const COLUMNS: &'static [&'static str] = &[
        "vpc_id",
        "account_id",
        "region",
        "name",
        "cidr_block",
        "state",
        "is_default",
    ];
    type Key = (String, String);

    fn natural_key(&self) -> Self::Key {
        (self.vpc_id.clone(), self.account_id.clone())
    }

    fn values(&self) -> Vec<ColumnValue> {
        vec![
            ColumnValue::text(&self.vpc_id),
            ColumnValue::text(&self.account_id),
            ColumnValue::text(&self.region),
            ColumnValue::text(&self.name),
            ColumnValue::text(&self.cidr_block),
            ColumnValue::text(&self.state),
            ColumnValue::bool(self.is_default),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AwsInstance {
    pub instance_id: String,
    pub account_id: String,
    pub region: String,
    pub vpc_id: String,
    pub name: String,
    pub instance_type: String,
    pub state: String,
    pub image_id: String,
    pub launch_time: Option<DateTime<Utc>>,
}

impl Record for AwsInstance {
    const TABLE: &'static str = "aws_instance";
    const KEY_COLUMNS: &'static [&'static str] = &["instance_id", "account_id"];
    const COLUMNS: &'static [&'static str] = &[
        "instance_id",
        "account_id",
        "region",
        "vpc_id",
        "name",
        "instance_type",
        "state",
        "image_id",
        "launch_time",
    ];
    type Key = (String, String);

    fn natural_key(&self) -> Self::Key {
        (self.instance_id.clone(), self.account_id.clone())
    }

    fn values(&self) -> Vec<ColumnValue> {
        vec![
            ColumnValue::text(&self.instance_id),
            ColumnValue::text(&self.account_id),
            ColumnValue::text(&self.region),
            ColumnValue::text(&self.vpc_id),
            ColumnValue::text(&self.name),
            ColumnValue::text(&self.instance_type),
            ColumnValue::text(&self.state),
            ColumnValue::text(&self.image_id),
            ColumnValue::timestamp(self.launch_time),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_launch_time_nullable() {
        let instance = AwsInstance {
            instance_id: "i-1".into(),
            account_id: "111".into(),
            region: "eu-west-1".into(),
            vpc_id: "vpc-1".into(),
            name: String::new(),
            instance_type: "m5.large".into(),
            state: "running".into(),
            image_id: "ami-1".into(),
            launch_time: None,
        };
        let values = instance.values();
        assert_eq!(values.len(), AwsInstance::COLUMNS.len());
        assert!(values[8].is_null());
    }
}
