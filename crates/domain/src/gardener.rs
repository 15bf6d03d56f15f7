//! Gardener 资源：项目、Seed 集群、Shoot 集群以及云配置中的机器镜像

use inventory_core::models::{ColumnValue, Record};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Project {
    pub name: String,
    pub namespace: String,
    pub status: String,
    pub purpose: String,
    pub owner: String,
}

impl Record for Project {
    const TABLE: &'static str = "g_project";
    const KEY_COLUMNS: &'static [&'static str] = &["name"];
    const COLUMNS: &'static [&'static str] = &["name", "namespace", "status", "purpose", "owner"];
    type Key = String;

    fn natural_key(&self) -> Self::Key {
        self.name.clone()
    }

    fn values(&self) -> Vec<ColumnValue> {
        vec![
            ColumnValue::text(&self.name),
            ColumnValue::text(&self.namespace),
            ColumnValue::text(&self.status),
            ColumnValue::text(&self.purpose),
            ColumnValue::text(&self.owner),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Seed {
    pub name: String,
    pub kubernetes_version: String,
}

impl Record for Seed {
    const TABLE: &'static str = "g_seed";
    const KEY_COLUMNS: &'static [&'static str] = &["name"];
    const COLUMNS: &'static [&'static str] = &["name", "kubernetes_version"];
    type Key = String;

    fn natural_key(&self) -> Self::Key {
        self.name.clone()
    }

    fn values(&self) -> Vec<ColumnValue> {
        vec![
            ColumnValue::text(&self.name),
            ColumnValue::text(&self.kubernetes_version),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Shoot {
    pub name: String,
    pub namespace: String,
    pub technical_id: String,
    pub project_name: String,
    pub seed_name: String,
    pub cloud_profile: String,
    pub region: String,
    pub kubernetes_version: String,
    pub status: String,
}

impl Record for Shoot {
    const TABLE: &'static str = "g_shoot";
    const KEY_COLUMNS: &'static [&'static str] = &["name", "namespace"];
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "namespace",
        "technical_id",
        "project_name",
        "seed_name",
        "cloud_profile",
        "region",
        "kubernetes_version",
        "status",
    ];
    type Key = (String, String);

    fn natural_key(&self) -> Self::Key {
        (self.name.clone(), self.namespace.clone())
    }

    fn values(&self) -> Vec<ColumnValue> {
        vec![
            ColumnValue::text(&self.name),
            ColumnValue::text(&self.namespace),
            ColumnValue::text(&self.technical_id),
            ColumnValue::text(&self.project_name),
            ColumnValue::text(&self.seed_name),
            ColumnValue::text(&self.cloud_profile),
            ColumnValue::text(&self.region),
            ColumnValue::text(&self.kubernetes_version),
            ColumnValue::text(&self.status),
        ]
    }
}

/// 云配置中发布的机器镜像，同一镜像版本在每个区域有独立的 AMI
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CloudProfileImage {
    pub name: String,
    pub version: String,
    pub region: String,
    pub cloud_profile: String,
    pub ami: String,
}

impl Record for CloudProfileImage {
    const TABLE: &'static str = "g_cloud_profile_image";
    const KEY_COLUMNS: &'static [&'static str] = &["name", "version", "region", "cloud_profile"];
    const COLUMNS: &'static [&'static str] = &["name", "version", "region", "cloud_profile", "ami"];
    type Key = (String, String, String, String);

    fn natural_key(&self) -> Self::Key {
        (
            self.name.clone(),
            self.version.clone(),
            self.region.clone(),
            self.cloud_profile.clone(),
        )
    }

    fn values(&self) -> Vec<ColumnValue> {
        vec![
            ColumnValue::text(&self.name),
            ColumnValue::text(&self.version),
            ColumnValue::text(&self.region),
            ColumnValue::text(&self.cloud_profile),
            ColumnValue::text(&self.ami),
        ]
    }
}
