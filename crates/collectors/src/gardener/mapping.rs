//! Gardener 原始对象到行类型的映射

use serde::Deserialize;
use serde_json::Value;

use inventory_domain::{CloudProfileImage, Project, Seed, Shoot};

use crate::raw::{decode, nullable, required, trimmed, Unmappable};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Metadata {
    #[serde(deserialize_with = "trimmed")]
    name: String,
    #[serde(deserialize_with = "trimmed")]
    namespace: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Named {
    #[serde(deserialize_with = "trimmed")]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawProject {
    #[serde(deserialize_with = "nullable")]
    metadata: Metadata,
    #[serde(deserialize_with = "nullable")]
    spec: ProjectSpec,
    #[serde(deserialize_with = "nullable")]
    status: PhaseStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProjectSpec {
    #[serde(deserialize_with = "trimmed")]
    namespace: String,
    #[serde(deserialize_with = "trimmed")]
    purpose: String,
    #[serde(deserialize_with = "nullable")]
    owner: Named,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PhaseStatus {
    #[serde(deserialize_with = "trimmed")]
    phase: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSeed {
    #[serde(deserialize_with = "nullable")]
    metadata: Metadata,
    #[serde(deserialize_with = "nullable")]
    status: SeedStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SeedStatus {
    #[serde(deserialize_with = "trimmed")]
    kubernetes_version: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawShoot {
    #[serde(deserialize_with = "nullable")]
    metadata: Metadata,
    #[serde(deserialize_with = "nullable")]
    spec: ShootSpec,
    #[serde(deserialize_with = "nullable")]
    status: ShootStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ShootSpec {
    #[serde(deserialize_with = "trimmed")]
    seed_name: String,
    #[serde(deserialize_with = "trimmed")]
    cloud_profile_name: String,
    #[serde(deserialize_with = "trimmed")]
    region: String,
    #[serde(deserialize_with = "nullable")]
    kubernetes: KubernetesSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct KubernetesSpec {
    #[serde(deserialize_with = "trimmed")]
    version: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ShootStatus {
    #[serde(rename = "technicalID", deserialize_with = "trimmed")]
    technical_id: String,
    #[serde(deserialize_with = "nullable")]
    last_operation: LastOperation,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LastOperation {
    #[serde(deserialize_with = "trimmed")]
    state: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCloudProfile {
    #[serde(deserialize_with = "nullable")]
    spec: CloudProfileSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CloudProfileSpec {
    #[serde(deserialize_with = "nullable")]
    provider_config: ProviderConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProviderConfig {
    #[serde(deserialize_with = "nullable")]
    machine_images: Vec<MachineImage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MachineImage {
    #[serde(deserialize_with = "trimmed")]
    name: String,
    #[serde(deserialize_with = "nullable")]
    versions: Vec<MachineImageVersion>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MachineImageVersion {
    #[serde(deserialize_with = "trimmed")]
    version: String,
    #[serde(deserialize_with = "nullable")]
    regions: Vec<ImageRegion>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImageRegion {
    #[serde(deserialize_with = "trimmed")]
    name: String,
    #[serde(deserialize_with = "trimmed")]
    ami: String,
}

pub fn project(item: &Value) -> Vec<Result<Project, Unmappable>> {
    vec![project_row(item)]
}

fn project_row(item: &Value) -> Result<Project, Unmappable> {
    let raw: RawProject = decode(item)?;
    Ok(Project {
        name: required(&raw.metadata.name, "metadata.name")?,
        namespace: raw.spec.namespace,
        status: raw.status.phase,
        purpose: raw.spec.purpose,
        owner: raw.spec.owner.name,
    })
}

pub fn seed(item: &Value) -> Vec<Result<Seed, Unmappable>> {
    vec![seed_row(item)]
}

fn seed_row(item: &Value) -> Result<Seed, Unmappable> {
    let raw: RawSeed = decode(item)?;
    Ok(Seed {
        name: required(&raw.metadata.name, "metadata.name")?,
        kubernetes_version: raw.status.kubernetes_version,
    })
}

pub fn shoot(project: &str, item: &Value) -> Vec<Result<Shoot, Unmappable>> {
    vec![shoot_row(project, item)]
}

fn shoot_row(project: &str, item: &Value) -> Result<Shoot, Unmappable> {
    let raw: RawShoot = decode(item)?;
    Ok(Shoot {
        name: required(&raw.metadata.name, "metadata.name")?,
        namespace: required(&raw.metadata.namespace, "metadata.namespace")?,
        technical_id: raw.status.technical_id,
        project_name: project.to_string(),
        seed_name: raw.spec.seed_name,
        cloud_profile: raw.spec.cloud_profile_name,
        region: raw.spec.region,
        kubernetes_version: raw.spec.kubernetes.version,
        status: raw.status.last_operation.state,
    })
}

/// 云配置的 `machineImages[].versions[].regions[]` 展开为每个区域一行
pub fn cloud_profile_images(
    cloud_profile: &str,
    item: &Value,
) -> Vec<Result<CloudProfileImage, Unmappable>> {
    let raw: RawCloudProfile = match decode(item) {
        Ok(raw) => raw,
        Err(e) => return vec![Err(e)],
    };

    let mut rows = Vec::new();
    for image in raw.spec.provider_config.machine_images {
        let name = match required(&image.name, "name") {
            Ok(name) => name,
            Err(e) => {
                rows.push(Err(e));
                continue;
            }
        };
        for version in image.versions {
            let version_name = match required(&version.version, "version") {
                Ok(v) => v,
                Err(e) => {
                    rows.push(Err(e));
                    continue;
                }
            };
            for region in version.regions {
                rows.push(required(&region.name, "regions.name").map(|region_name| {
                    CloudProfileImage {
                        name: name.clone(),
                        version: version_name.clone(),
                        region: region_name,
                        cloud_profile: cloud_profile.to_string(),
                        ami: region.ami,
                    }
                }));
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shoot_requires_name_and_namespace() {
        let ok = shoot("dev", &json!({"metadata": {"name": "s1", "namespace": "garden-dev"}}));
        assert_eq!(ok[0].as_ref().unwrap().project_name, "dev");

        let missing = shoot("dev", &json!({"metadata": {"name": "s1"}}));
        assert_eq!(missing[0], Err(Unmappable::MissingField("metadata.namespace")));

        let blank = shoot("dev", &json!({"metadata": {"name": " ", "namespace": "garden-dev"}}));
        assert_eq!(blank[0], Err(Unmappable::MissingField("metadata.name")));
    }

    #[test]
    fn test_shoot_fields_from_nested_objects() {
        let rows = shoot(
            "dev",
            &json!({
                "metadata": {"name": "s1", "namespace": "garden-dev"},
                "spec": {"seedName": "aws-eu1", "cloudProfileName": "aws", "region": "eu-west-1",
                         "kubernetes": {"version": "1.30.2"}},
                "status": {"technicalID": "shoot--dev--s1", "lastOperation": null}
            }),
        );
        let row = rows[0].as_ref().unwrap();
        assert_eq!(row.technical_id, "shoot--dev--s1");
        assert_eq!(row.seed_name, "aws-eu1");
        assert_eq!(row.kubernetes_version, "1.30.2");
        assert_eq!(row.status, "");
    }

    #[test]
    fn test_project_owner_and_malformed_record() {
        let rows = project(&json!({
            "metadata": {"name": "dev"},
            "spec": {"namespace": "garden-dev", "owner": {"kind": "User", "name": "alice"}},
            "status": {"phase": "Ready"}
        }));
        let row = rows[0].as_ref().unwrap();
        assert_eq!((row.owner.as_str(), row.status.as_str()), ("alice", "Ready"));

        let rows = project(&json!({"metadata": {"name": "dev"}, "spec": {"purpose": 7}}));
        assert!(matches!(rows[0], Err(Unmappable::Malformed(_))));
    }

    #[test]
    fn test_cloud_profile_images_flatten_regions() {
        let profile = json!({
            "metadata": {"name": "aws"},
            "spec": {"providerConfig": {"machineImages": [
                {"name": "gardenlinux", "versions": [
                    {"version": "1312.3.0", "regions": [
                        {"name": "eu-west-1", "ami": "ami-1"},
                        {"name": "us-east-1", "ami": "ami-2"}
                    ]},
                    {"regions": [{"name": "eu-west-1", "ami": "ami-3"}]}
                ]}
            ]}}
        });
        let rows = cloud_profile_images("aws", &profile);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.iter().filter(|r| r.is_ok()).count(), 2);
        assert_eq!(rows[1].as_ref().unwrap().ami, "ami-2");
        assert_eq!(rows[2], Err(Unmappable::MissingField("version")));
    }
}
