//! 关系表定义
//!
//! owner 表与 owned 表按列对连接；`join_on` 中的列对为 (owner列, owned列)。
//! 关系表只保存两侧的代理键 `id`。

use inventory_core::models::LinkSpec;

pub const SHOOT_TO_PROJECT: LinkSpec = LinkSpec {
    name: "shoot_to_project",
    link_table: "g_shoot_to_project",
    owner_table: "g_shoot",
    owner_id_column: "shoot_id",
    owned_table: "g_project",
    owned_id_column: "project_id",
    join_on: &[("project_name", "name")],
};

pub const SHOOT_TO_SEED: LinkSpec = LinkSpec {
    name: "shoot_to_seed",
    link_table: "g_shoot_to_seed",
    owner_table: "g_shoot",
    owner_id_column: "shoot_id",
    owned_table: "g_seed",
    owned_id_column: "seed_id",
    join_on: &[("seed_name", "name")],
};

pub const INSTANCE_TO_VPC: LinkSpec = LinkSpec {
    name: "instance_to_vpc",
    link_table: "aws_instance_to_vpc",
    owner_table: "aws_instance",
    owner_id_column: "aws_instance_id",
    owned_table: "aws_vpc",
    owned_id_column: "aws_vpc_id",
    join_on: &[("vpc_id", "vpc_id"), ("account_id", "account_id")],
};

pub const VPC_TO_REGION: LinkSpec = LinkSpec {
    name: "vpc_to_region",
    link_table: "aws_vpc_to_region",
    owner_table: "aws_vpc",
    owner_id_column: "aws_vpc_id",
    owned_table: "aws_region",
    owned_id_column: "aws_region_id",
    join_on: &[("region", "name"), ("account_id", "account_id")],
};

pub const GARDENER_LINKS: &[LinkSpec] = &[SHOOT_TO_PROJECT, SHOOT_TO_SEED];
pub const AWS_LINKS: &[LinkSpec] = &[INSTANCE_TO_VPC, VPC_TO_REGION];
