//! Google Cloud extraction rules

use rust_decimal::Decimal;

use super::attrs::{
    first_block, first_list_str, get_blocks, get_decimal, get_str, get_u32, list_len,
    zone_to_region, Attributes,
};
use super::{
    add_disk, apply_accelerators, apply_machine_type, base_specs, ExtractContext, Extraction,
    ExtractorRegistry, ResourceExtractor,
};
use crate::resources::Provider;

/// Size of one local SSD partition
const LOCAL_SSD_SIZE_GB: i64 = 375;
const DEFAULT_DISK_TYPE: &str = "pd-standard";
const DEFAULT_NODE_DISK_TYPE: &str = "pd-balanced";
const DEFAULT_NODE_MACHINE_TYPE: &str = "e2-medium";
const DEFAULT_SQL_DISK_TYPE: &str = "PD_SSD";
const DEFAULT_SQL_DISK_SIZE_GB: i64 = 10;
/// Regional persistent disks are always synchronously replicated across two zones
const REGIONAL_DISK_REPLICAS: u32 = 2;

pub fn register(registry: &mut ExtractorRegistry) {
    registry.register(Provider::Gcp, "google_compute_instance", ComputeInstance);
    registry.register(Provider::Gcp, "google_compute_disk", ComputeDisk);
    registry.register(Provider::Gcp, "google_compute_region_disk", RegionDisk);
    registry.register(Provider::Gcp, "google_container_node_pool", ContainerNodePool);
    registry.register(Provider::Gcp, "google_sql_database_instance", SqlDatabaseInstance);
}

/// `google_compute_instance`
pub struct ComputeInstance;

impl ResourceExtractor for ComputeInstance {
    fn extract(
        &self,
        provider: &Provider,
        values: &Attributes,
        ctx: &ExtractContext<'_>,
    ) -> Extraction {
        let mut specs = base_specs(provider, ctx);
        apply_machine_type(&mut specs, provider, get_str(values, "machine_type"), ctx);
        apply_accelerators(&mut specs, values, "guest_accelerator");
        specs.cpu_type = get_str(values, "min_cpu_platform")
            .or_else(|| get_str(values, "cpu_platform"))
            .map(str::to_string);

        for boot_disk in get_blocks(values, "boot_disk") {
            let params = first_block(boot_disk, "initialize_params");
            let disk_type = params
                .and_then(|p| get_str(p, "type"))
                .unwrap_or(DEFAULT_DISK_TYPE);
            let size = params.and_then(|p| get_decimal(p, "size"));
            add_disk(&mut specs, provider, disk_type, size, ctx);
        }

        for scratch in get_blocks(values, "scratch_disk") {
            specs.ssd_storage +=
                get_decimal(scratch, "size").unwrap_or_else(|| Decimal::from(LOCAL_SSD_SIZE_GB));
        }

        Extraction::single(specs)
    }
}

/// `google_compute_disk` (zonal)
pub struct ComputeDisk;

impl ResourceExtractor for ComputeDisk {
    fn extract(
        &self,
        provider: &Provider,
        values: &Attributes,
        ctx: &ExtractContext<'_>,
    ) -> Extraction {
        let mut specs = base_specs(provider, ctx);
        let disk_type = get_str(values, "type").unwrap_or(DEFAULT_DISK_TYPE);
        add_disk(&mut specs, provider, disk_type, get_decimal(values, "size"), ctx);
        Extraction::single(specs)
    }
}

/// `google_compute_region_disk`, replicated across its replica zones
pub struct RegionDisk;

impl ResourceExtractor for RegionDisk {
    fn extract(
        &self,
        provider: &Provider,
        values: &Attributes,
        ctx: &ExtractContext<'_>,
    ) -> Extraction {
        let mut extraction = ComputeDisk.extract(provider, values, ctx);
        if get_str(values, "region").is_none() {
            extraction.region =
                first_list_str(values, "replica_zones").map(|zone| zone_to_region(provider, zone));
        }
        extraction.replication_factor = match list_len(values, "replica_zones") {
            0 => REGIONAL_DISK_REPLICAS,
            zones => u32::try_from(zones).unwrap_or(u32::MAX),
        };
        extraction
    }
}

/// `google_container_node_pool`: `node_count` identical nodes
pub struct ContainerNodePool;

impl ResourceExtractor for ContainerNodePool {
    fn extract(
        &self,
        provider: &Provider,
        values: &Attributes,
        ctx: &ExtractContext<'_>,
    ) -> Extraction {
        let mut specs = base_specs(provider, ctx);
        let empty = Attributes::new();
        let node_config = first_block(values, "node_config").unwrap_or(&empty);

        apply_machine_type(
            &mut specs,
            provider,
            Some(get_str(node_config, "machine_type").unwrap_or(DEFAULT_NODE_MACHINE_TYPE)),
            ctx,
        );
        apply_accelerators(&mut specs, node_config, "guest_accelerator");
        specs.cpu_type = get_str(node_config, "min_cpu_platform").map(str::to_string);

        let disk_type = get_str(node_config, "disk_type").unwrap_or(DEFAULT_NODE_DISK_TYPE);
        add_disk(
            &mut specs,
            provider,
            disk_type,
            get_decimal(node_config, "disk_size_gb"),
            ctx,
        );
        if let Some(local_ssds) = get_u32(node_config, "local_ssd_count") {
            specs.ssd_storage += Decimal::from(local_ssds) * Decimal::from(LOCAL_SSD_SIZE_GB);
        }

        let count = get_u32(values, "node_count")
            .or_else(|| get_u32(values, "initial_node_count"))
            .unwrap_or(1);

        Extraction {
            count,
            ..Extraction::single(specs)
        }
    }
}

/// `google_sql_database_instance`; high-availability instances keep a standby
pub struct SqlDatabaseInstance;

impl ResourceExtractor for SqlDatabaseInstance {
    fn extract(
        &self,
        provider: &Provider,
        values: &Attributes,
        ctx: &ExtractContext<'_>,
    ) -> Extraction {
        let mut specs = base_specs(provider, ctx);
        let empty = Attributes::new();
        let settings = first_block(values, "settings").unwrap_or(&empty);

        apply_machine_type(&mut specs, provider, get_str(settings, "tier"), ctx);
        let disk_type = get_str(settings, "disk_type").unwrap_or(DEFAULT_SQL_DISK_TYPE);
        let size = get_decimal(settings, "disk_size")
            .unwrap_or_else(|| Decimal::from(DEFAULT_SQL_DISK_SIZE_GB));
        add_disk(&mut specs, provider, disk_type, Some(size), ctx);

        let replication_factor = match get_str(settings, "availability_type") {
            Some("REGIONAL") => 2,
            _ => 1,
        };

        Extraction {
            replication_factor,
            ..Extraction::single(specs)
        }
    }
}
