//! AWS extraction rules

use super::attrs::{first_block, get_blocks, get_decimal, get_str, Attributes};
use super::{
    add_disk, apply_machine_type, base_specs, ExtractContext, Extraction, ExtractorRegistry,
    ResourceExtractor,
};
use crate::resources::Provider;

const DEFAULT_VOLUME_TYPE: &str = "gp2";

pub fn register(registry: &mut ExtractorRegistry) {
    registry.register(Provider::Aws, "aws_instance", Instance);
    registry.register(Provider::Aws, "aws_ebs_volume", EbsVolume);
}

/// `aws_instance` with its root and inline EBS volumes
pub struct Instance;

impl ResourceExtractor for Instance {
    fn extract(
        &self,
        provider: &Provider,
        values: &Attributes,
        ctx: &ExtractContext<'_>,
    ) -> Extraction {
        let mut specs = base_specs(provider, ctx);
        apply_machine_type(&mut specs, provider, get_str(values, "instance_type"), ctx);

        let volumes = first_block(values, "root_block_device")
            .into_iter()
            .chain(get_blocks(values, "ebs_block_device"));
        for volume in volumes {
            let volume_type = get_str(volume, "volume_type").unwrap_or(DEFAULT_VOLUME_TYPE);
            add_disk(
                &mut specs,
                provider,
                volume_type,
                get_decimal(volume, "volume_size"),
                ctx,
            );
        }

        Extraction::single(specs)
    }
}

/// `aws_ebs_volume`
pub struct EbsVolume;

impl ResourceExtractor for EbsVolume {
    fn extract(
        &self,
        provider: &Provider,
        values: &Attributes,
        ctx: &ExtractContext<'_>,
    ) -> Extraction {
        let mut specs = base_specs(provider, ctx);
        let volume_type = get_str(values, "type").unwrap_or(DEFAULT_VOLUME_TYPE);
        add_disk(&mut specs, provider, volume_type, get_decimal(values, "size"), ctx);
        Extraction::single(specs)
    }
}
