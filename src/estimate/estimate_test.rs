//! Tests for the estimation engine and aggregation

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::carbon_aware::ForecastOverride;
    use crate::coefficients::{
        CoefficientTables, EnergyCoefficients, GpuCoefficient, RegionEmission,
        StaticCoefficients,
    };
    use crate::config::EstimationConfig;
    use crate::error::Error;
    use crate::estimate::{
        estimate_resources, estimate_supported_resource, estimate_watt_hour, EstimationContext,
        IntensitySource,
    };
    use crate::resources::{
        ComputeResource, ComputeResourceSpecs, Provider, Resource, ResourceIdentification,
        UnsupportedResource,
    };
    use crate::units::{CarbonUnit, TimeUnit};

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Round-number tables: 1..3 W per vCPU, 0.5 W per GB of memory,
    /// 0.001 / 0.002 W per GB of HDD / SSD, PUE 1
    fn test_coefficients() -> StaticCoefficients {
        let mut tables = CoefficientTables::default();
        tables.energy.insert(
            "gcp".to_string(),
            EnergyCoefficients {
                cpu_min_wh: dec!(1),
                cpu_max_wh: dec!(3),
                memory_wh_gb: dec!(0.5),
                storage_hdd_wh_tb: dec!(1.024),
                storage_ssd_wh_tb: dec!(2.048),
                pue_average: dec!(1),
            },
        );
        tables.gpu_watts.insert(
            "g1".to_string(),
            GpuCoefficient {
                min_watts: dec!(10),
                max_watts: dec!(30),
            },
        );
        let regions: HashMap<String, RegionEmission> = [
            ("europe-west9", dec!(500)),
            ("us-central1", dec!(200)),
        ]
        .into_iter()
        .map(|(region, intensity)| {
            (
                region.to_string(),
                RegionEmission {
                    location: String::new(),
                    grid_carbon_intensity: intensity,
                },
            )
        })
        .collect();
        tables.region_intensity.insert("gcp".to_string(), regions);
        StaticCoefficients::new(tables)
    }

    fn compute(name: &str, region: &str, specs: ComputeResourceSpecs) -> ComputeResource {
        ComputeResource {
            identification: ResourceIdentification {
                module: None,
                name: name.to_string(),
                resource_type: "google_compute_instance".to_string(),
                provider: Provider::Gcp,
                region: region.to_string(),
                count: 1,
                replication_factor: 1,
            },
            specs,
        }
    }

    /// 2 vCPU at 50% (4 W) + 2 GB memory (1 W) + 1000 GB HDD (1 W) = 6 W
    fn six_watt_vm(name: &str, region: &str) -> ComputeResource {
        compute(
            name,
            region,
            ComputeResourceSpecs {
                vcpus: 2,
                memory_mb: 2048,
                hdd_storage: dec!(1000),
                average_cpu_usage: dec!(0.5),
                average_gpu_usage: dec!(0.5),
                ..Default::default()
            },
        )
    }

    fn context<'a>(
        config: &'a EstimationConfig,
        coefficients: &'a StaticCoefficients,
        forecast: Option<&'a ForecastOverride>,
    ) -> EstimationContext<'a> {
        EstimationContext {
            config,
            coefficients,
            forecast,
        }
    }

    // -----------------------------------------------------------------------
    // Power model
    // -----------------------------------------------------------------------

    #[test]
    fn test_linear_power_model() {
        let coefficients = test_coefficients();
        let power = estimate_watt_hour(&six_watt_vm("vm", "europe-west9"), &coefficients).unwrap();
        assert_eq!(power, dec!(6));
    }

    #[test]
    fn test_gpu_power_and_unknown_gpu() {
        let coefficients = test_coefficients();
        let specs = ComputeResourceSpecs {
            gpu_types: vec!["g1".into(), "g1".into(), "unknown".into()],
            average_gpu_usage: dec!(0.5),
            ..Default::default()
        };
        let power = estimate_watt_hour(&compute("gpu", "europe-west9", specs), &coefficients).unwrap();
        // 2 × (10 + 0.5 × 20); the unknown GPU contributes nothing
        assert_eq!(power, dec!(40));
    }

    #[test]
    fn test_ssd_storage_power() {
        let coefficients = test_coefficients();
        let specs = ComputeResourceSpecs {
            ssd_storage: dec!(100),
            ..Default::default()
        };
        let power = estimate_watt_hour(&compute("ssd", "europe-west9", specs), &coefficients).unwrap();
        assert_eq!(power, dec!(0.2));
    }

    #[test]
    fn test_embedded_coefficients_for_n2_standard_2() {
        let coefficients = StaticCoefficients::embedded().unwrap();
        let config = EstimationConfig::default();
        let vm = compute(
            "n2",
            "europe-west9",
            ComputeResourceSpecs {
                vcpus: 2,
                memory_mb: 8192,
                average_cpu_usage: dec!(0.5),
                average_gpu_usage: dec!(0.5),
                ..Default::default()
            },
        );

        let estimation =
            estimate_supported_resource(&vm, &context(&config, &coefficients, None)).unwrap();
        // (2 × (0.71 + 0.5 × 3.55) + 8 × 0.392) × 1.1
        assert_eq!(estimation.power, dec!(8.9166));
        // × 59 gCO2eq/kWh
        assert_eq!(estimation.carbon_emissions, dec!(0.5260794));
        assert_eq!(estimation.average_cpu_usage, dec!(0.5));
    }

    #[test]
    fn test_provider_without_energy_coefficients_draws_nothing() {
        let coefficients = test_coefficients();
        let mut vm = six_watt_vm("vm", "eastus");
        vm.identification.provider = Provider::Other("azurerm".to_string());
        assert_eq!(estimate_watt_hour(&vm, &coefficients).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_power_is_floored_to_ten_digits() {
        let coefficients = test_coefficients();
        let specs = ComputeResourceSpecs {
            memory_mb: 1,
            ..Default::default()
        };
        // 1/1024 GB × 0.5 W = 0.00048828125
        let power = estimate_watt_hour(&compute("tiny", "europe-west9", specs), &coefficients).unwrap();
        assert_eq!(power, dec!(0.0004882812));
    }

    // -----------------------------------------------------------------------
    // Units
    // -----------------------------------------------------------------------

    #[test]
    fn test_time_and_mass_units() {
        let coefficients = test_coefficients();
        let vm = six_watt_vm("vm", "europe-west9");

        // 6 W × 0.5 gCO2eq/Wh = 3 gCO2eq per hour
        let cases = [
            (TimeUnit::Hour, CarbonUnit::Gram, dec!(3)),
            (TimeUnit::Day, CarbonUnit::Gram, dec!(72)),
            (TimeUnit::Month, CarbonUnit::Gram, dec!(2160)),
            (TimeUnit::Year, CarbonUnit::Gram, dec!(26280)),
            (TimeUnit::Hour, CarbonUnit::Kilogram, dec!(0.003)),
            (TimeUnit::Day, CarbonUnit::Kilogram, dec!(0.072)),
            (TimeUnit::Month, CarbonUnit::Kilogram, dec!(2.16)),
            (TimeUnit::Year, CarbonUnit::Kilogram, dec!(26.28)),
        ];

        for (time, carbon, expected) in cases {
            let mut config = EstimationConfig::default();
            config.unit.time = time;
            config.unit.carbon = carbon;
            let estimation =
                estimate_supported_resource(&vm, &context(&config, &coefficients, None)).unwrap();
            assert_eq!(
                estimation.carbon_emissions, expected,
                "emissions per {} in {}",
                time, carbon
            );
            // Power is an hourly average whatever the report unit
            assert_eq!(estimation.power, dec!(6));
        }
    }

    // -----------------------------------------------------------------------
    // Carbon intensity source
    // -----------------------------------------------------------------------

    #[test]
    fn test_forecast_applies_only_to_matching_region() {
        let coefficients = test_coefficients();
        let config = EstimationConfig::default();
        let forecast = ForecastOverride {
            average_intensity: dec!(1.5),
            region: "europe-west9".to_string(),
        };
        let ctx = context(&config, &coefficients, Some(&forecast));

        let in_region =
            estimate_supported_resource(&six_watt_vm("paris", "europe-west9"), &ctx).unwrap();
        let out_of_region =
            estimate_supported_resource(&six_watt_vm("iowa", "us-central1"), &ctx).unwrap();

        assert_eq!(in_region.intensity_source, IntensitySource::Forecast);
        assert_eq!(in_region.carbon_intensity, dec!(1.5));
        assert_eq!(in_region.carbon_emissions, dec!(9));

        assert_eq!(out_of_region.intensity_source, IntensitySource::Static);
        assert_eq!(out_of_region.carbon_intensity, dec!(0.2));
        assert_eq!(out_of_region.carbon_emissions, dec!(1.2));
    }

    #[test]
    fn test_forecast_covers_region_missing_from_static_table() {
        let coefficients = test_coefficients();
        let config = EstimationConfig::default();
        let forecast = ForecastOverride {
            average_intensity: dec!(0.1),
            region: "asia-east1".to_string(),
        };
        let estimation = estimate_supported_resource(
            &six_watt_vm("taipei", "asia-east1"),
            &context(&config, &coefficients, Some(&forecast)),
        )
        .unwrap();
        assert_eq!(estimation.carbon_emissions, dec!(0.6));
    }

    #[test]
    fn test_missing_region_intensity_is_fatal() {
        let coefficients = test_coefficients();
        let config = EstimationConfig::default();
        let err = estimate_supported_resource(
            &six_watt_vm("lost", "mars-north1"),
            &context(&config, &coefficients, None),
        )
        .unwrap_err();

        match err {
            Error::MissingRegionIntensity {
                address, region, ..
            } => {
                assert_eq!(address, "gcp/google_compute_instance.lost");
                assert_eq!(region, "mars-north1");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    // -----------------------------------------------------------------------
    // Aggregation
    // -----------------------------------------------------------------------

    #[test]
    fn test_totals_are_count_weighted_and_skip_unsupported() {
        let coefficients = test_coefficients();
        let config = EstimationConfig::default();

        let mut pool = six_watt_vm("pool", "europe-west9");
        pool.identification.count = 3;
        let mut disk = compute(
            "disk",
            "us-central1",
            ComputeResourceSpecs {
                ssd_storage: dec!(100),
                ..Default::default()
            },
        );
        disk.identification.resource_type = "google_compute_region_disk".to_string();
        disk.identification.replication_factor = 2;
        let network = UnsupportedResource {
            identification: ResourceIdentification {
                module: None,
                name: "vpc".to_string(),
                resource_type: "google_compute_network".to_string(),
                provider: Provider::Gcp,
                region: String::new(),
                count: 1,
                replication_factor: 1,
            },
        };

        let resources = vec![
            Resource::Compute(pool),
            Resource::Unsupported(network),
            Resource::Compute(disk),
        ];
        let report =
            estimate_resources(&resources, &context(&config, &coefficients, None)).unwrap();

        assert_eq!(report.resources.len(), 2);
        assert_eq!(report.unsupported_resources.len(), 1);
        // 6 W × 3 + 0.2 W × 2
        assert_eq!(report.total.power, dec!(18.4));
        // 3 g × 3 + 0.04 g × 2
        assert_eq!(report.total.carbon_emissions, dec!(9.08));
        assert_eq!(report.total.resources_count, 5);

        // Per-resource figures stay per instance
        let pool = report
            .resources
            .iter()
            .find(|r| r.resource.identification.name == "pool")
            .unwrap();
        assert_eq!(pool.power, dec!(6));
        assert_eq!(pool.total_count, 3);

        for estimation in &report.resources {
            assert!(estimation.power >= Decimal::ZERO);
            assert!(estimation.carbon_emissions >= Decimal::ZERO);
        }
    }

    #[test]
    fn test_report_order_does_not_depend_on_input_order() {
        let coefficients = test_coefficients();
        let config = EstimationConfig::default();
        let ctx = context(&config, &coefficients, None);

        let a = Resource::Compute(six_watt_vm("a", "europe-west9"));
        let b = Resource::Compute(six_watt_vm("b", "us-central1"));

        let forward = estimate_resources(&[a.clone(), b.clone()], &ctx).unwrap();
        let backward = estimate_resources(&[b, a], &ctx).unwrap();

        assert_eq!(forward.resources, backward.resources);
        assert_eq!(forward.total, backward.total);
        assert_eq!(forward.resources[0].resource.identification.name, "a");
    }

    #[test]
    fn test_missing_region_aborts_aggregation() {
        let coefficients = test_coefficients();
        let config = EstimationConfig::default();
        let resources = vec![
            Resource::Compute(six_watt_vm("ok", "europe-west9")),
            Resource::Compute(six_watt_vm("lost", "nowhere")),
        ];
        let result = estimate_resources(&resources, &context(&config, &coefficients, None));
        assert!(matches!(result, Err(Error::MissingRegionIntensity { .. })));
    }

    fn huge_disk(name: &str) -> ComputeResource {
        compute(
            name,
            "europe-west9",
            ComputeResourceSpecs {
                ssd_storage: Decimal::MAX,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_emissions_overflow_is_an_error() {
        let coefficients = test_coefficients();
        let hourly = EstimationConfig::default();
        let disk = huge_disk("huge");
        assert!(estimate_supported_resource(&disk, &context(&hourly, &coefficients, None)).is_ok());

        let mut yearly = EstimationConfig::default();
        yearly.unit.time = TimeUnit::Year;
        let result = estimate_supported_resource(&disk, &context(&yearly, &coefficients, None));
        match result {
            Err(Error::Overflow { address }) => {
                assert_eq!(address, "gcp/google_compute_instance.huge")
            }
            other => panic!("expected an overflow error, got {:?}", other),
        }
    }

    #[test]
    fn test_total_overflow_is_an_error() {
        let coefficients = test_coefficients();
        let config = EstimationConfig::default();
        let mut disk = huge_disk("many");
        disk.identification.count = u32::MAX;
        disk.identification.replication_factor = u32::MAX;

        let resources = vec![Resource::Compute(disk)];
        let result = estimate_resources(&resources, &context(&config, &coefficients, None));
        assert!(matches!(result, Err(Error::Overflow { .. })));
    }

    #[test]
    fn test_report_info() {
        let coefficients = test_coefficients();
        let mut config = EstimationConfig::default();
        config.unit.time = TimeUnit::Month;
        config.unit.carbon = CarbonUnit::Kilogram;
        config.provider.aws.avg_cpu_use = dec!(0.3);
        let forecast = ForecastOverride {
            average_intensity: dec!(0.1),
            region: "europe-west9".to_string(),
        };

        let report =
            estimate_resources(&[], &context(&config, &coefficients, Some(&forecast))).unwrap();

        assert_eq!(report.info.unit_time, "m");
        assert_eq!(report.info.unit_power, "W");
        assert_eq!(report.info.unit_carbon_emissions_time, "kgCO2eq/m");
        assert_eq!(report.info.info_by_provider["aws"].average_cpu_usage, dec!(0.3));
        assert_eq!(report.info.info_by_provider["gcp"].average_gpu_usage, dec!(0.5));
        assert_eq!(report.info.forecast, Some(forecast));
        assert_eq!(report.total.resources_count, 0);
        assert_eq!(report.total.power, Decimal::ZERO);
    }
}
