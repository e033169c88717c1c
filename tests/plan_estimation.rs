//! End-to-end estimation of a Terraform JSON plan

use std::io::Write;
use std::sync::Arc;

use rust_decimal_macros::dec;
use tf_carbon::carbon_aware::load_forecast;
use tf_carbon::coefficients::StaticCoefficients;
use tf_carbon::config::EstimationConfig;
use tf_carbon::estimate::{EstimationReport, EstimationResource, IntensitySource};
use tf_carbon::output::{render_json, render_text};
use tf_carbon::plan::{parse_plan, PlanResource};
use tf_carbon::units::{round_floor, CarbonUnit, TimeUnit};
use tf_carbon::{Error, Pipeline};

const PLAN: &str = include_str!("fixtures/plan.json");

fn records() -> Vec<PlanResource> {
    parse_plan(PLAN).unwrap()
}

fn pipeline(config: EstimationConfig) -> Pipeline {
    Pipeline::new(config, Arc::new(StaticCoefficients::embedded().unwrap()))
}

fn find<'a>(report: &'a EstimationReport, name: &str) -> &'a EstimationResource {
    report
        .resources
        .iter()
        .find(|r| r.resource.identification.name == name)
        .unwrap_or_else(|| panic!("{} not estimated", name))
}

#[test]
fn test_plan_is_estimated_with_static_intensity() {
    let records = records();
    assert_eq!(records.len(), 5);

    let report = pipeline(EstimationConfig::default()).run(&records).unwrap();

    assert_eq!(report.resources.len(), 4);
    assert_eq!(report.unsupported_resources.len(), 1);
    assert_eq!(
        report.unsupported_resources[0].identification.resource_type,
        "google_compute_network"
    );
    // vm + 2 disk replicas + primary and standby database + bastion
    assert_eq!(report.total.resources_count, 6);

    let vm = find(&report, "vm");
    assert_eq!(vm.resource.identification.region, "europe-west9");
    assert_eq!(vm.resource.specs.hdd_storage, dec!(100));
    // (2 × 2.485 + 8 × 0.392 + 100 × 0.65 / 1024) × 1.1
    assert_eq!(vm.power, dec!(8.9864242187));
    assert_eq!(vm.carbon_intensity, dec!(0.059));
    assert_eq!(vm.carbon_emissions, dec!(0.5301990289));
    assert_eq!(vm.intensity_source, IntensitySource::Static);

    let shared = find(&report, "shared");
    assert_eq!(shared.resource.identification.region, "europe-west9");
    assert_eq!(shared.total_count, 2);

    let database = find(&report, "main");
    assert_eq!(database.resource.identification.replication_factor, 2);
    assert_eq!(database.resource.specs.ssd_storage, dec!(20));

    let bastion = find(&report, "bastion");
    assert_eq!(bastion.resource.identification.region, "us-east-1");
    assert_eq!(bastion.carbon_intensity, dec!(0.379));

    let power: rust_decimal::Decimal = report
        .resources
        .iter()
        .map(|r| r.power * rust_decimal::Decimal::from(r.total_count))
        .sum();
    assert_eq!(report.total.power, power);
}

#[tokio::test]
async fn test_forecast_overrides_its_region_only() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "region": "europe-west9",
            "data": [
                {{"timestamp": "2024-05-01T12:00:00Z", "value": 100}},
                {{"timestamp": "2024-05-01T13:00:00Z", "value": 200}}
            ]
        }}"#
    )
    .unwrap();

    let forecast = load_forecast(file.path()).await.unwrap();
    assert_eq!(forecast.average_intensity, dec!(0.15));

    let report = pipeline(EstimationConfig::default())
        .with_forecast(Some(forecast.clone()))
        .run(&records())
        .unwrap();

    let vm = find(&report, "vm");
    assert_eq!(vm.intensity_source, IntensitySource::Forecast);
    assert_eq!(vm.carbon_emissions, round_floor(vm.power * dec!(0.15)));

    let bastion = find(&report, "bastion");
    assert_eq!(bastion.intensity_source, IntensitySource::Static);
    assert_eq!(report.info.forecast, Some(forecast));
}

#[test]
fn test_units_scale_emissions() {
    let hourly = pipeline(EstimationConfig::default()).run(&records()).unwrap();

    let mut config = EstimationConfig::default();
    config.unit.time = TimeUnit::Day;
    config.unit.carbon = CarbonUnit::Kilogram;
    let daily = pipeline(config).run(&records()).unwrap();

    assert_eq!(daily.info.unit_carbon_emissions_time, "kgCO2eq/d");
    for (h, d) in hourly.resources.iter().zip(&daily.resources) {
        assert_eq!(h.power, d.power);
        assert_eq!(
            d.carbon_emissions,
            round_floor(h.carbon_emissions * dec!(24) / dec!(1000))
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pipeline_matches_sequential() {
    let sequential = pipeline(EstimationConfig::default()).run(&records()).unwrap();
    let concurrent = Arc::new(pipeline(EstimationConfig::default()))
        .run_concurrent(records())
        .await
        .unwrap();

    assert_eq!(concurrent.resources, sequential.resources);
    assert_eq!(concurrent.unsupported_resources, sequential.unsupported_resources);
    assert_eq!(concurrent.total, sequential.total);
}

#[test]
fn test_unknown_region_aborts_the_run() {
    let plan = PLAN.replace("europe-west9-a", "mars-north1-a");
    let result = pipeline(EstimationConfig::default()).run(&parse_plan(&plan).unwrap());

    match result {
        Err(Error::MissingRegionIntensity { region, address, .. }) => {
            assert_eq!(region, "mars-north1");
            assert_eq!(address, "gcp/google_compute_instance.vm");
        }
        other => panic!("expected a missing region error, got {:?}", other),
    }
}

#[test]
fn test_report_renders() {
    let report = pipeline(EstimationConfig::default()).run(&records()).unwrap();

    let json = render_json(&report).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["resources"].as_array().unwrap().len(), 4);
    assert_eq!(value["total"]["resources_count"], 6);
    assert_eq!(value["info"]["unit_power"], "W");

    let text = render_text(&report);
    assert!(text.contains("gcp/google_compute_instance.vm"));
    assert!(text.contains("Unsupported resources (1):"));
}

#[test]
fn test_regional_disk_without_region_uses_replica_zones() {
    let plan = r#"{
        "planned_values": {
            "root_module": {
                "resources": [
                    {
                        "address": "google_compute_region_disk.diskr",
                        "mode": "managed",
                        "type": "google_compute_region_disk",
                        "name": "diskr",
                        "provider_name": "registry.terraform.io/hashicorp/google",
                        "values": {
                            "name": "diskr",
                            "type": "pd-ssd",
                            "size": 1024,
                            "replica_zones": ["europe-west9-a", "europe-west9-b"]
                        }
                    }
                ]
            }
        }
    }"#;

    let report = pipeline(EstimationConfig::default())
        .run(&parse_plan(plan).unwrap())
        .unwrap();

    let diskr = find(&report, "diskr");
    assert_eq!(diskr.resource.identification.region, "europe-west9");
    assert_eq!(diskr.carbon_intensity, dec!(0.059));
    assert_eq!(report.total.resources_count, 2);
}

#[test]
fn test_module_instances_keep_distinct_addresses() {
    let disk = |address: &str, name: &str| {
        format!(
            r#"{{
                "address": {address},
                "mode": "managed",
                "type": "google_compute_disk",
                "name": "{name}",
                "provider_name": "registry.terraform.io/hashicorp/google",
                "values": {{"zone": "europe-west9-a"}}
            }}"#,
            address = serde_json::to_string(address).unwrap(),
            name = name
        )
    };
    let plan = format!(
        r#"{{"planned_values": {{"root_module": {{
            "resources": [{}, {}],
            "child_modules": [
                {{"address": "module.a", "resources": [{}]}},
                {{"address": "module.b", "resources": [{}]}}
            ]
        }}}}}}"#,
        disk(r#"google_compute_disk.x["a.b"]"#, "x"),
        disk(r#"google_compute_disk.x["c.d"]"#, "x"),
        disk("module.a.google_compute_disk.d", "d"),
        disk("module.b.google_compute_disk.d", "d"),
    );

    let report = pipeline(EstimationConfig::default())
        .run(&parse_plan(&plan).unwrap())
        .unwrap();

    let addresses: Vec<String> = report.resources.iter().map(|r| r.address()).collect();
    assert_eq!(
        addresses,
        vec![
            r#"gcp/google_compute_disk.x["a.b"]"#,
            r#"gcp/google_compute_disk.x["c.d"]"#,
            "gcp/module.a.google_compute_disk.d",
            "gcp/module.b.google_compute_disk.d",
        ]
    );
}
