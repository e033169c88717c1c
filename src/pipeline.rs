//! End-to-end estimation pipeline
//!
//! Plan records → extraction → estimation → report. The pipeline owns the
//! run's configuration, coefficient tables and optional forecast, all
//! read-only once built.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::carbon_aware::ForecastOverride;
use crate::coefficients::CoefficientProvider;
use crate::config::EstimationConfig;
use crate::error::{Error, Result};
use crate::estimate::{
    estimate_resource, estimate_resources, EstimationAccumulator, EstimationContext,
    EstimationReport,
};
use crate::extract::{ExtractContext, ExtractorRegistry};
use crate::plan::PlanResource;
use crate::resources::Resource;

pub struct Pipeline {
    config: EstimationConfig,
    coefficients: Arc<dyn CoefficientProvider>,
    registry: ExtractorRegistry,
    forecast: Option<ForecastOverride>,
}

impl Pipeline {
    pub fn new(config: EstimationConfig, coefficients: Arc<dyn CoefficientProvider>) -> Self {
        Self {
            config,
            coefficients,
            registry: ExtractorRegistry::with_defaults(),
            forecast: None,
        }
    }

    pub fn with_forecast(mut self, forecast: Option<ForecastOverride>) -> Self {
        self.forecast = forecast;
        self
    }

    pub fn with_registry(mut self, registry: ExtractorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &EstimationConfig {
        &self.config
    }

    pub fn forecast(&self) -> Option<&ForecastOverride> {
        self.forecast.as_ref()
    }

    fn extract_context(&self) -> ExtractContext<'_> {
        ExtractContext {
            coefficients: self.coefficients.as_ref(),
            config: &self.config,
        }
    }

    fn estimation_context(&self) -> EstimationContext<'_> {
        EstimationContext {
            config: &self.config,
            coefficients: self.coefficients.as_ref(),
            forecast: self.forecast.as_ref(),
        }
    }

    /// Normalize plan records
    pub fn extract(&self, records: &[PlanResource]) -> Vec<Resource> {
        self.registry.extract_all(records, &self.extract_context())
    }

    /// Estimate already extracted resources
    pub fn estimate(&self, resources: &[Resource]) -> Result<EstimationReport> {
        estimate_resources(resources, &self.estimation_context())
    }

    /// Run the whole pipeline on the current thread
    pub fn run(&self, records: &[PlanResource]) -> Result<EstimationReport> {
        let resources = self.extract(records);
        let report = self.estimate(&resources)?;
        log_summary(&report);
        Ok(report)
    }

    /// Run the pipeline with one blocking task per record.
    ///
    /// Records are independent, so extraction and estimation fan out freely;
    /// results are folded into a single accumulator as tasks complete. The
    /// report is identical to [`Pipeline::run`] apart from its timestamp.
    pub async fn run_concurrent(
        self: Arc<Self>,
        records: Vec<PlanResource>,
    ) -> Result<EstimationReport> {
        let mut tasks = JoinSet::new();
        for record in records {
            let pipeline = Arc::clone(&self);
            tasks.spawn_blocking(move || {
                let resource = pipeline
                    .registry
                    .extract(&record, &pipeline.extract_context());
                estimate_resource(&resource, &pipeline.estimation_context())
            });
        }
        debug!("Spawned {} estimation tasks", tasks.len());

        let mut accumulator = EstimationAccumulator::new();
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|e| Error::TaskError(e.to_string()))?;
            if let Err(e) = outcome.and_then(|outcome| accumulator.add(outcome)) {
                tasks.abort_all();
                return Err(e);
            }
        }

        let report = accumulator.into_report(&self.config, self.forecast.as_ref());
        log_summary(&report);
        Ok(report)
    }
}

fn log_summary(report: &EstimationReport) {
    info!(
        "Estimated {} resources ({} unsupported): {} {} / {} {}",
        report.resources.len(),
        report.unsupported_resources.len(),
        report.total.power,
        report.info.unit_power,
        report.total.carbon_emissions,
        report.info.unit_carbon_emissions_time
    );
}
