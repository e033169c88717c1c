//! Report rendering

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::estimate::{EstimationReport, IntensitySource};

/// Output format selected on the command line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Render a report in the requested format
pub fn render(report: &EstimationReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => render_json(report),
        OutputFormat::Text => Ok(render_text(report)),
    }
}

pub fn render_json(report: &EstimationReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Human readable table of the report
pub fn render_text(report: &EstimationReport) -> String {
    let info = &report.info;
    let power_header = format!("Power ({})", info.unit_power);
    let emissions_header = format!("Emissions ({})", info.unit_carbon_emissions_time);

    let rows: Vec<[String; 4]> = report
        .resources
        .iter()
        .map(|r| {
            let mut address = r.address();
            if r.intensity_source == IntensitySource::Forecast {
                address.push_str(" *");
            }
            [
                address,
                r.total_count.to_string(),
                r.power.normalize().to_string(),
                r.carbon_emissions.normalize().to_string(),
            ]
        })
        .collect();

    let headers = [
        "Resource".to_string(),
        "Count".to_string(),
        power_header,
        emissions_header,
    ];
    let mut widths = headers.clone().map(|h| h.len());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "Estimation at {}", info.date_time.to_rfc3339());
    for (provider, usage) in &info.info_by_provider {
        let _ = writeln!(
            out,
            "  {}: average CPU use {}, average GPU use {}",
            provider,
            usage.average_cpu_usage.normalize(),
            usage.average_gpu_usage.normalize()
        );
    }
    out.push('\n');

    push_row(&mut out, &headers, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, &rule, &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    push_row(&mut out, &rule, &widths);
    let total = [
        "Total".to_string(),
        report.total.resources_count.to_string(),
        report.total.power.normalize().to_string(),
        report.total.carbon_emissions.normalize().to_string(),
    ];
    push_row(&mut out, &total, &widths);

    if let Some(forecast) = &info.forecast {
        let _ = writeln!(
            out,
            "\n* forecast carbon intensity {} gCO2eq/Wh applied in region {}",
            forecast.average_intensity.normalize(),
            forecast.region
        );
    }

    if !report.unsupported_resources.is_empty() {
        let _ = writeln!(
            out,
            "\nUnsupported resources ({}):",
            report.unsupported_resources.len()
        );
        for unsupported in &report.unsupported_resources {
            let _ = writeln!(out, "  {}", unsupported.identification.address());
        }
    }

    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let mut line = String::new();
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if i == 0 {
            let _ = write!(line, "{:<width$}", cell, width = width);
        } else {
            let _ = write!(line, "  {:>width$}", cell, width = width);
        }
    }
    out.push_str(line.trim_end());
    out.push('\n');
}
