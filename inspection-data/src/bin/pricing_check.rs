use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use inspection_core::calculations::common::{format_currency, round_half_up};
use inspection_data::PricingPolicyLoader;
use rust_decimal::Decimal;

/// Validate a pricing CSV and print the resulting rate table.
///
/// The CSV file should have the following columns:
/// - category: labour_2h, labour_8h, equipment_daily, discount or gst
/// - key: work type, equipment kind, hour threshold, or `rate`
/// - value: price, daily rate or fraction
#[derive(Parser, Debug)]
#[command(name = "pricing-check")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the pricing CSV (the bundled standard table if omitted)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Show the hourly rate of every work type at this many hours
    #[arg(long)]
    hours: Option<Decimal>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let policy = match &args.file {
        Some(path) => {
            println!("Loading pricing from: {}", path.display());
            let file = File::open(path)
                .with_context(|| format!("Failed to open: {}", path.display()))?;
            PricingPolicyLoader::load(file)
                .with_context(|| format!("Invalid pricing table: {}", path.display()))?
        }
        None => {
            println!("Loading bundled standard pricing");
            PricingPolicyLoader::standard().context("Bundled pricing table is invalid")?
        }
    };

    println!();
    println!("{:<14} {:>12} {:>12}", "Work type", "2 hours", "8 hours");
    for (work_type, anchors) in &policy.labour {
        println!(
            "{:<14} {:>12} {:>12}",
            work_type.as_str(),
            format_currency(anchors.two_hour),
            format_currency(anchors.eight_hour)
        );
    }

    println!();
    println!(
        "Equipment per day: dehumidifier {}, air mover {}, RCD box {}",
        format_currency(policy.equipment.dehumidifier),
        format_currency(policy.equipment.air_mover),
        format_currency(policy.equipment.rcd_box)
    );
    for tier in &policy.discount_tiers {
        println!(
            "Discount above {} h: {}%",
            tier.above_hours,
            (tier.discount * Decimal::ONE_HUNDRED).normalize()
        );
    }
    println!("GST: {}%", (policy.gst_rate * Decimal::ONE_HUNDRED).normalize());

    if let Some(hours) = args.hours {
        println!();
        println!("Hourly rates at {hours} h:");
        for (work_type, anchors) in &policy.labour {
            println!(
                "  {:<14} {:>10}",
                work_type.as_str(),
                format_currency(round_half_up(anchors.hourly_rate(hours)))
            );
        }
    }

    Ok(())
}
