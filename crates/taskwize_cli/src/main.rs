//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `taskwize_core` linkage.
//! - Offer a distance probe for checking reminder radii by hand.
//!
//! Usage: `taskwize [LAT1 LON1 LAT2 LON2]`

use std::process::ExitCode;

fn main() -> ExitCode {
    println!("taskwize_core ping={}", taskwize_core::ping());
    println!("taskwize_core version={}", taskwize_core::core_version());

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        return ExitCode::SUCCESS;
    }

    match parse_coordinates(&args) {
        Ok([lat1, lon1, lat2, lon2]) => {
            let meters = taskwize_core::distance_meters(lat1, lon1, lat2, lon2);
            println!("distance_meters={meters:.1}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!("usage: taskwize [LAT1 LON1 LAT2 LON2]");
            ExitCode::from(2)
        }
    }
}

fn parse_coordinates(args: &[String]) -> Result<[f64; 4], String> {
    if args.len() != 4 {
        return Err(format!("expected 4 coordinates, got {}", args.len()));
    }
    let mut values = [0.0; 4];
    for (slot, raw) in values.iter_mut().zip(args) {
        *slot = raw
            .trim()
            .parse::<f64>()
            .map_err(|err| format!("invalid coordinate `{raw}`: {err}"))?;
    }
    Ok(values)
}
