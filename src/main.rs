//! nurse-report – command-line diagnosis report generator.
//!
//! Usage:
//!   nurse-report <diagnosis.json> [output_dir] [--block name=image.png]...
//!                [--nested name]... [--config cfg.json] [--name "Respondent"]
//!                [--date 2025/01/31] [--preview] [--layout-json out.json]
//!
//! With `--block` flags the captured blocks are paginated in the given order;
//! otherwise (or when a block cannot be captured) the report is rebuilt from
//! the diagnosis data.

use std::{env, fs, path::PathBuf, process};

use nurse_report::capture::{CapturableRegion, SnapshotCapturer};
use nurse_report::raster::RasterImage;
use nurse_report::{CaptureSource, ReportConfig, ReportData, ReportGenerator};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut input_path: Option<PathBuf> = None;
    let mut output_dir: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut layout_path: Option<PathBuf> = None;
    let mut name: Option<String> = None;
    let mut date: Option<String> = None;
    let mut preview = false;
    let mut blocks: Vec<(String, String)> = Vec::new();
    let mut nested: Vec<String> = Vec::new();
    let mut positional = 0usize;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--preview" | "-p" => preview = true,
            "--block" | "-b" => {
                let value = flag_value(&mut iter, arg, &args[0]);
                match value.split_once('=') {
                    Some((block, src)) if !block.is_empty() && !src.is_empty() => {
                        blocks.push((block.to_string(), src.to_string()))
                    }
                    _ => {
                        eprintln!("Invalid --block '{value}': expected name=image");
                        process::exit(1);
                    }
                }
            }
            "--nested" => nested.push(flag_value(&mut iter, arg, &args[0])),
            "--config" | "-c" => config_path = Some(PathBuf::from(flag_value(&mut iter, arg, &args[0]))),
            "--layout-json" => layout_path = Some(PathBuf::from(flag_value(&mut iter, arg, &args[0]))),
            "--name" | "-n" => name = Some(flag_value(&mut iter, arg, &args[0])),
            "--date" | "-d" => date = Some(flag_value(&mut iter, arg, &args[0])),
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(&args[0]);
                process::exit(1);
            }
            path => {
                if positional == 0 {
                    input_path = Some(PathBuf::from(path));
                } else if positional == 1 {
                    output_dir = Some(PathBuf::from(path));
                } else {
                    eprintln!("Unexpected argument: {path}");
                    print_usage(&args[0]);
                    process::exit(1);
                }
                positional += 1;
            }
        }
    }

    let input = match input_path {
        Some(p) => p,
        None => {
            eprintln!("Error: no diagnosis file specified.");
            print_usage(&args[0]);
            process::exit(1);
        }
    };
    let output_dir = output_dir.unwrap_or_else(|| PathBuf::from("."));

    let config = match &config_path {
        Some(path) => ReportConfig::load(path).unwrap_or_else(|e| {
            eprintln!("Error loading config '{}': {e}", path.display());
            process::exit(1);
        }),
        None => ReportConfig::default(),
    };

    let json = fs::read_to_string(&input).unwrap_or_else(|e| {
        eprintln!("Error reading '{}': {e}", input.display());
        process::exit(1);
    });
    let mut data = ReportData::from_json(&json).unwrap_or_else(|e| {
        eprintln!("Error parsing '{}': {e}", input.display());
        process::exit(1);
    });
    if name.is_some() {
        data.user_name = name;
    }
    if let Some(d) = date {
        data.diagnosis_date = d;
    }

    let mut capturer = SnapshotCapturer::new();
    let mut regions = Vec::new();
    for (block, src) in &blocks {
        if src.starts_with("data:") {
            match RasterImage::from_data_uri(src) {
                Ok(raster) => capturer.insert_raster(block.as_str(), raster),
                // Left unregistered: capturing it fails and the data-driven
                // renderer takes over.
                Err(e) => log::warn!("block '{block}': {e}"),
            }
        } else {
            capturer.insert_file(block.as_str(), src.as_str());
        }
        regions.push(if nested.contains(block) {
            CapturableRegion::nested(block.as_str())
        } else {
            CapturableRegion::new(block.as_str())
        });
    }
    let source = || {
        (!regions.is_empty()).then(|| CaptureSource {
            capturer: &capturer,
            regions: &regions,
        })
    };

    if let Some(path) = &layout_path {
        let dump = match ReportGenerator::recording(config.clone()) {
            Ok(generator) if preview => generator.preview(&data),
            Ok(generator) => generator.generate(source(), &data).await,
            Err(e) => Err(e),
        };
        match dump.and_then(|report| Ok(fs::write(path, &report.bytes)?)) {
            Ok(()) => log::info!("layout written to {}", path.display()),
            Err(e) => {
                eprintln!("Error writing layout '{}': {e}", path.display());
                process::exit(1);
            }
        }
    }

    let generator = ReportGenerator::pdf(config).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });
    let report = if preview {
        generator.preview(&data)
    } else {
        generator.generate(source(), &data).await
    };

    match report.and_then(|r| r.save_to_dir(&output_dir).map(|path| (r, path))) {
        Ok((report, path)) => {
            eprintln!(
                "Wrote '{}' ({} bytes, {} page{}, {:?})",
                path.display(),
                report.bytes.len(),
                report.page_count,
                if report.page_count == 1 { "" } else { "s" },
                report.strategy
            );
        }
        Err(e) => {
            eprintln!("Error generating report: {e}");
            process::exit(1);
        }
    }
}

fn flag_value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str, prog: &str) -> String {
    match iter.next() {
        Some(v) => v.clone(),
        None => {
            eprintln!("Missing value for {flag}");
            print_usage(prog);
            process::exit(1);
        }
    }
}

fn print_usage(prog: &str) {
    eprintln!("nurse-report – MBTI diagnosis report generator");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <diagnosis.json> [output_dir] [flags]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <diagnosis.json>  {{ \"result\", \"scores\", \"advice\" }} as saved by the web app");
    eprintln!("  [output_dir]      Directory for the report (default: .)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --block, -b name=image   Captured block snapshot (PNG/JPEG path or data URI), in order");
    eprintln!("  --nested name            Mark a block as nested inside another (not captured)");
    eprintln!("  --config, -c cfg.json    Report configuration overrides");
    eprintln!("  --name, -n \"Respondent\"  Name printed at the top of the report");
    eprintln!("  --date, -d 2025/01/31    Diagnosis date (default: today)");
    eprintln!("  --preview, -p            Write the single-page preview instead");
    eprintln!("  --layout-json out.json   Also dump the page layout as JSON");
    eprintln!("  --help                   Print this message");
}
