use indicatif::{
    ParallelProgressIterator,
    ProgressIterator,
    ProgressStyle,
};
use isorefine::{
    BatchSummary,
    ConvolutionPredictor,
    FeatureRow,
    IsotopeRefiner,
    IsotopeRefinerConfig,
    PredictionCache,
};
use mzdetect::mobility::{
    MobilogramBinner,
    recommended_bin_width,
};
use mzdetect::{
    MassDetector,
    SpectrumInput,
    detect_batch,
};
use rayon::prelude::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{
    BufReader,
    BufWriter,
    Write,
};
use std::path::Path;
use std::time::Instant;
use tracing::{
    info,
    instrument,
    warn,
};

use crate::cli::{
    BinMobilogramsArgs,
    DetectPeaksArgs,
    RefineAnnotationsArgs,
    SerializationFormat,
    WriteTemplateArgs,
};
use crate::config::{
    BinningConfig,
    BinningInput,
    DetectionOutput,
    MobilogramOutput,
};
use crate::error::CliError;

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})";

fn progress_style() -> Result<ProgressStyle, CliError> {
    ProgressStyle::with_template(PROGRESS_TEMPLATE)
        .map_err(|e| CliError::DataProcessing(format!("Invalid progress template: {e}")))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

pub fn write_json<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    format: SerializationFormat,
) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(File::create(path)?);
    match format {
        SerializationFormat::Json => serde_json::to_writer(&mut writer, value)?,
        SerializationFormat::PrettyJson => serde_json::to_writer_pretty(&mut writer, value)?,
    }
    writer.flush()?;
    Ok(())
}

/// Main function for the 'detect-peaks' subcommand.
#[instrument]
pub fn main_detect_peaks(args: DetectPeaksArgs) -> Result<(), CliError> {
    let detector: MassDetector = read_json(&args.config_path)?;
    info!("Using detector: {:#?}", detector);
    let spectra: Vec<SpectrumInput> = read_json(&args.spectra_path)?;
    info!(
        "Loaded {} spectra from {}",
        spectra.len(),
        args.spectra_path.display()
    );

    let start = Instant::now();
    let outputs: Vec<DetectionOutput> = detect_batch(&detector, &spectra, None)?
        .into_iter()
        .map(|det| match det.peaks {
            Ok(peaks) => DetectionOutput {
                id: det.id,
                peaks: Some(peaks),
                error: None,
            },
            Err(e) => DetectionOutput {
                id: det.id,
                peaks: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    write_json(&args.output_path, &outputs, args.format)?;
    println!("Wrote to {}", args.output_path.display());
    println!("Peak detection took {:#?}", start.elapsed());
    Ok(())
}

/// Main function for the 'bin-mobilograms' subcommand.
#[instrument]
pub fn main_bin_mobilograms(args: BinMobilogramsArgs) -> Result<(), CliError> {
    let config: BinningConfig = read_json(&args.config_path)?;
    info!("Using binning settings: {:#?}", config);
    let input: BinningInput = read_json(&args.input_path)?;
    info!("Loaded {} trace groups", input.groups.len());

    let axes: Vec<&[f64]> = if input.mobility_axes.is_empty() {
        input
            .groups
            .iter()
            .flat_map(|g| g.traces.iter().map(|t| t.mobilities.as_slice()))
            .collect()
    } else {
        input.mobility_axes.iter().map(|a| a.as_slice()).collect()
    };

    let bin_width = match config.bin_width {
        Some(width) => width,
        None => {
            let reference = axes.iter().copied().max_by_key(|a| a.len()).unwrap_or(&[]);
            let width = recommended_bin_width(config.mobility_type, reference);
            info!("Using recommended bin width of {} scans", width);
            width
        }
    };
    let binner = MobilogramBinner::new(axes.iter().copied(), config.mobility_type, bin_width)?;

    let start = Instant::now();
    let outputs: Vec<MobilogramOutput> = input
        .groups
        .par_iter()
        .progress_with_style(progress_style()?)
        .map(|group| {
            let result = binner.bin_traces(&group.traces);
            if let Err(e) = &result {
                warn!("Skipping trace group {}: {}", group.id, e);
            }
            MobilogramOutput::from((group.id.clone(), result))
        })
        .collect();

    write_json(&args.output_path, &outputs, args.format)?;
    println!("Wrote to {}", args.output_path.display());
    println!("Mobilogram binning took {:#?}", start.elapsed());
    Ok(())
}

/// Main function for the 'refine-annotations' subcommand.
#[instrument]
pub fn main_refine_annotations(args: RefineAnnotationsArgs) -> Result<(), CliError> {
    if args.batch_size == 0 {
        return Err(CliError::DataProcessing(
            "Batch size must be at least 1".to_string(),
        ));
    }
    let config: IsotopeRefinerConfig = read_json(&args.config_path)?;
    info!("Using refiner settings: {:#?}", config);
    let mut rows: Vec<FeatureRow> = read_json(&args.rows_path)?;
    info!(
        "Loaded {} feature rows from {}",
        rows.len(),
        args.rows_path.display()
    );

    // One cache for the whole run, all rows share the same settings.
    let cache = PredictionCache::new();
    let refiner = IsotopeRefiner::new(&config, &ConvolutionPredictor, &cache)?;

    let start = Instant::now();
    let mut summary = BatchSummary::default();
    for chunk in rows
        .chunks_mut(args.batch_size)
        .progress_with_style(progress_style()?)
    {
        summary.merge(refiner.refine_rows(chunk, None));
    }
    for (row_id, e) in summary.rows_failed.iter() {
        warn!("Row {} was left unrefined: {}", row_id, e);
    }
    info!("Predicted isotope patterns for {} ions", cache.len());

    write_json(&args.output_path, &rows, args.format)?;
    println!(
        "Refined {} rows ({} failed), kept {} annotations and removed {}",
        summary.rows_refined,
        summary.rows_failed.len(),
        summary.annotations_retained,
        summary.annotations_removed
    );
    println!("Wrote to {}", args.output_path.display());
    println!("Refinement took {:#?}", start.elapsed());
    Ok(())
}

const ZSCORE_DETECTOR_TEMPLATE: &str = r#"{
  "algorithm": "z_score",
  "lag": 5,
  "threshold": 3.5,
  "min_points_for_peak": 2,
  "use_median": false,
  "influence": 0.5,
  "noise_level": 0.0
}"#;

const GAUSSIAN_FIT_DETECTOR_TEMPLATE: &str = r#"{
  "algorithm": "gaussian_fit",
  "window_radius": 2,
  "max_iterations": 1000,
  "max_mean_shift": 1.0
}"#;

const SPECTRA_TEMPLATE: &str = r#"[
  {
    "id": "scan=1",
    "spectrum": {
      "mz": [500.00, 500.01, 500.02, 500.03, 500.04, 500.05, 500.06, 500.07, 500.08, 500.09],
      "intensity": [10.0, 11.0, 10.0, 12.0, 10.0, 400.0, 900.0, 350.0, 11.0, 10.0]
    }
  }
]"#;

const BINNING_TEMPLATE: &str = r#"{
  "mobility_type": "tims",
  "bin_width": null
}"#;

const SINGLE_RESOLUTION_REFINER_TEMPLATE: &str = r#"{
  "mz_tolerance": { "da_or_ppm": { "da": 0.003, "ppm": 10.0 } },
  "min_intensity": 1.0,
  "min_isotope_score": 0.5,
  "resolution_mode": { "mode": "single" }
}"#;

const MULTI_RESOLUTION_REFINER_TEMPLATE: &str = r#"{
  "mz_tolerance": { "da_or_ppm": { "da": 0.003, "ppm": 10.0 } },
  "min_intensity": 1.0,
  "min_isotope_score": 0.5,
  "resolution_mode": {
    "mode": "multi_resolution",
    "resolutions": [
      { "width": 0.0001 },
      { "width": 0.001 },
      { "width": 0.01 },
      { "width": 0.1 }
    ],
    "library_weight": 2.0
  }
}"#;

const FEATURE_ROWS_TEMPLATE: &str = r#"[
  {
    "id": 1,
    "annotations": [
      { "compound_name": "Glucose", "formula": "C6H12O6", "ion_type": "[M+H]+", "database_id": "HMDB0000122" },
      { "compound_name": "Glucose sodium adduct", "formula": "C6H12O6", "ion_type": "[M+Na]+" }
    ],
    "isotope_pattern": {
      "kind": "single",
      "charge": 1,
      "signals": [
        { "mz": 181.0707, "intensity": 1000.0 },
        { "mz": 182.0741, "intensity": 68.0 },
        { "mz": 183.0750, "intensity": 14.0 }
      ]
    },
    "representative_scan": {
      "scan_number": 1204,
      "mass_list": [
        { "mz": 181.0707, "intensity": 1000.0 },
        { "mz": 182.0741, "intensity": 68.0 },
        { "mz": 183.0750, "intensity": 14.0 }
      ]
    }
  }
]"#;

/// Main function for the 'write-template' subcommand.
pub fn main_write_template(args: WriteTemplateArgs) -> Result<(), CliError> {
    let target_dir = args.output_path;
    std::fs::create_dir_all(&target_dir)?;

    let zscore_path = target_dir.join("zscore_detector_template.json");
    let gaussian_path = target_dir.join("gaussian_fit_detector_template.json");
    let spectra_path = target_dir.join("spectra_template.json");
    std::fs::write(&zscore_path, ZSCORE_DETECTOR_TEMPLATE)?;
    std::fs::write(&gaussian_path, GAUSSIAN_FIT_DETECTOR_TEMPLATE)?;
    std::fs::write(&spectra_path, SPECTRA_TEMPLATE)?;
    println!(
        "Wrote peak detection templates to:\n- {}\n- {}\n- {}",
        zscore_path.display(),
        gaussian_path.display(),
        spectra_path.display()
    );

    let binning_path = target_dir.join("binning_template.json");
    std::fs::write(&binning_path, BINNING_TEMPLATE)?;
    println!("Wrote binning template to: {}", binning_path.display());

    let single_path = target_dir.join("refiner_template.json");
    let multi_path = target_dir.join("multi_resolution_refiner_template.json");
    let rows_path = target_dir.join("feature_rows_template.json");
    std::fs::write(&single_path, SINGLE_RESOLUTION_REFINER_TEMPLATE)?;
    std::fs::write(&multi_path, MULTI_RESOLUTION_REFINER_TEMPLATE)?;
    std::fs::write(&rows_path, FEATURE_ROWS_TEMPLATE)?;
    println!(
        "Wrote refinement templates to:\n- {}\n- {}\n- {}",
        single_path.display(),
        multi_path.display(),
        rows_path.display()
    );
    Ok(())
}
