use clap::{
    Parser,
    Subcommand,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect peaks in profile spectra.
    DetectPeaks(DetectPeaksArgs),
    /// Sum raw mobility traces into binned mobilograms.
    BinMobilograms(BinMobilogramsArgs),
    /// Score annotations by isotope pattern and drop the poor ones.
    RefineAnnotations(RefineAnnotationsArgs),
    /// Write template configuration files.
    WriteTemplate(WriteTemplateArgs),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum SerializationFormat {
    Json,
    #[default]
    PrettyJson,
}

#[derive(Parser, Debug, Clone)]
pub struct DetectPeaksArgs {
    /// The path to the json file with the detector settings.
    #[arg(short, long)]
    pub config_path: PathBuf,

    /// The path to the json file with the spectra.
    #[arg(short, long)]
    pub spectra_path: PathBuf,

    /// The path to the output file.
    #[arg(short, long)]
    pub output_path: PathBuf,

    /// The format to use for the output
    #[arg(short, long, default_value_t, value_enum)]
    pub format: SerializationFormat,
}

#[derive(Parser, Debug, Clone)]
pub struct BinMobilogramsArgs {
    /// The path to the json file with the binning settings.
    #[arg(short, long)]
    pub config_path: PathBuf,

    /// The path to the json file with the mobility traces.
    #[arg(short, long)]
    pub input_path: PathBuf,

    /// The path to the output file.
    #[arg(short, long)]
    pub output_path: PathBuf,

    /// The format to use for the output
    #[arg(short, long, default_value_t, value_enum)]
    pub format: SerializationFormat,
}

#[derive(Parser, Debug, Clone)]
pub struct RefineAnnotationsArgs {
    /// The path to the json file with the refiner settings.
    #[arg(short, long)]
    pub config_path: PathBuf,

    /// The path to the json file with the feature rows.
    #[arg(short, long)]
    pub rows_path: PathBuf,

    /// The path to the output file.
    #[arg(short, long)]
    pub output_path: PathBuf,

    /// The format to use for the output
    #[arg(short, long, default_value_t, value_enum)]
    pub format: SerializationFormat,

    /// Rows per progress step (default: 1000)
    #[arg(short, long, default_value_t = 1000)]
    pub batch_size: usize,
}

#[derive(Parser, Debug)]
pub struct WriteTemplateArgs {
    /// The path to the output files.
    #[arg(short, long)]
    pub output_path: PathBuf,
}
