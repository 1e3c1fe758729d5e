use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "restdot",
    version,
    about = "Emotion dot-product scoring for resting-state volume series"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Run(RunArgs),
    Batch(BatchArgs),
}

#[derive(Debug, Args)]
pub struct ScoreOpts {
    #[arg(long, help = "Project identifier (lowercase letters, digits, underscores)")]
    pub project: String,

    #[arg(long, default_value = "stim", help = "Contrast name of classifier")]
    pub contrast: String,

    #[arg(long, default_value = "gm_mask.bin", help = "Valid-voxel mask file name")]
    pub mask_name: String,

    #[arg(
        long,
        default_value_t = false,
        help = "Restrict scoring to each map's significant voxels"
    )]
    pub mask_sig: bool,

    #[arg(long, default_value = "sep", help = "Model name of classifier")]
    pub model: String,

    #[arg(long, value_enum, default_value_t = TaskNameArg::Match)]
    pub task_name: TaskNameArg,

    #[arg(
        long,
        default_value_t = false,
        help = "Skip importance map materialization"
    )]
    pub skip_setup: bool,

    #[arg(long, default_value_t = 0, help = "Number of threads (0 = auto)")]
    pub threads: usize,

    #[arg(long, help = "Working directory for fetched inputs and artifacts")]
    pub work_dir: PathBuf,

    #[arg(long, help = "Data root holding series, masks, and classifier weights")]
    pub data_dir: PathBuf,

    #[arg(long, help = "Path to the SQLite results database")]
    pub db: PathBuf,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub opts: ScoreOpts,

    #[arg(long = "subj", num_args = 1.., required = true, help = "Subject IDs (repeatable)")]
    pub subj: Vec<String>,

    #[arg(long = "sess", num_args = 1.., required = true, help = "Session IDs (repeatable)")]
    pub sess: Vec<String>,
}

#[derive(Debug, Args)]
pub struct BatchArgs {
    #[command(flatten)]
    pub opts: ScoreOpts,

    #[arg(long = "sess", num_args = 1.., required = true, help = "Session IDs (repeatable)")]
    pub sess: Vec<String>,

    #[arg(
        long,
        help = "Index into the subject roster (default: ARRAY_TASK_ID env var)"
    )]
    pub array_index: Option<usize>,
}

/// How the classifier task is chosen per session: `match` looks the
/// task up in the store, `both` scores movies and scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TaskNameArg {
    Match,
    Movies,
    Scenarios,
    Both,
}
