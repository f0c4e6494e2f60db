use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use traj_mend::{ImageMode, MendConfig, TrajectoryMode, Validation};

#[derive(Parser)]
#[command(
    name = "tmend",
    about = "Periodic-boundary molecule mending for MD trajectories",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Detect molecules and write a topology file
    #[command(visible_alias = "t")]
    Topology(TopologyArgs),

    /// Join molecules across periodic boundaries and write the mended trajectory
    #[command(visible_alias = "j")]
    Join(JoinArgs),

    /// Print structure, lattice and molecule information
    #[command(visible_alias = "i")]
    Inspect(InspectArgs),
}

/// I/O options shared by all commands.
#[derive(Args)]
pub struct IoOptions {
    /// Input trajectory (XYZ)
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Suppress progress output (for scripting)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Cell and topology-detection options shared by all commands.
#[derive(Args)]
#[command(next_help_heading = "Cell & Detection")]
pub struct DetectOptions {
    /// Cell parameters a b c alpha beta gamma (angstrom/degrees); overrides
    /// any cell found in the input file
    #[arg(long, num_args = 6, value_name = "X")]
    pub cell: Option<Vec<f64>>,

    /// Scaling factor for the van-der-Waals bond criterion
    #[arg(long = "bond-scale", value_name = "F", default_value = "0.6")]
    pub bond_scale: f64,

    /// Minimum-image policy for skewed cells
    #[arg(long = "image-mode", value_name = "MODE", default_value = "naive")]
    pub image_mode: ImageModeArg,

    /// Expected number of molecules (checked after detection)
    #[arg(long, value_name = "N")]
    pub expected: Option<usize>,

    /// Fail instead of warning when the detected molecule count mismatches
    #[arg(long, requires = "expected")]
    pub strict: bool,
}

impl DetectOptions {
    pub fn mend_config(&self, trajectory_mode: TrajectoryMode) -> MendConfig {
        MendConfig {
            bond_scale: self.bond_scale,
            image_mode: self.image_mode.into(),
            trajectory_mode,
            validation: if self.strict {
                Validation::Strict
            } else {
                Validation::Lenient
            },
            expected_molecules: self.expected,
            ..Default::default()
        }
    }
}

#[derive(Args)]
pub struct TopologyArgs {
    #[command(flatten)]
    pub io: IoOptions,

    #[command(flatten)]
    pub detect: DetectOptions,

    /// Output topology file (default: input stem + .topo.toml)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct JoinArgs {
    #[command(flatten)]
    pub io: IoOptions,

    #[command(flatten)]
    pub detect: DetectOptions,

    /// Output file, .xyz or .pdb (default: input stem + .mended.xyz)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Topology file with a precomputed molecule map
    #[arg(short = 't', long, value_name = "FILE")]
    pub topology: Option<PathBuf>,

    /// How multi-frame input is unwrapped
    #[arg(long, value_name = "MODE", default_value = "fast-forward")]
    pub mode: TrajectoryModeArg,

    /// Use geometric centres instead of mass-weighted ones
    #[arg(long = "geometric", visible_alias = "cog")]
    pub geometric: bool,

    /// Align all frames onto the first joined frame (Kabsch)
    #[arg(long)]
    pub align: bool,
}

#[derive(Args)]
pub struct InspectArgs {
    #[command(flatten)]
    pub io: IoOptions,

    #[command(flatten)]
    pub detect: DetectOptions,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum ImageModeArg {
    /// Fractional rounding (keeps the cell shape)
    #[default]
    Naive,
    /// Sequential per-axis correction, auto-detected order
    Priority,
    /// Exact minimum image over 27 lattice translations
    Accurate,
}

impl From<ImageModeArg> for ImageMode {
    fn from(arg: ImageModeArg) -> Self {
        match arg {
            ImageModeArg::Naive => ImageMode::Naive,
            ImageModeArg::Priority => ImageMode::Priority,
            ImageModeArg::Accurate => ImageMode::Accurate,
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum TrajectoryModeArg {
    /// Join every frame independently (slow, topology may change)
    Frames,
    /// Join the first frame, then track cumulative shifts
    #[default]
    #[value(name = "fast-forward", alias = "ff")]
    FastForward,
}

impl From<TrajectoryModeArg> for TrajectoryMode {
    fn from(arg: TrajectoryModeArg) -> Self {
        match arg {
            TrajectoryModeArg::Frames => TrajectoryMode::Frames,
            TrajectoryModeArg::FastForward => TrajectoryMode::FastForward,
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
