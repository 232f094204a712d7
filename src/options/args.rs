//! Argument parsing via clap.

use std::path::PathBuf;

use clap::*;
use indoc::indoc;

const TEMPLATE: &str = indoc! {
    "{name} {version}
    {author}

    {about}

    {usage-heading} {usage}

    {all-args}"
};

const USAGE: &str = "benchmon [OPTIONS] <IMAGE>";

/// The arguments for benchmon.
#[derive(Parser, Debug)]
#[command(
    name = crate_name!(),
    version = crate_version!(),
    author = crate_authors!(),
    about = crate_description!(),
    color = ColorChoice::Auto,
    help_template = TEMPLATE,
    override_usage = USAGE,
)]
pub struct Args {
    #[arg(
        value_name = "IMAGE",
        help = "The image or pod manifest to run.",
        long_help = "The image or pod manifest to run with the container runtime. A file holding a JSON \
                    pod manifest is run as a pod, anything else as an image."
    )]
    pub image: PathBuf,

    #[command(flatten)]
    pub sampling_args: SamplingArgs,

    #[command(flatten)]
    pub workload_args: WorkloadArgs,

    #[command(flatten)]
    pub output_args: OutputArgs,

    #[command(flatten)]
    pub other_args: OtherArgs,
}

#[derive(Args, Clone, Debug, Default)]
#[command(next_help_heading = "Sampling Options")]
pub struct SamplingArgs {
    #[arg(
        short = 'd',
        long = "duration",
        value_name = "TIME",
        help = "How long to sample each repetition for.",
        long_help = indoc! {
            "How long to sample each repetition for. Takes a human duration
            (e.g. 30s, 2m). Sampling stops early if the workload exits on its
            own. Defaults to 10s."
        }
    )]
    pub duration: Option<String>,

    #[arg(
        short = 'r',
        long = "repetitions",
        value_name = "N",
        help = "How many times to run the workload.",
        long_help = "How many times to run the workload, one after the other. Must be at least 1, and defaults to 1."
    )]
    pub repetitions: Option<u32>,
}

#[derive(Args, Clone, Debug, Default)]
#[command(next_help_heading = "Workload Options")]
pub struct WorkloadArgs {
    #[arg(
        long = "allow_unprivileged",
        help = "Runs the workload without root.",
        long_help = "Skips the check that benchmon is running as root. The container runtime usually \
                    needs root, so this is mostly useful for other kinds of workloads."
    )]
    pub allow_unprivileged: bool,

    #[arg(
        short = 'p',
        long = "runtime_dir",
        value_name = "DIR",
        help = "Sets the directory of the runtime binary.",
        long_help = "Sets the directory holding the runtime binary. If not set, it is looked up in PATH."
    )]
    pub runtime_dir: Option<PathBuf>,

    #[arg(
        short = 'o',
        long = "show_output",
        help = "Shows the workload's output.",
        long_help = "Passes the workload's stdout and stderr through instead of discarding them."
    )]
    pub show_output: bool,

    #[arg(
        short = 's',
        long = "stage1_path",
        value_name = "PATH",
        help = "Sets the stage1 image to use.",
        long_help = "Sets the stage1 image for the runtime to use. Its file name is also used to name \
                    the result files."
    )]
    pub stage1_path: Option<PathBuf>,
}

#[derive(Args, Clone, Debug, Default)]
#[command(next_help_heading = "Output Options")]
pub struct OutputArgs {
    #[arg(
        short = 'w',
        long = "output_dir",
        value_name = "DIR",
        help = "Sets where result files are written.",
        long_help = "Sets the directory result files are written to with --to_file. Defaults to /tmp."
    )]
    pub output_dir: Option<PathBuf>,

    #[arg(
        short = 'f',
        long = "to_file",
        help = "Writes results to CSV files.",
        long_help = indoc! {
            "Writes every sample and every repetition's summary to two CSV
            files instead of printing per-process summaries. The files are
            written once all repetitions are done."
        }
    )]
    pub to_file: bool,

    #[arg(
        short = 'v',
        long = "verbose",
        help = "Prints every sample.",
        long_help = "Prints the usage of every tracked process at every tick."
    )]
    pub verbose: bool,
}

#[derive(Args, Clone, Debug, Default)]
#[command(next_help_heading = "Other Options")]
pub struct OtherArgs {
    #[arg(
        short = 'C',
        long = "config",
        value_name = "PATH",
        help = "Sets the location of the config file.",
        long_help = "Sets the location of the config file. Expects a config file in the TOML format."
    )]
    pub config_location: Option<PathBuf>,

    #[arg(
        long = "log_file",
        value_name = "PATH",
        help = "Also writes logs to a file.",
        long_help = "Appends log messages to the given file, on top of printing them to stderr."
    )]
    pub log_file: Option<PathBuf>,

    #[arg(
        long = "log_level",
        value_name = "LEVEL",
        value_parser = ["off", "error", "warn", "info", "debug", "trace"],
        help = "Sets the minimum level of logged messages.",
        long_help = "Sets the minimum level of logged messages. Defaults to warn."
    )]
    pub log_level: Option<String>,
}

/// Returns an [`Args`].
pub fn get_args() -> Args {
    Args::parse()
}

/// Returns a [`Command`] that can be inspected or rendered.
pub fn build_cmd() -> Command {
    Args::command()
}
