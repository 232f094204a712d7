use anyhow::{Context, Result};
use benchmon::{
    options::{args, get_options},
    start_benchmon,
    utils::logging::init_logger,
};

fn main() -> Result<()> {
    let args = args::get_args();
    let options = get_options(args)?;

    init_logger(options.log_level, options.log_file.as_deref())
        .context("Unable to set up logging.")?;

    start_benchmon(&options)
}
