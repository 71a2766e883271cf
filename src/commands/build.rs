//! Build command handler

use crate::build::{build_all, clean_outputs};
use crate::cli::BuildArgs;
use crate::context::JetContext;
use crate::error::Result;

use super::load_config;

/// Build the selected packages and persist their maps
pub fn run_build(args: &BuildArgs) -> Result<String> {
    let config = load_config(&args.source, |config| args.apply(config))?;

    if config.build.clean {
        clean_outputs(&[&config.dist_dir(), &config.map_dir()])?;
    }

    let ctx = JetContext::new(config);
    let (_, report) = build_all(ctx.pipeline(), ctx.store())?;

    Ok(format!(
        "Built {} files into {} packages ({} modules) in {:.2?}\n  artifacts: {}\n  maps:      {}\n",
        report.files,
        report.packages,
        report.modules,
        report.elapsed,
        ctx.dist_dir().display(),
        ctx.store().dir().display()
    ))
}
