use log::info;
use softrender::core::log_context::LogContext;
use softrender::io::simple_cli::SimpleCli;
use softrender::scene::viewer::SceneViewer;
use std::time::Instant;

fn main() -> Result<(), String> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let log = LogContext::new("softrender", log::max_level());
    let Some(settings) = SimpleCli::process(log)? else {
        return Ok(());
    };

    let start = Instant::now();
    let mut viewer = SceneViewer::new(settings, log)?;
    let written = viewer.run()?;

    for path in &written {
        info!("wrote {}", path.display());
    }
    info!("done in {:?}", start.elapsed());
    Ok(())
}
