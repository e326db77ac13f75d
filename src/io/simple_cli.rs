use crate::core::log_context::LogContext;
use crate::io::config_loader::TomlConfigLoader;
use crate::io::render_settings::RenderSettings;
use clap::Parser;

/// Headless software renderer. Flags override the config file.
#[derive(Parser, Debug, Default)]
#[command(name = "softrender")]
#[command(about = "Multithreaded software rasterizer, TOML driven")]
pub struct SimpleCli {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,

    /// OBJ model to render instead of the built-in cube
    #[arg(long, value_name = "FILE")]
    pub obj: Option<String>,

    /// Base name of the written images
    #[arg(short, long)]
    pub output: Option<String>,

    #[arg(long)]
    pub width: Option<usize>,

    #[arg(long)]
    pub height: Option<usize>,

    /// Samples per pixel: 1 or 4
    #[arg(long, value_parser = parse_sample_count)]
    pub msaa: Option<usize>,

    /// Worker threads, 0 for all cores
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Write an example configuration to FILE and exit
    #[arg(long, value_name = "FILE")]
    pub write_example_config: Option<String>,
}

fn parse_sample_count(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(n @ (1 | 4)) => Ok(n),
        _ => Err(format!("'{}' is not a supported sample count (1 or 4)", s)),
    }
}

impl SimpleCli {
    /// Parses the process arguments. Returns `None` when the invocation
    /// only wrote an example config.
    pub fn process(log: LogContext) -> Result<Option<RenderSettings>, String> {
        Self::parse().into_settings(log)
    }

    pub fn into_settings(self, log: LogContext) -> Result<Option<RenderSettings>, String> {
        if let Some(path) = &self.write_example_config {
            TomlConfigLoader::create_example_config(path)?;
            log.info(format_args!("example configuration written to {}", path));
            return Ok(None);
        }

        let mut settings = match &self.config {
            Some(config_path) => {
                log.info(format_args!("loading configuration {}", config_path));
                TomlConfigLoader::load_from_file(config_path, log)?
            }
            None => {
                log.info(format_args!("no configuration file, using defaults"));
                RenderSettings::default()
            }
        };
        self.apply_overrides(&mut settings);
        Ok(Some(settings))
    }

    fn apply_overrides(self, settings: &mut RenderSettings) {
        if let Some(obj) = self.obj {
            settings.obj = Some(obj);
        }
        if let Some(output) = self.output {
            settings.output = output;
        }
        if let Some(width) = self.width {
            settings.width = width;
        }
        if let Some(height) = self.height {
            settings.height = height;
        }
        if let Some(msaa) = self.msaa {
            settings.msaa = msaa;
        }
        if let Some(threads) = self.threads {
            settings.threads = threads;
        }
    }
}
