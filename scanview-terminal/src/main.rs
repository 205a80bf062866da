/// ScanView Terminal - keyboard-driven model viewer
///
/// Usage: scanview-terminal [--config viewer.json] [model.stl|model.obj]
///
/// Logging goes through `RUST_LOG` (default `warn`). Point stderr at a file
/// to keep log lines out of the rendered frame.
use log::{error, info};
use scanview_core::ViewerConfig;
use scanview_terminal::TerminalApp;
use std::env;
use std::io;
use std::path::PathBuf;
use std::process;

struct Args {
    config: Option<PathBuf>,
    model: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args {
        config: None,
        model: None,
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or("--config needs a path")?;
                parsed.config = Some(PathBuf::from(path));
            }
            flag if flag.starts_with("--") => return Err(format!("unknown option {}", flag)),
            _ if parsed.model.is_none() => parsed.model = Some(PathBuf::from(arg)),
            _ => return Err(format!("unexpected argument {}", arg)),
        }
    }
    Ok(parsed)
}

fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = match parse_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            eprintln!("Usage: scanview-terminal [--config viewer.json] [model.stl|model.obj]");
            process::exit(2);
        }
    };

    let config = match &args.config {
        Some(path) => ViewerConfig::load(path).unwrap_or_else(|e| {
            error!("{}: {}; using defaults", path.display(), e);
            ViewerConfig::default()
        }),
        None => ViewerConfig::default(),
    };
    info!("{}", config.calibration.summary());

    let mut app = TerminalApp::new(&config)?;
    if let Some(model) = args.model {
        app.open(model);
    }
    app.run()
}
