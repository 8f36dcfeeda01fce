use anyhow::{anyhow, bail, Context, Result};
use sketchpad::sketch::replay::{load_script, replay};
use sketchpad::sketch::save::DirectorySink;
use sketchpad::sketch::settings_store;
use sketchpad::sketch::SketchApp;
use std::path::PathBuf;

const USAGE: &str = "usage: sketchpad <script.json> [--out DIR] [--settings FILE] [--debug]";

#[derive(Debug)]
struct CliArgs {
    script: PathBuf,
    out_dir: PathBuf,
    settings: Option<PathBuf>,
    debug: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs> {
    let mut script = None;
    let mut out_dir = PathBuf::from(".");
    let mut settings = None;
    let mut debug = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out" => {
                out_dir = args
                    .next()
                    .map(PathBuf::from)
                    .ok_or_else(|| anyhow!("--out needs a directory\n{USAGE}"))?;
            }
            "--settings" => {
                settings = Some(
                    args.next()
                        .map(PathBuf::from)
                        .ok_or_else(|| anyhow!("--settings needs a file\n{USAGE}"))?,
                );
            }
            "--debug" => debug = true,
            "-h" | "--help" => bail!("{USAGE}"),
            flag if flag.starts_with("--") => bail!("unknown option {flag}\n{USAGE}"),
            path if script.is_none() => script = Some(PathBuf::from(path)),
            extra => bail!("unexpected argument {extra}\n{USAGE}"),
        }
    }

    Ok(CliArgs {
        script: script.ok_or_else(|| anyhow!("missing script path\n{USAGE}"))?,
        out_dir,
        settings,
        debug,
    })
}

fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;

    let settings_path = match args.settings.clone() {
        Some(path) => path,
        None => settings_store::resolve_settings_path()?,
    };
    let settings = settings_store::load_from_path(&settings_path)
        .with_context(|| format!("load settings {}", settings_path.display()))?;
    sketchpad::logging::init(args.debug || settings.debug_logging, settings.log_file.clone());

    let script = load_script(&args.script)?;
    let mut app = SketchApp::new(settings, script.dpr);
    let mut sink = DirectorySink::new(&args.out_dir);
    let report = replay(&mut app, &script, &mut sink)?;

    for path in &report.written {
        println!("{}", path.display());
    }
    Ok(())
}
