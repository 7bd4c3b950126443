use clap::Parser;
use folio_core::{Scaled, ScaledUnit};
use folio_lang::config::EngineConfig;
use folio_stdext::color::Colorize;
use folio_stdlib::StdState;
use std::fs;
use std::path::PathBuf;

mod render;

/// Folio typesets documents written in a TeX-like macro language.
///
/// No font files are read: every font uses fixed metrics.
/// Pages are printed to standard output; errors and messages go to standard error.
#[derive(Parser)]
#[clap(version)]
struct Cli {
    /// Path to a JSON file with the engine configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Width of lines, like 345pt or 12cm
    #[arg(long, global = true, value_parser = parse_dimen)]
    hsize: Option<Scaled>,

    /// Height of pages, like 550pt or 8in
    #[arg(long, global = true, value_parser = parse_dimen)]
    vsize: Option<Scaled>,

    /// Number of recoverable errors after which the run stops
    #[arg(long, global = true)]
    error_limit: Option<usize>,

    /// Log at debug level, unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    sub_command: SubCommand,
}

#[derive(Parser)]
enum SubCommand {
    Doc(Doc),
    Run(Run),
}

/// Print documentation for a primitive
#[derive(Parser)]
struct Doc {
    /// Name of the primitive, with or without the leading backslash.
    /// If omitted, every primitive is listed.
    name: Option<String>,
}

/// Typeset a file and print its pages
#[derive(Parser)]
struct Run {
    /// Path to the file to typeset
    file_path: PathBuf,

    /// Output format of the pages
    #[arg(long, value_enum, default_value_t = render::Format::Text)]
    format: render::Format,
}

fn main() {
    let args: Cli = Cli::parse();
    init_logging(args.verbose);
    let result = load_config(&args).and_then(|config| match args.sub_command {
        SubCommand::Doc(d) => doc(d.name),
        SubCommand::Run(run_args) => run(config, run_args),
    });
    if let Err(err) = result {
        eprintln!["{}: {err}", "error".bright_red().bold()];
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn load_config(args: &Cli) -> Result<EngineConfig, String> {
    let mut config = match &args.config {
        None => EngineConfig::default(),
        Some(path) => {
            let raw = fs::read_to_string(path)
                .map_err(|err| format!("failed to read config file {}: {err}", path.display()))?;
            serde_json::from_str(&raw)
                .map_err(|err| format!("invalid config file {}: {err}", path.display()))?
        }
    };
    if let Some(hsize) = args.hsize {
        config.hsize = hsize;
    }
    if let Some(vsize) = args.vsize {
        config.vsize = vsize;
    }
    if let Some(error_limit) = args.error_limit {
        config.error_limit = error_limit;
    }
    log::debug!("engine configuration: {config:?}");
    Ok(config)
}

fn run(config: EngineConfig, args: Run) -> Result<(), String> {
    let source = fs::read_to_string(&args.file_path)
        .map_err(|err| format!("failed to open file {}: {err}", args.file_path.display()))?;
    let mut vm = folio_stdlib::new_vm(config);
    vm.backend = render::new_backend(args.format, std::io::stdout());
    let origin = args.file_path.to_string_lossy();
    match folio_stdlib::run(&mut vm, &origin, &source) {
        Ok(()) => {
            if vm.num_errors() > 0 {
                eprintln!["{} error(s) were reported", vm.num_errors()];
            }
            Ok(())
        }
        Err(err) => {
            // Flush the pages already shipped.
            if let Err(backend_err) = vm.backend.finish() {
                log::warn!("failed to finish output: {backend_err}");
            }
            Err(format!(
                "typesetting stopped\n{}",
                vm.error_diagnostic(&err).render()
            ))
        }
    }
}

fn doc(name: Option<String>) -> Result<(), String> {
    match name {
        None => {
            let built_ins = StdState::all_initial_built_ins();
            let mut names: Vec<&&str> = built_ins.keys().collect();
            names.sort();
            for name in names {
                let first_line = built_ins[*name]
                    .doc()
                    .and_then(|doc| doc.lines().next())
                    .unwrap_or("");
                println!["\\{}  {}", name.bold(), first_line];
            }
            Ok(())
        }
        Some(name) => {
            let name = name.strip_prefix('\\').unwrap_or(&name);
            match StdState::doc(name) {
                None => Err(format!("unknown primitive \\{name}")),
                Some(doc) => {
                    println!["\\{}  {}", name.bold(), doc];
                    Ok(())
                }
            }
        }
    }
}

/// Parses a dimension with a unit, like `12.5pt`.
fn parse_dimen(s: &str) -> Result<Scaled, String> {
    let s = s.trim();
    let split = s
        .find(|c: char| c.is_ascii_alphabetic())
        .ok_or_else(|| format!("{s:?} has no unit"))?;
    let (number, unit) = s.split_at(split);
    let unit = ScaledUnit::parse(unit).ok_or_else(|| format!("unknown unit {unit:?}"))?;
    let (integer, fraction) = number.split_once('.').unwrap_or((number, ""));
    let integer: i32 = if integer.is_empty() {
        0
    } else {
        integer
            .parse()
            .map_err(|_| format!("{number:?} is not a number"))?
    };
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("{number:?} is not a number"));
    }
    let digits: Vec<u8> = fraction.bytes().map(|b| b - b'0').collect();
    Scaled::from_parts(integer, Scaled::from_decimal_fraction(&digits), unit)
        .map_err(|_| format!("{s} is too large"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dimen_points() {
        assert_eq!(parse_dimen("12pt"), Ok(Scaled::ONE * 12));
        assert_eq!(parse_dimen("2.5pt"), Ok(Scaled::ONE * 5 / 2));
        assert_eq!(parse_dimen("1pc"), Ok(Scaled::ONE * 12));
        assert_eq!(parse_dimen("100sp"), Ok(Scaled(100)));
    }

    #[test]
    fn parse_dimen_errors() {
        assert!(parse_dimen("12").is_err());
        assert!(parse_dimen("12xy").is_err());
        assert!(parse_dimen("a.bpt").is_err());
        assert!(parse_dimen("20000pt").is_err());
    }

    #[test]
    fn cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
