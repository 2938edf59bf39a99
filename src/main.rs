use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::{error, info, warn};
use simplelog::{ColorChoice, Config as LogConfig, LevelFilter, TermLogger, TerminalMode};
use std::{path::PathBuf, str::FromStr};
use strum::IntoEnumIterator;
use tornado_figures::{
    config::CaseConfig,
    figures::{self, ensure_output_dir, FigureId, Inputs},
    fonts::list_chinese_fonts,
    FigureResult,
};

fn main() {
    let matches = build_cli().get_matches();

    let level = match (matches.get_flag("quiet"), matches.get_count("verbose")) {
        (true, _) => LevelFilter::Warn,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };
    if let Err(e) = TermLogger::init(
        level,
        LogConfig::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("Logger error: {}", e);
    }

    if matches.get_flag("list-fonts") {
        println!("以下是系统中所有支持中文的字体的名称：");
        for family in list_chinese_fonts() {
            println!("{}", family);
        }
        return;
    }

    match run(&matches) {
        Ok(0) => {}
        Ok(failed) => {
            error!("{} figure(s) failed", failed);
            std::process::exit(1);
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

/// Draw the requested figures, returning how many failed.
fn run(matches: &ArgMatches) -> FigureResult<usize> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => CaseConfig::load(path)?,
        None => CaseConfig::default(),
    };
    if let Some(dir) = matches.get_one::<PathBuf>("output") {
        config.output_dir = dir.clone();
    }
    ensure_output_dir(&config.output_dir)?;

    let ids = requested_figures(matches);
    let inputs = Inputs::new(config);

    let mut failed = 0;
    for id in ids {
        match figures::draw(id, &inputs) {
            Ok(paths) => {
                for path in paths {
                    info!("{}: {}", id, path.display());
                }
            }
            Err(e) => {
                warn!("{} failed: {}", id, e);
                failed += 1;
            }
        }
    }

    Ok(failed)
}

fn requested_figures(matches: &ArgMatches) -> Vec<FigureId> {
    let names: Vec<&String> = matches
        .get_many::<String>("figures")
        .map(|names| names.collect())
        .unwrap_or_default();

    if names.is_empty() || names.iter().any(|n| n.as_str() == "all") {
        return FigureId::iter().collect();
    }

    // Names were checked by the argument parser.
    names
        .into_iter()
        .filter_map(|n| FigureId::from_str(n).ok())
        .collect()
}

fn parse_figure(name: &str) -> Result<String, String> {
    if name == "all" || FigureId::from_str(name).is_ok() {
        Ok(name.to_owned())
    } else {
        let known: Vec<String> = FigureId::iter().map(|id| id.to_string()).collect();
        Err(format!("unknown figure, expected all or one of {}", known.join(", ")))
    }
}

fn build_cli() -> Command {
    Command::new("tornado-figures")
        .about("Figures of the 2024-04-27 Guangzhou tornado case study")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML case configuration, defaults reproduce the case study")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Directory the figures are written to")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("list-fonts")
                .long("list-fonts")
                .help("List the installed font families that can draw Chinese and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("More log output, repeat for even more")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only log warnings and errors")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose"),
        )
        .arg(
            Arg::new("figures")
                .value_name("FIGURE")
                .help("Figures to draw, e.g. p4_1 p4_12, or all (the default)")
                .num_args(0..)
                .value_parser(parse_figure),
        )
}
