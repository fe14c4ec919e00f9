use clap::Parser;

use rex_rs::engine::RexEngine;
use rex_rs::options::{RegexOptions, RexSettings};
use rex_rs::types::CharEncoding;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Patterns; generated strings match all of them.
    #[arg(value_name = "PATTERN", required = true)]
    patterns: Vec<String>,

    /// Number of strings to generate.
    #[clap(short = 'n', long, value_name = "INT", default_value = "10")]
    count: usize,

    /// Character encoding: ascii, latin1 or utf16.
    #[clap(long, value_name = "ENCODING", default_value = "ascii")]
    encoding: CharEncoding,

    /// Seed for reproducible output.
    #[clap(long, value_name = "INT")]
    seed: Option<u64>,

    /// Case-insensitive matching.
    #[clap(short = 'i', long)]
    ignore_case: bool,

    /// `^` and `$` match at line breaks.
    #[clap(short = 'm', long)]
    multiline: bool,

    /// Print the automaton in DOT format instead of generating.
    #[clap(long)]
    dot: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    log::info!("args = {:?}", args);

    let mut options = RegexOptions::empty();
    options.set(RegexOptions::IGNORE_CASE, args.ignore_case);
    options.set(RegexOptions::MULTILINE, args.multiline);

    let mut settings = RexSettings::default().with_encoding(args.encoding);
    settings.seed = args.seed;
    let mut engine = RexEngine::new(settings);

    let patterns: Vec<&str> = args.patterns.iter().map(String::as_str).collect();
    let time_compile = std::time::Instant::now();
    let sfa = engine.compile_all(&patterns, options)?;
    log::info!(
        "compiled into {} states and {} moves in {:.3} s",
        sfa.num_states(),
        sfa.num_moves(),
        time_compile.elapsed().as_secs_f64()
    );
    log::info!("bdd = {:?}", engine.bdd());

    if args.dot {
        println!("{}", sfa.to_dot(engine.bdd())?);
        return Ok(());
    }

    let mut produced = 0;
    for s in engine.generate_from(sfa, Some(args.count))? {
        println!("{}", s);
        produced += 1;
    }
    if produced < args.count {
        log::info!("the language ran out after {} strings", produced);
    }

    log::info!("All done in {:.3} s", time_total.elapsed().as_secs_f64());
    Ok(())
}
