use chm_perfect_hash::{
    GenConfig, Generator, IntSaltHash, MphError, PerfectHash, RenderOptions, SaltHash,
    StrSaltHash, TableOptions, generator_for, parse_replay, read_table, replay,
};
use clap::Parser;
use log::LevelFilter;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

/// Generate a minimal perfect hash function for the keys in a file and emit
/// source code implementing it.
#[derive(Parser, Debug)]
#[command(name = "perfect-hash", version, about)]
struct Options {
    /// File with one key per line; line order defines the hash values.
    keys_file: PathBuf,

    /// Delimiter for list items in the output.
    #[arg(long, default_value = ", ")]
    delimiter: String,

    /// Spaces at the beginning of wrapped list lines.
    #[arg(long, default_value_t = 4)]
    indent: usize,

    /// Maximal width of a generated list line before wrapping.
    #[arg(long, default_value_t = 76)]
    width: usize,

    /// Start-of-comment marker in the keys file.
    #[arg(long, default_value = "#")]
    comment: String,

    /// Column separator in the keys file.
    #[arg(long, default_value = ",")]
    splitby: String,

    /// 1-based column of the keys file holding the keys.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    keycol: usize,

    /// Attempts per vertex count before growing it. Smaller is faster but
    /// yields a larger table G.
    #[arg(long, default_value_t = 5)]
    trials: usize,

    /// Hash function family: 1 (string salt) or 2 (integer salt).
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
    hft: u8,

    /// Target language for the generated code.
    #[arg(long, default_value = "py")]
    language: String,

    /// Template file overriding the builtin one.
    #[arg(long)]
    template: Option<PathBuf>,

    /// Output file. "std" means standard output, "no" suppresses output.
    #[arg(short, long)]
    output: Option<String>,

    /// Log search progress.
    #[arg(short, long)]
    verbose: bool,

    /// Replay explicit parameters as "N;salt1;salt2" instead of searching.
    #[arg(short = 't', long)]
    test: Option<String>,
}

fn main() -> ExitCode {
    let opts = Options::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if opts.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .init();

    match run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(opts: &Options) -> Result<(), MphError> {
    let table_opts = TableOptions {
        comment: opts.comment.clone(),
        split_by: opts.splitby.clone(),
        key_col: opts.keycol,
    };
    let keys = read_table(&opts.keys_file, &table_opts)?;

    let code = if let Some(params) = &opts.test {
        if opts.hft != 1 {
            return Err(MphError::BadReplay(
                "replay parameters are only supported with --hft=1".into(),
            ));
        }
        let (ng, f1, f2) = parse_replay(params)?;
        let ph = replay(&keys, ng, f1, f2)?;
        render(opts, &keys, &ph)?
    } else {
        let generator = Generator::new().with_config(GenConfig {
            trials: opts.trials,
            ..Default::default()
        });
        let mut rng = StdRng::from_entropy();
        match opts.hft {
            1 => {
                let ph = generator.generate::<StrSaltHash, _>(&keys, &mut rng)?;
                render(opts, &keys, &ph)?
            }
            _ => {
                let ph = generator.generate::<IntSaltHash, _>(&keys, &mut rng)?;
                render(opts, &keys, &ph)?
            }
        }
    };

    match opts.output.as_deref() {
        None | Some("std") => print!("{code}"),
        Some("no") => {}
        Some(path) => fs::write(path, code)?,
    }
    Ok(())
}

fn render<H: SaltHash>(
    opts: &Options,
    keys: &[String],
    ph: &PerfectHash<H>,
) -> Result<String, MphError> {
    let template = match &opts.template {
        Some(path) => Some(fs::read_to_string(path)?),
        None => None,
    };
    let render_opts = RenderOptions {
        delimiter: opts.delimiter.clone(),
        width: opts.width,
        indent: opts.indent,
        template,
    };
    let generator = generator_for(&opts.language, render_opts)?;
    Ok(generator.render(keys, &ph.g, &ph.f1, &ph.f2))
}
