extern crate chrono;
extern crate dotenv;
extern crate failure;
extern crate fern;
extern crate material_pass;
extern crate serde_json;
extern crate structopt;
extern crate yansi;
#[macro_use]
extern crate log;

use material_pass::error::{Error, ErrorKind, Result};
use material_pass::utilities::{read_file, read_file_string, write_file};
use material_pass::{Pass, PlatformBitset};
use failure::ResultExt;
use std::env;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

#[derive(StructOpt, Debug)]
#[structopt(name = "passtool")]
struct Options {
    /// Activate debug mode
    #[structopt(short = "x", long = "debug")]
    debug: bool,

    /// Verbose mode (-v, -vv, -vvv, etc.)
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: u8,

    /// Log directory (defaults to $PASSTOOL_LOG_DIR or ./logs)
    #[structopt(short = "l", long = "log_dir", parse(from_os_str))]
    log_dir: Option<PathBuf>,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt, Debug)]
enum Command {
    /// Unpack a binary pass record into a descriptor and shader directory
    #[structopt(name = "unpack")]
    Unpack {
        #[structopt(short = "i", long = "input", parse(from_os_str))]
        input: PathBuf,

        /// Directory receiving {name}.json and {name}/
        #[structopt(short = "o", long = "output", parse(from_os_str))]
        output: PathBuf,

        /// Material name used to label shader files
        #[structopt(short = "m", long = "material")]
        material: Option<String>,

        /// Sort flags and variants before writing
        #[structopt(short = "s", long = "sort")]
        sort: bool,

        /// Only write the descriptor
        #[structopt(long = "skip_shaders")]
        skip_shaders: bool,
    },

    /// Pack a descriptor and its shader directory into a binary pass record
    #[structopt(name = "pack")]
    Pack {
        #[structopt(short = "i", long = "input", parse(from_os_str))]
        input: PathBuf,

        #[structopt(short = "o", long = "output", parse(from_os_str))]
        output: PathBuf,

        /// Sort flags and variants before writing
        #[structopt(short = "s", long = "sort")]
        sort: bool,
    },

    /// Merge the variants of several passes into the first one
    #[structopt(name = "merge")]
    Merge {
        /// Binary records or .json descriptors, in merge order
        #[structopt(short = "i", long = "input", parse(from_os_str))]
        inputs: Vec<PathBuf>,

        #[structopt(short = "o", long = "output", parse(from_os_str))]
        output: PathBuf,
    },

    /// Print a summary of a pass
    #[structopt(name = "info")]
    Info {
        #[structopt(short = "i", long = "input", parse(from_os_str))]
        input: PathBuf,
    },
}

fn main() {
    if let Err(err) = process() {
        let err = failure::Error::from(err);
        let separator = "---------------------------------------------------------";
        let mut message = "=========================================================\n".to_string();
        message.push_str(&format!(
            "passtool encountered an {}\n",
            yansi::Paint::red("error")
        ));
        message.push_str(separator);
        message.push_str("\n");
        message.push_str(&format!("{}", yansi::Paint::yellow(err.to_string())));
        let mut indent = " ".to_string();
        for cause in err.iter_causes() {
            message.push_str("\n");
            message.push_str(&indent);
            message.push_str("▶ ");
            message.push_str(&cause.to_string());
            indent.push(' ');
        }
        if log::max_level() == log::LevelFilter::Off {
            // Logging never came up, so nothing else will report this.
            eprintln!("passtool: {}", material_pass::pretty_error(&err));
        } else {
            error!("{}", message);
        }
        std::process::exit(1);
    }
}

fn process() -> Result<()> {
    dotenv::dotenv().ok();

    let options = Options::from_args();

    let verbosity = if options.debug {
        u64::from(options.verbose).max(1)
    } else {
        u64::from(options.verbose)
    };
    let log_dir = match options.log_dir {
        Some(ref log_dir) => log_dir.to_owned(),
        None => env::var("PASSTOOL_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./logs")),
    };
    setup_logging(verbosity, &log_dir)?;

    info!("passtool v{} starting up!", VERSION.unwrap_or("UNKNOWN"));
    debug!("{:?}", options);

    match options.command {
        Command::Unpack {
            input,
            output,
            material,
            sort,
            skip_shaders,
        } => {
            let mut pass = load_pass(&input)?;
            if sort {
                pass.sort_variants();
            }
            if let Some(ref material) = material {
                pass.label(material);
            }
            std::fs::create_dir_all(&output).with_context(|_| ErrorKind::path(&output))?;
            pass.store(&output, skip_shaders)?;
        }
        Command::Pack {
            input,
            output,
            sort,
        } => {
            let mut pass = load_pass(&input)?;
            if sort {
                pass.sort_variants();
            }
            write_pass(&pass, &output)?;
        }
        Command::Merge { inputs, output } => {
            let mut inputs = inputs.iter();
            let mut pass = match inputs.next() {
                Some(first) => load_pass(first)?,
                None => return Err(Error::config("merge needs at least one input")),
            };
            for input in inputs {
                let other = load_pass(input)?;
                if other.name != pass.name {
                    warn!(
                        "Merging pass {:?} from {:?} into pass {:?}",
                        other.name, input, pass.name
                    );
                }
                pass.merge_variants(other);
            }
            pass.sort_variants();
            write_pass(&pass, &output)?;
        }
        Command::Info { input } => {
            let pass = load_pass(&input)?;
            print_info(&pass);
        }
    }

    Ok(())
}

fn is_descriptor(path: &Path) -> bool {
    path.extension().map_or(false, |extension| extension == "json")
}

/// Read a pass from a binary record, or from a descriptor whose shader
/// directory sits next to it.
fn load_pass(path: &Path) -> Result<Pass> {
    let mut pass: Pass = Pass::default();
    if is_descriptor(path) {
        let text = read_file_string(path).with_context(|_| ErrorKind::path(path))?;
        let tree: serde_json::Value = serde_json::from_str(&text)?;
        let base_path = path.parent().unwrap_or_else(|| Path::new("."));
        pass.load(&tree, base_path)?;
    } else {
        let data = read_file(path).with_context(|_| ErrorKind::path(path))?;
        let mut cursor = Cursor::new(&data);
        pass.read(&mut cursor)?;
        if (cursor.position() as usize) < data.len() {
            warn!(
                "{} trailing bytes after pass {:?} in {:?}",
                data.len() - cursor.position() as usize,
                pass.name,
                path
            );
        }
    }
    Ok(pass)
}

fn write_pass(pass: &Pass, path: &Path) -> Result<()> {
    let mut data = Vec::new();
    pass.write(&mut data)?;
    write_file(path, &data).with_context(|_| ErrorKind::path(path))?;
    info!("Wrote pass {:?} ({} bytes) to {:?}", pass.name, data.len(), path);
    Ok(())
}

fn print_info(pass: &Pass) {
    let mut platforms: Vec<_> = pass.platforms().into_iter().collect();
    platforms.sort();
    let mut stages: Vec<_> = pass.stages().into_iter().collect();
    stages.sort();

    println!("name:                {}", pass.name);
    println!(
        "supported platforms: {}",
        pass.supported_platforms.get_bit_string()
    );
    println!(
        "                     {}",
        pass.supported_platforms
            .platforms()
            .map(|platform| platform.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("fallback pass:       {}", pass.fallback_pass);
    println!(
        "default blend mode:  {}",
        pass.default_blend_mode
            .map_or("(unspecified)".to_string(), |mode| mode.to_string())
    );
    println!("variants:            {}", pass.variants.len());
    println!(
        "platforms:           {}",
        platforms
            .iter()
            .map(|platform| platform.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "stages:              {}",
        stages
            .iter()
            .map(|stage| stage.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("flags:");
    for (key, values) in pass.flag_definitions() {
        println!(
            "    {}: {}",
            key,
            values.into_iter().collect::<Vec<_>>().join(", ")
        );
    }
}

fn setup_logging(verbosity: u64, log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir).with_context(|_| ErrorKind::path(log_dir))?;

    let mut base_config = fern::Dispatch::new();
    base_config = match verbosity {
        0 => base_config.level(log::LevelFilter::Info),
        1 => base_config.level(log::LevelFilter::Debug),
        _2_or_more => base_config.level(log::LevelFilter::Trace),
    };

    let log_path = log_dir.join("passtool.log");
    let log_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&log_path)
        .with_context(|_| ErrorKind::path(&log_path))?;

    // Separate file config so we can include year, month and day in file logs
    let file_config = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .chain(log_file);

    let stdout_config = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                chrono::Local::now().format("%H:%M"),
                record.target(),
                record.level(),
                message
            ))
        })
        .chain(std::io::stdout());

    base_config
        .chain(file_config)
        .chain(stdout_config)
        .apply()
        .map_err(|err| Error::config(format!("failed to initialize logging: {}", err)))?;

    Ok(())
}
