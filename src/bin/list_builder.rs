use clap::Parser;
use skymap_tools::listing::{run_list_builder, ListArgs, ListOptions, Separator};
use skymap_tools::utils::format_elapsed;
use skymap_tools::{logging, ToolsConfig};
use std::path::PathBuf;

/// Write the names of data files found in a directory to a list file
#[derive(Parser, Debug)]
#[command(name = "list-builder", version, about)]
struct Args {
    /// Directory to scan
    #[arg(short, long)]
    input: PathBuf,

    /// List file to write
    #[arg(short, long)]
    output: PathBuf,

    /// Log every directory that is scanned
    #[arg(short, long)]
    verbose: bool,

    /// Scan each immediate subdirectory of the input instead of the input itself
    #[arg(short, long)]
    subdirs: bool,

    /// File name suffix to match (defaults to `.root`)
    #[arg(long)]
    extension: Option<String>,

    /// What to write after each name; names are written back to back unless set
    #[arg(long, value_enum)]
    separator: Option<Separator>,

    /// Sort names instead of keeping directory order
    #[arg(long)]
    sort: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = ToolsConfig::resolve(args.config.as_deref())?;

    let list_args = ListArgs {
        options: ListOptions {
            input: args.input,
            extension: args.extension.unwrap_or(config.list.extension),
            subdirs: args.subdirs,
            verbose: args.verbose,
            sort: args.sort || config.list.sort,
        },
        output: args.output,
        separator: args.separator.unwrap_or(config.list.separator),
    };

    let report = run_list_builder(&list_args).map_err(|e| {
        let mut message = format!(
            "Failed to build file list from {}",
            list_args.options.input.display()
        );
        if let Some(hint) = e.recovery_hint() {
            message = format!("{message}. {hint}");
        }
        anyhow::Error::new(e).context(message)
    })?;

    println!("{}", format_elapsed(report.elapsed));
    Ok(())
}
