use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;

use xctrace_gecko::{
    convert, save_profile_to_file, source_for_input, ConversionProps, Error, IdleGapMode,
};

#[derive(Debug, Parser)]
#[command(
    name = "xctrace-gecko",
    version,
    about = r#"
Convert an Instruments trace into a profile for the Firefox Profiler.

EXAMPLES:
    # Convert the first run of a trace recorded with the Time Profiler:
    xctrace-gecko Recording.trace -o profile.json.gz

    # Convert tables that were exported with `xctrace export` beforehand:
    xctrace-gecko exported-tables/ --run 2
"#
)]
struct Opt {
    /// A .trace bundle, or a directory containing toc.xml and one <schema>.xml
    /// file per exported table.
    input: PathBuf,

    /// The run of the trace to convert.
    #[arg(long, default_value = "1")]
    run: u32,

    /// The name of the profiled application. Frames in images whose path
    /// contains this name are categorized as user code. Defaults to the name
    /// of the recorded process.
    #[arg(long)]
    app_name: Option<String>,

    /// How to detect idle time when the trace has no thread-state table.
    #[arg(long, value_enum, default_value_t = IdleGapMode::Auto)]
    idle_gaps: IdleGapMode,

    /// Where Xcode keeps the symbols of connected devices. Defaults to
    /// ~/Library/Developer/Xcode/iOS DeviceSupport.
    #[arg(long)]
    device_support_dir: Option<PathBuf>,

    /// Look up names for unsymbolicated frames with atos.
    #[arg(long)]
    symbolicate: bool,

    /// Output filename. The profile is gzip-compressed if the name ends in .gz.
    #[arg(short, long, default_value = "profile.json.gz")]
    output: PathBuf,

    /// Log more details about the conversion.
    #[arg(short, long)]
    verbose: bool,
}

impl Opt {
    fn conversion_props(&self) -> ConversionProps {
        ConversionProps {
            run: self.run,
            app_name: self.app_name.clone(),
            idle_gap_mode: self.idle_gaps,
            device_support_dir: self.device_support_dir.clone(),
            symbolicate: self.symbolicate,
        }
    }
}

fn run(opt: &Opt) -> Result<(), Error> {
    let source = source_for_input(&opt.input);
    let profile = convert(source.as_ref(), &opt.conversion_props())?;
    save_profile_to_file(&profile, &opt.output)
}

fn main() {
    let opt = Opt::parse();
    let log_level = if opt.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    if let Err(err) = run(&opt) {
        log::error!("{err}");
        std::process::exit(1);
    }
}
