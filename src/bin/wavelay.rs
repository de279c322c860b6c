use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use wavelay::{
    HeadlessHost, HostEvent, LoadState, OpacitySpec, OverlayCompositor, OverlayOptions, Position,
};

#[derive(Parser, Debug)]
#[command(name = "wavelay", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite an overlay stack against a simulated timeline and print it.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Overlay options as a JSON file (fields match `OverlayOptions`).
    /// Flags below are ignored for fields the file provides.
    #[arg(long)]
    options: Option<PathBuf>,

    /// Image source, in stacking order. Repeat for multiple layers.
    #[arg(long = "image")]
    images: Vec<String>,

    /// Layer opacity. One value applies to every layer; repeat for
    /// per-layer values.
    #[arg(long)]
    opacity: Vec<f64>,

    /// Stack position relative to the waveform.
    #[arg(long, value_enum, default_value_t = PositionArg::Overlay)]
    position: PositionArg,

    /// Background color for the bottom layer.
    #[arg(long)]
    background_color: Option<String>,

    /// Ask the host to render its waveform transparent.
    #[arg(long)]
    hide_waveform: bool,

    /// Timeline duration in seconds.
    #[arg(long, default_value_t = 10.0)]
    duration: f64,

    /// Initial pixels-per-second scale.
    #[arg(long = "px-per-sec", default_value_t = 20.0)]
    px_per_sec: f64,

    /// Fire a zoom to this scale after the initial layout.
    #[arg(long)]
    zoom: Option<f64>,

    /// Print the stack as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PositionArg {
    Overlay,
    Underlay,
}

impl From<PositionArg> for Position {
    fn from(arg: PositionArg) -> Self {
        match arg {
            PositionArg::Overlay => Self::Overlay,
            PositionArg::Underlay => Self::Underlay,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Inspect(args) => cmd_inspect(args),
    }
}

fn build_options(args: &InspectArgs) -> anyhow::Result<OverlayOptions> {
    if let Some(path) = &args.options {
        let f = File::open(path).with_context(|| format!("open options '{}'", path.display()))?;
        let options: OverlayOptions =
            serde_json::from_reader(BufReader::new(f)).context("parse options JSON")?;
        return Ok(options);
    }

    let mut options = OverlayOptions::new(args.images.clone());
    options.opacity = match args.opacity.as_slice() {
        [] => None,
        [single] => Some(OpacitySpec::Uniform(*single)),
        many => Some(OpacitySpec::PerLayer(many.to_vec())),
    };
    options.position = args.position.into();
    options.background_color = args.background_color.clone();
    options.hide_waveform = args.hide_waveform;
    Ok(options)
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let options = build_options(&args)?;

    let host = HeadlessHost::new(Some(args.duration), args.duration * args.px_per_sec);
    let compositor = OverlayCompositor::new(options)?;

    for state in compositor.wait_for_images() {
        if let LoadState::Failed { source, reason } = state {
            eprintln!("warning: '{source}' failed to load: {reason}");
        }
    }

    compositor.attach(&host)?;
    host.dispatch(HostEvent::Ready);
    if let Some(px_per_sec) = args.zoom {
        host.dispatch(HostEvent::Zoom(px_per_sec));
    }

    let rows: Vec<serde_json::Value> = host
        .live_elements()
        .iter()
        .map(|record| {
            serde_json::json!({
                "part": record.style.part,
                "width_px": record.style.width_px,
                "paint_priority": record.style.paint_priority,
                "opacity": record.style.opacity,
                "background_image": record.style.background_image,
                "background_color": record.style.background_color,
            })
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!(
        "{:<18} {:>10} {:>9} {:>8}  {}",
        "part", "width", "priority", "opacity", "background"
    );
    for row in &rows {
        println!(
            "{:<18} {:>10} {:>9} {:>8}  {}",
            row["part"].as_str().unwrap_or(""),
            row["width_px"]
                .as_f64()
                .map_or_else(|| "-".to_string(), |w| format!("{w:.1}")),
            row["paint_priority"]
                .as_i64()
                .map_or_else(|| "-".to_string(), |p| p.to_string()),
            format!("{:.2}", row["opacity"].as_f64().unwrap_or(1.0)),
            row["background_image"].as_str().unwrap_or("-"),
        );
    }
    Ok(())
}
