use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "strata", version)]
struct Cli {
    /// Log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render every layer of a scene to PNG files.
    Render(RenderArgs),
    /// Parse and validate a scene file.
    Check(CheckArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Directory receiving one `<z>_<layer>.png` per layer.
    #[arg(long)]
    out_dir: PathBuf,

    /// Fallback font file for text whose family the scene does not list.
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Check(args) => cmd_check(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn read_scene(path: &Path) -> anyhow::Result<strata::SceneConfig> {
    let scene = strata::SceneConfig::from_path(path)
        .with_context(|| format!("load scene '{}'", path.display()))?;
    scene
        .validate()
        .with_context(|| format!("validate scene '{}'", path.display()))?;
    Ok(scene)
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let scene = read_scene(&args.in_path)?;
    println!(
        "ok: {}x{} canvas, {} layers, {} images, {} fonts, {} nodes",
        scene.canvas.width,
        scene.canvas.height,
        scene.layers.len(),
        scene.images.len(),
        scene.fonts.len(),
        scene.nodes.len()
    );
    for layer in &scene.layers {
        let count = scene
            .nodes
            .iter()
            .filter(|n| &n.common().layer == layer)
            .count();
        println!("  {layer}: {count} nodes");
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let scene = read_scene(&args.in_path)?;
    let root = args.in_path.parent().unwrap_or_else(|| Path::new("."));

    let mut opts = strata::CpuSurfaceOpts::default();
    if let Some(path) = &args.font {
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        opts = opts.with_font("fallback", bytes);
    }
    for (family, rel) in &scene.fonts {
        let path = root.join(rel);
        let bytes =
            std::fs::read(&path).with_context(|| format!("read font '{}'", path.display()))?;
        opts = opts.with_font(family.clone(), bytes);
    }

    let images: BTreeMap<String, strata::ImageResource> = scene
        .images
        .keys()
        .map(|key| (key.clone(), strata::ImageResource::pending(key.clone())))
        .collect();

    let (stage, mut nodes) = strata::Stage::from_scene(&scene, &images, |_, canvas| {
        Ok(Box::new(strata::CpuSurface::new(canvas, &opts)?) as Box<dyn strata::Surface>)
    })?;

    for node in &mut nodes {
        node.update();
        node.draw();
    }

    // Image draws issued above are waiting; settle each resource so queued draws run.
    for (key, rel) in &scene.images {
        let Some(resource) = images.get(key) else {
            continue;
        };
        let path = root.join(rel);
        match std::fs::read(&path) {
            Ok(bytes) => resource.load_bytes(&bytes),
            Err(e) => resource.fail(format!("read '{}': {e}", path.display())),
        }
    }

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;

    for layer in stage.layers_by_z() {
        if layer.is_loading() {
            tracing::warn!(layer = %layer.name(), "layer still loading at export");
        }
        let frame = layer
            .snapshot()
            .with_context(|| format!("layer '{}' has no pixels", layer.name()))?
            .into_straight();
        let out = args
            .out_dir
            .join(format!("{}_{}.png", layer.z_index(), layer.name()));
        image::save_buffer_with_format(
            &out,
            &frame.data,
            frame.width,
            frame.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", out.display()))?;
        eprintln!("wrote {}", out.display());
    }
    Ok(())
}
