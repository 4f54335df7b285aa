use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::asset::Assets;
use crate::config::GalleryConfig;
use crate::page::{Demo, Report};
use crate::param::{ParamState, ParamValue};
use crate::registry;
use crate::scripting::ScriptEngine;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available pages
    List,

    /// Print a page's controls with their default values
    Panel {
        /// Page id, e.g. chapter03/point-light
        page: String,
    },

    /// Mount a page, run it headless and print the resulting scene
    Run {
        /// Page id, e.g. chapter03/point-light
        page: String,

        /// Number of frames to run
        #[arg(long)]
        frames: Option<u64>,

        /// Seconds per frame
        #[arg(long)]
        dt: Option<f32>,

        /// Set a parameter before running (repeatable), e.g. --set opacity=0.5
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// JSON object of parameter values
        #[arg(long)]
        params: Option<PathBuf>,

        /// Rhai script defining update(frame, params)
        #[arg(long)]
        script: Option<PathBuf>,

        /// Directory models and textures are loaded from
        #[arg(long)]
        assets: Option<PathBuf>,

        /// JSON file of run settings
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Everything `gallery run` needs, after the config file and flags are merged.
pub struct RunOptions {
    pub config: GalleryConfig,
    pub params: ParamState,
    pub sets: Vec<(String, ParamValue)>,
    pub script: Option<String>,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::List => {
            for (id, title, chapter) in registry::pages() {
                println!("{:>2}  {:<34} {}", chapter, id, title);
            }
        }
        Commands::Panel { page } => {
            let page = registry::create(&page).ok_or_else(|| unknown_page(&page))?;
            println!("{} ({})", page.title(), page.id());
            print!("{}", page.panel().describe(&page.defaults()));
        }
        Commands::Run {
            page,
            frames,
            dt,
            set,
            params,
            script,
            assets,
            config,
            json,
        } => {
            let mut run_config = match &config {
                Some(path) => GalleryConfig::load(path)?,
                None => GalleryConfig::default(),
            };
            if let Some(frames) = frames {
                run_config.frames = frames;
            }
            if let Some(dt) = dt {
                run_config.dt = dt;
            }
            if let Some(assets) = assets {
                run_config.asset_root = assets;
            }

            let params = match &params {
                Some(path) => {
                    let text = fs::read_to_string(path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    ParamState::from_json(&text)
                        .with_context(|| format!("invalid parameters in {}", path.display()))?
                }
                None => ParamState::new(),
            };
            let sets = set
                .iter()
                .map(|raw| parse_set(raw))
                .collect::<Result<Vec<_>>>()?;
            let script = match &script {
                Some(path) => Some(
                    fs::read_to_string(path)
                        .with_context(|| format!("failed to read {}", path.display()))?,
                ),
                None => None,
            };

            let report = run_page(
                &page,
                RunOptions {
                    config: run_config,
                    params,
                    sets,
                    script,
                },
            )?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", describe_report(&report));
            }
        }
    }
    Ok(())
}

fn unknown_page(id: &str) -> anyhow::Error {
    anyhow!("unknown page '{}' (see `gallery list`)", id)
}

/// Parse one `--set key=value` argument.
pub fn parse_set(raw: &str) -> Result<(String, ParamValue)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        bail!("missing key in '{}'", raw);
    }
    Ok((key.to_string(), ParamValue::parse_literal(value)))
}

/// Mount a page, apply parameters, run the configured frames and unmount.
/// The report is taken before unmounting.
pub fn run_page(id: &str, options: RunOptions) -> Result<Report> {
    let page = registry::create(id).ok_or_else(|| unknown_page(id))?;
    let mut demo = Demo::new(page, Assets::new(&options.config.asset_root));

    if let Some(source) = &options.script {
        let mut engine = ScriptEngine::new();
        engine.load_script(source)?;
        demo.set_script(engine);
    }

    demo.mount()?;
    demo.edit_all(&options.params)?;
    for (key, value) in options.sets {
        demo.edit(&key, value)
            .with_context(|| format!("failed to set '{}'", key))?;
    }

    log::info!(
        "running {} for {} frames of {}s",
        id,
        options.config.frames,
        options.config.dt
    );
    demo.run(options.config.frames, options.config.dt);
    let report = demo.report();
    demo.unmount();
    Ok(report)
}

/// Plain-text rendering of a run report.
pub fn describe_report(report: &Report) -> String {
    let mut out = format!("{} after {} frames\n", report.page, report.frames);
    out.push_str("parameters:\n");
    for (path, value) in report.params.values() {
        out.push_str(&format!("  {:<28} {}\n", path, value));
    }
    out.push_str(&format!("entities ({}):\n", report.entities.len()));
    for e in &report.entities {
        let p = e.transform.position;
        let mut line = format!(
            "  #{:<4} {:<16} {:<14} ({:.2}, {:.2}, {:.2})",
            e.id.0, e.kind, e.name, p.x, p.y, p.z
        );
        if let Some(parent) = e.parent {
            line.push_str(&format!(" parent=#{}", parent.0));
        }
        if !e.visible {
            line.push_str(" hidden");
        }
        if let Some(color) = e.color {
            line.push_str(&format!(" color={}", color.to_hex()));
        }
        if let Some(opacity) = e.opacity {
            line.push_str(&format!(" opacity={:.2}", opacity));
        }
        if let Some(count) = e.count {
            line.push_str(&format!(" count={}", count));
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}
