use clap::Parser;
use serde::{Deserialize, Serialize};
use stardist3d::rays::io::load_rays_json;
use stardist3d::{
    Candidates, FaceMesh, LabelRenderer, NmsConfig, RayTemplate, RenderConfig, RenderMode,
    Suppressor, SuppressionStats,
};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "StarDist 3D post-processing CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RenderModeConfig {
    Full,
    Kernel,
    Convex,
    Bbox,
    Debug,
}

impl From<RenderModeConfig> for RenderMode {
    fn from(value: RenderModeConfig) -> Self {
        match value {
            RenderModeConfig::Full => RenderMode::Full,
            RenderModeConfig::Kernel => RenderMode::Kernel,
            RenderModeConfig::Convex => RenderMode::Convex,
            RenderModeConfig::Bbox => RenderMode::Bbox,
            RenderModeConfig::Debug => RenderMode::Debug,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct NmsConfigJson {
    threshold: f32,
    use_bbox: bool,
    verbose: bool,
    parallel: bool,
}

impl Default for NmsConfigJson {
    fn default() -> Self {
        let cfg = NmsConfig::default();
        Self {
            threshold: cfg.threshold,
            use_bbox: cfg.use_bbox,
            verbose: cfg.verbose,
            parallel: cfg.parallel,
        }
    }
}

impl From<&NmsConfigJson> for NmsConfig {
    fn from(value: &NmsConfigJson) -> Self {
        Self {
            threshold: value.threshold,
            use_bbox: value.use_bbox,
            verbose: value.verbose,
            parallel: value.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RenderConfigJson {
    shape: [usize; 3],
    mode: RenderModeConfig,
    use_overlap_label: bool,
    overlap_label: i32,
    parallel: bool,
    label_path: Option<String>,
}

impl Default for RenderConfigJson {
    fn default() -> Self {
        let cfg = RenderConfig::default();
        Self {
            shape: [0; 3],
            mode: RenderModeConfig::Full,
            use_overlap_label: cfg.use_overlap_label,
            overlap_label: cfg.overlap_label,
            parallel: cfg.parallel,
            label_path: None,
        }
    }
}

impl From<&RenderConfigJson> for RenderConfig {
    fn from(value: &RenderConfigJson) -> Self {
        Self {
            mode: value.mode.into(),
            use_overlap_label: value.use_overlap_label,
            overlap_label: value.overlap_label,
            parallel: value.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    candidates_path: String,
    rays_path: Option<String>,
    icosphere_subdivisions: usize,
    prob_thresh: Option<f32>,
    output_path: Option<String>,
    nms: NmsConfigJson,
    render: Option<RenderConfigJson>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            candidates_path: String::new(),
            rays_path: None,
            icosphere_subdivisions: 2,
            prob_thresh: None,
            output_path: None,
            nms: NmsConfigJson::default(),
            render: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct StatsRecord {
    calls_upper: usize,
    calls_lower: usize,
    calls_kernel: usize,
    calls_convex: usize,
    calls_render: usize,
    kept_pretest: usize,
    kept_convex: usize,
    suppressed_pretest: usize,
    suppressed_kernel: usize,
    suppressed_render: usize,
    time_kernel_ms: f64,
    time_convex_ms: f64,
    time_render_ms: f64,
}

impl From<&SuppressionStats> for StatsRecord {
    fn from(value: &SuppressionStats) -> Self {
        Self {
            calls_upper: value.calls_upper,
            calls_lower: value.calls_lower,
            calls_kernel: value.calls_kernel,
            calls_convex: value.calls_convex,
            calls_render: value.calls_render,
            kept_pretest: value.kept_pretest,
            kept_convex: value.kept_convex,
            suppressed_pretest: value.suppressed_pretest,
            suppressed_kernel: value.suppressed_kernel,
            suppressed_render: value.suppressed_render,
            time_kernel_ms: value.time_kernel.as_secs_f64() * 1e3,
            time_convex_ms: value.time_convex.as_secs_f64() * 1e3,
            time_render_ms: value.time_render.as_secs_f64() * 1e3,
        }
    }
}

#[derive(Debug, Serialize)]
struct RenderRecord {
    shape: [usize; 3],
    labeled_voxels: usize,
    label_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct Output {
    n_candidates: usize,
    n_kept: usize,
    /// Indices into the candidate file, in suppression priority order.
    kept: Vec<usize>,
    stats: StatsRecord,
    render: Option<RenderRecord>,
}

fn load_template(config: &Config) -> Result<(RayTemplate, FaceMesh), Box<dyn std::error::Error>> {
    match &config.rays_path {
        Some(path) => Ok(load_rays_json(path)?),
        None => Ok(RayTemplate::icosphere(config.icosphere_subdivisions)),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("stardist3d=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.candidates_path.is_empty() {
        return Err("candidates_path must be set in the config".into());
    }

    let (rays, faces) = load_template(&config)?;
    let mut cands = Candidates::load_json(&config.candidates_path)?;
    if cands.n_rays() != rays.len() && !cands.is_empty() {
        return Err(format!(
            "candidates have {} rays but the ray template has {}",
            cands.n_rays(),
            rays.len()
        )
        .into());
    }
    let n_candidates = cands.len();

    // Indices into the file for every candidate still considered.
    let mut origin: Vec<usize> = (0..n_candidates).collect();
    if let Some(thresh) = config.prob_thresh {
        let above: Vec<bool> = cands.scores().iter().map(|&s| s > thresh).collect();
        cands = cands.select(&above)?;
        origin = origin
            .into_iter()
            .zip(&above)
            .filter_map(|(i, &k)| k.then_some(i))
            .collect();
    }
    let order = cands.sort_by_score_desc();
    let origin: Vec<usize> = order.iter().map(|&k| origin[k]).collect();

    let suppression = Suppressor::new(&rays, &faces)
        .with_config(NmsConfig::from(&config.nms))
        .run(cands.view(), cands.scores())?;
    let kept: Vec<usize> = suppression
        .kept_indices()
        .into_iter()
        .map(|k| origin[k])
        .collect();
    tracing::info!(n_candidates, n_kept = kept.len(), "suppression finished");

    let render = match &config.render {
        Some(render_cfg) => {
            let survivors = cands.select(&suppression.keep)?;
            let volume = LabelRenderer::new(&rays, &faces)
                .with_config(RenderConfig::from(render_cfg))
                .render(survivors.view(), &survivors.default_labels(), render_cfg.shape)?;
            if let Some(path) = &render_cfg.label_path {
                let bytes: Vec<u8> = volume
                    .as_slice()
                    .iter()
                    .flat_map(|v| v.to_le_bytes())
                    .collect();
                fs::write(path, bytes)?;
            }
            Some(RenderRecord {
                shape: volume.dims(),
                labeled_voxels: volume.as_slice().iter().filter(|&&v| v != 0).count(),
                label_path: render_cfg.label_path.clone(),
            })
        }
        None => None,
    };

    let output = Output {
        n_candidates,
        n_kept: kept.len(),
        kept,
        stats: StatsRecord::from(&suppression.stats),
        render,
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
