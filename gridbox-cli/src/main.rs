use clap::Parser;
use gridbox::{AnchorSet, Detection, Detector, DetectorConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "GridBox CLI (JSON config driven)")]
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
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DetectorConfigJson {
    grid_rows: usize,
    grid_cols: usize,
    max_anchors: usize,
    stride: f32,
    bias: f32,
    score_threshold: f32,
    iou_threshold: f32,
    max_boxes: usize,
}

impl Default for DetectorConfigJson {
    fn default() -> Self {
        let cfg = DetectorConfig::default();
        Self {
            grid_rows: cfg.grid_rows,
            grid_cols: cfg.grid_cols,
            max_anchors: cfg.max_anchors,
            stride: cfg.stride,
            bias: cfg.bias,
            score_threshold: cfg.score_threshold,
            iou_threshold: cfg.iou_threshold,
            max_boxes: cfg.max_boxes,
        }
    }
}

impl From<DetectorConfigJson> for DetectorConfig {
    fn from(value: DetectorConfigJson) -> Self {
        Self {
            grid_rows: value.grid_rows,
            grid_cols: value.grid_cols,
            max_anchors: value.max_anchors,
            stride: value.stride,
            bias: value.bias,
            score_threshold: value.score_threshold,
            iou_threshold: value.iou_threshold,
            max_boxes: value.max_boxes,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    tensor_path: String,
    output_path: Option<String>,
    anchors: Vec<[f32; 4]>,
    detector: DetectorConfigJson,
}

/// Tensor file: either a bare array or `{ "data": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TensorFile {
    Flat(Vec<f32>),
    Wrapped { data: Vec<f32> },
}

impl TensorFile {
    fn into_data(self) -> Vec<f32> {
        match self {
            TensorFile::Flat(data) | TensorFile::Wrapped { data } => data,
        }
    }
}

#[derive(Debug, Serialize)]
struct BoxRecord {
    center_x: f32,
    center_y: f32,
    width: f32,
    height: f32,
    corners: [f32; 4],
    score: f32,
    anchor: usize,
    row: usize,
    col: usize,
}

impl From<Detection> for BoxRecord {
    fn from(value: Detection) -> Self {
        Self {
            center_x: value.bbox.center_x,
            center_y: value.bbox.center_y,
            width: value.bbox.width,
            height: value.bbox.height,
            corners: value.to_corners(),
            score: value.score,
            anchor: value.anchor,
            row: value.row,
            col: value.col,
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    count: usize,
    boxes: Vec<BoxRecord>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("gridbox=debug".parse()?))
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
    if config.tensor_path.is_empty() {
        return Err("tensor_path must be set in the config".into());
    }

    let anchors = AnchorSet::from_rows(&config.anchors)?;
    let detector = Detector::new(config.detector.into(), anchors)?;

    let tensor_text = fs::read_to_string(&config.tensor_path)?;
    let tensor: TensorFile = serde_json::from_str(&tensor_text)?;
    let data = tensor.into_data();
    info!(
        values = data.len(),
        expected = detector.tensor_len(),
        "loaded prediction tensor"
    );

    let boxes = detector.detect(&data)?;
    let output = Output {
        count: boxes.len(),
        boxes: boxes.into_iter().map(BoxRecord::from).collect(),
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
