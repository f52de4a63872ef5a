use clap::Parser;
use std::num::NonZeroUsize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sonoterra", about = "Turn audio files into cylindrical relief meshes (binary STL)")]
pub struct Cli {
    /// Input audio files (WAV, MP3, FLAC, OGG, AAC)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory the .stl files are written to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Config file (defaults to ./sonoterra.toml, then the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Circumferential segments, one per magnitude
    #[arg(long)]
    pub width_segments: Option<NonZeroUsize>,

    /// Rings along the cylinder axis, minus one
    #[arg(long)]
    pub height_segments: Option<NonZeroUsize>,

    /// Radius of the top ring
    #[arg(long)]
    pub radius_top: Option<f32>,

    /// Radius of the bottom ring
    #[arg(long)]
    pub radius_bottom: Option<f32>,

    /// Cylinder height
    #[arg(long)]
    pub height: Option<f32>,

    /// Displacement per unit of mean amplitude
    #[arg(long)]
    pub height_scale: Option<f32>,

    /// Leave the top and bottom open
    #[arg(long)]
    pub no_caps: bool,
}
