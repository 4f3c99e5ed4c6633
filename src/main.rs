use clap::{Parser, ValueEnum};
use image::ImageReader;
use std::path::PathBuf;

use micromet::analysis::inclusion::{InclusionMethod, InclusionParams};
use micromet::analysis::nodularity::NodularityParams;
use micromet::analysis::phase::{PhaseDef, PhaseParams};
use micromet::analysis::porosity::PorosityParams;
use micromet::{
    InclusionAnalyzer, NodularityAnalyzer, PhaseAnalyzer, PorosityAnalyzer, Unit,
};

#[derive(Parser)]
#[command(name = "micromet")]
#[command(about = "Measure and classify features in metallographic micrographs")]
struct Cli {
    /// Path to input micrograph
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// Analysis mode
    #[arg(short, long, value_enum, default_value_t = Mode::Porosity)]
    mode: Mode,

    /// Calibration factor in microns per pixel
    #[arg(long, default_value_t = 1.0)]
    calibration: f64,

    /// Report measurements in raw pixels instead of microns
    #[arg(long)]
    pixels: bool,

    /// Lower intensity bound (porosity)
    #[arg(long, default_value_t = 0)]
    min_threshold: u8,

    /// Upper intensity bound (porosity)
    #[arg(long, default_value_t = 255)]
    max_threshold: u8,

    /// Treat bright pixels as features (porosity; default targets dark pores)
    #[arg(long)]
    bright_features: bool,

    /// Binarization threshold (nodularity)
    #[arg(long, default_value_t = 128)]
    threshold: u8,

    /// Circularity cutoff for nodule classification
    #[arg(long, default_value_t = 0.5)]
    cutoff: f64,

    /// Inclusion rating method
    #[arg(long, value_enum, default_value_t = MethodArg::Default)]
    method: MethodArg,

    /// Phase definition as name=min..max, repeatable (phase mode)
    #[arg(long = "phase", value_name = "NAME=MIN..MAX")]
    phases: Vec<String>,

    /// Write the annotated verification image here
    #[arg(long, value_name = "PATH")]
    annotated_out: Option<PathBuf>,

    /// Print the full report as JSON instead of a summary
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Porosity,
    Nodularity,
    Inclusion,
    Phase,
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Default,
    MethodC,
    MethodD,
}

impl From<MethodArg> for InclusionMethod {
    fn from(value: MethodArg) -> Self {
        match value {
            MethodArg::Default => InclusionMethod::Default,
            MethodArg::MethodC => InclusionMethod::MethodC,
            MethodArg::MethodD => InclusionMethod::MethodD,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    if args.verbose {
        println!("Loading image: {:?}", args.image_path);
    }
    let img = ImageReader::open(&args.image_path)?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?;
    if args.verbose {
        println!("Image loaded: {}x{}\n", img.width(), img.height());
    }

    let unit = if args.pixels {
        Unit::Pixels
    } else {
        Unit::Microns
    };

    match args.mode {
        Mode::Porosity => {
            let mut analyzer = PorosityAnalyzer::new();
            analyzer.set_calibration(args.calibration)?;
            let params = PorosityParams {
                unit,
                dark_features: !args.bright_features,
                min_threshold: args.min_threshold,
                max_threshold: args.max_threshold,
                ..Default::default()
            };
            let report = analyzer.analyze(&img, &params)?;
            if let Some(path) = &args.annotated_out {
                report.annotated.save(path)?;
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            println!("=== Porosity Results ===");
            println!("Pores found: {}", report.measurements.len());
            if let Some(mean) = report.statistics.mean_area {
                println!("Mean area: {:.2}", mean);
            }
            if args.verbose {
                for m in &report.measurements {
                    println!(
                        "  Pore {} at ({:.1}%, {:.1}%) - area: {:.1}, circularity: {:.2}",
                        m.id, m.x, m.y, m.area, m.circularity
                    );
                }
            }
        }
        Mode::Nodularity => {
            let mut analyzer = NodularityAnalyzer::new();
            analyzer.set_calibration(args.calibration)?;
            analyzer.set_circularity_cutoff(args.cutoff);
            let params = NodularityParams {
                unit,
                threshold: args.threshold,
                ..Default::default()
            };
            let report = analyzer.analyze(&img, &params)?;
            if let Some(path) = &args.annotated_out {
                report.annotated.save(path)?;
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            println!("=== Nodularity Results ===");
            println!(
                "Nodules: {} of {} features ({:.1}%)",
                report.statistics.total_nodules,
                report.statistics.total_features,
                report.statistics.nodularity_percent
            );
            if args.verbose {
                for (i, count) in report.statistics.size_distribution.iter().enumerate() {
                    println!("  Size category {}: {}", i + 1, count);
                }
            }
        }
        Mode::Inclusion => {
            let mut analyzer = InclusionAnalyzer::new();
            analyzer.set_calibration(args.calibration)?;
            let params = InclusionParams {
                method: args.method.into(),
                unit,
                ..Default::default()
            };
            let report = analyzer.analyze(&img, &params)?;
            if let Some(path) = &args.annotated_out {
                report.annotated.save(path)?;
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            println!("=== Inclusion Results ===");
            println!("Inclusions rated: {}", report.measurements.len());
            let c = &report.counts;
            println!("  A (sulfide):        thin {}, thick {}", c.a.thin, c.a.thick);
            println!("  B (alumina):        thin {}, thick {}", c.b.thin, c.b.thick);
            println!("  C (silicate):       thin {}, thick {}", c.c.thin, c.c.thick);
            println!("  D (globular oxide): thin {}, thick {}", c.d.thin, c.d.thick);
        }
        Mode::Phase => {
            let analyzer = PhaseAnalyzer::new();
            let phases = args
                .phases
                .iter()
                .map(|s| parse_phase(s))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let params = PhaseParams {
                phases,
                ..Default::default()
            };
            let report = analyzer.analyze(&img, &params)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            println!("=== Phase Results ===");
            for phase in &report.phases {
                println!(
                    "  {}: {:.2}% ({} px)",
                    phase.name, phase.percentage, phase.area_px
                );
            }
        }
    }

    Ok(())
}

/// Parses a `name=min..max` phase definition.
fn parse_phase(spec: &str) -> anyhow::Result<PhaseDef> {
    let (name, range) = spec
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Expected name=min..max, got '{}'", spec))?;
    let (min, max) = range
        .split_once("..")
        .ok_or_else(|| anyhow::anyhow!("Expected min..max in '{}'", spec))?;
    let min: u8 = min
        .parse()
        .map_err(|_| anyhow::anyhow!("Bad lower bound in '{}'", spec))?;
    let max: u8 = max
        .parse()
        .map_err(|_| anyhow::anyhow!("Bad upper bound in '{}'", spec))?;
    Ok(PhaseDef {
        name: name.to_string(),
        intensity: Some((min, max)),
        shape: None,
    })
}
