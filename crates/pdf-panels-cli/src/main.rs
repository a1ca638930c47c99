use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "panels", about = "Wallpaper panel PDF generator", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate panel PDFs for every substrate × height × bleed combination
    Generate {
        /// Source image; prompted for when omitted
        image: Option<PathBuf>,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Design name stamped on the footer (defaults to the image file name)
        #[arg(short, long)]
        design: Option<String>,

        /// Directory holding footer and logo PDFs
        #[arg(long)]
        footer_dir: Option<PathBuf>,

        /// Per-height footer file name template, e.g. "LemonPark{height}_Footer.pdf"
        #[arg(long)]
        footer_template: Option<String>,

        /// Logo PDF, relative to the footer directory
        #[arg(long)]
        logo: Option<PathBuf>,

        /// TTF/OTF font for footer text
        #[arg(long)]
        font: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Panel heights in feet
        #[arg(long, num_args = 1.., value_delimiter = ',')]
        heights: Vec<u32>,

        /// Substrates to generate
        #[arg(long, num_args = 1.., value_delimiter = ',', value_enum)]
        substrates: Vec<SubstrateArg>,

        /// Bleeds to generate
        #[arg(long, num_args = 1.., value_delimiter = ',', value_enum)]
        bleeds: Vec<BleedArg>,

        /// Upscale the footer's embedded raster before compositing
        #[arg(long)]
        optimize_footer: bool,

        /// Show the planned layouts only, don't generate PDFs
        #[arg(long)]
        plan_only: bool,
    },

    /// Upscale and sharpen the raster inside a footer PDF
    OptimizeFooter {
        /// Footer PDF to optimize
        #[arg(short, long)]
        input: PathBuf,

        /// Optimized footer PDF
        #[arg(short, long)]
        output: PathBuf,

        /// Upscale factor
        #[arg(long, default_value = "4.0")]
        upscale: f32,

        /// Sharpness factor
        #[arg(long, default_value = "1.2")]
        sharpness: f32,
    },

    /// Print the default configuration as JSON
    Config {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SubstrateArg {
    Trad,
    PeelAndStick,
    PrePasted,
}

#[derive(Clone, Copy, ValueEnum)]
enum BleedArg {
    #[value(name = "2")]
    Mm2,
    #[value(name = "3")]
    Mm3,
}

impl From<SubstrateArg> for pdf_panels::Substrate {
    fn from(arg: SubstrateArg) -> Self {
        match arg {
            SubstrateArg::Trad => Self::Traditional,
            SubstrateArg::PeelAndStick => Self::PeelAndStick,
            SubstrateArg::PrePasted => Self::PrePasted,
        }
    }
}

impl From<BleedArg> for pdf_panels::Bleed {
    fn from(arg: BleedArg) -> Self {
        match arg {
            BleedArg::Mm2 => Self::Mm2,
            BleedArg::Mm3 => Self::Mm3,
        }
    }
}

fn prompt_for_image() -> Result<PathBuf> {
    print!("Enter the full path to the image file: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let trimmed = line.trim().trim_matches('"');
    if trimmed.is_empty() {
        bail!("No image path given");
    }
    Ok(PathBuf::from(trimmed))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            image,
            config,
            design,
            footer_dir,
            footer_template,
            logo,
            font,
            output_dir,
            heights,
            substrates,
            bleeds,
            optimize_footer,
            plan_only,
        } => {
            let mut options = match &config {
                Some(path) => pdf_panels::PanelConfig::load(path)
                    .await
                    .with_context(|| format!("loading {}", path.display()))?,
                None => pdf_panels::PanelConfig::default(),
            };

            if let Some(dir) = footer_dir {
                options.footer_dir = dir;
            }
            if let Some(template) = footer_template {
                options.footer = pdf_panels::FooterSelection::PerHeight { template };
            }
            if logo.is_some() {
                options.logo_file = logo;
            }
            if font.is_some() {
                options.font_path = font;
            }
            if let Some(dir) = output_dir {
                options.output_dir = dir;
            }
            if !heights.is_empty() {
                options.heights_ft = heights;
            }
            if !substrates.is_empty() {
                options.substrates = substrates.into_iter().map(Into::into).collect();
            }
            if !bleeds.is_empty() {
                options.bleeds = bleeds.into_iter().map(Into::into).collect();
            }
            if optimize_footer {
                options.footer_optimization.enabled = true;
            }
            options.validate()?;

            let image = match image {
                Some(image) => image,
                None => prompt_for_image()?,
            };
            if !image.is_file() {
                bail!("The specified image file '{}' does not exist", image.display());
            }
            let design = design.unwrap_or_else(|| pdf_panels::design_name_from_path(&image));

            if plan_only {
                let dims = pdf_panels::source_dimensions(&image)?;
                let plans = pdf_panels::plan_batch(dims, &design, &options)?;
                println!("Panel Plan ({}x{} px source):", dims.0, dims.1);
                for plan in &plans {
                    println!(
                        "  {}: {:.2}x{:.2} pt, {} tiles of {}x{} px, overshoot {:.2} pt, {:?} footer{}",
                        plan.spec.output_file_name(),
                        plan.layout.page_width,
                        plan.layout.page_height,
                        plan.layout.tile_count,
                        plan.layout.tile_px_width,
                        plan.layout.tile_px_height,
                        plan.layout.overshoot,
                        plan.strategy,
                        if plan.resolution.is_undersized() {
                            " (source below target dpi)"
                        } else {
                            ""
                        }
                    );
                }
                return Ok(());
            }

            let report = pdf_panels::generate_batch(&image, &design, &options).await?;

            println!("Panel Generation Summary:");
            for doc in report.succeeded() {
                println!("  Created {}", doc.path.display());
            }
            for (spec, err) in report.failed() {
                println!("  Failed {}: {}", spec.output_file_name(), err);
            }
            println!(
                "  {} of {} panels generated",
                report.succeeded().count(),
                report.outcomes.len()
            );

            if !report.is_success() {
                std::process::exit(1);
            }
        }

        Commands::OptimizeFooter {
            input,
            output,
            upscale,
            sharpness,
        } => {
            let options = pdf_panels::FooterOptimization {
                enabled: true,
                upscale_factor: upscale,
                sharpness_factor: sharpness,
            };
            let workspace = pdf_panels::Workspace::create(None)?;
            let result = pdf_panels::optimize_footer(&input, &output, &options, &workspace)?;
            if result == input {
                println!("No embedded image in {}, nothing to optimize", input.display());
            } else {
                println!("Optimized footer → {}", result.display());
            }
        }

        Commands::Config { output } => {
            let defaults = pdf_panels::PanelConfig::default();
            match output {
                Some(path) => {
                    defaults.save(&path).await?;
                    println!("Default configuration → {}", path.display());
                }
                None => println!("{}", defaults.to_json()?),
            }
        }
    }

    Ok(())
}
