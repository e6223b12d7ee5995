use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use somno_lib::{
    features::FeatureSet,
    io::{imu as imu_io, text as text_io},
    pipeline::{PipelineConfig, SleepStagePipeline, WindowInput, WindowResult},
};
use somno_synth::{synth_stage_window, SynthConfig, SynthStage};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "somno",
    version,
    about = "Somno: per-window sleep staging from ECG, PPG and accelerometry"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize one window per stage and classify each
    Demo {
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 60.0)]
        win_sec: f64,
        /// Print full results as JSON instead of a summary table
        #[arg(long)]
        json: bool,
    },
    /// Classify one window read from newline-delimited ECG/PPG files and an IMU CSV
    /// (x,y,z columns or a single magnitude column)
    Classify {
        #[arg(long)]
        ecg: PathBuf,
        #[arg(long)]
        ppg: PathBuf,
        #[arg(long)]
        imu: PathBuf,
        #[arg(long)]
        eda: Option<PathBuf>,
        /// TOML file with pipeline settings; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        fs_ecg: Option<f64>,
        #[arg(long)]
        fs_ppg: Option<f64>,
        #[arg(long)]
        fs_imu: Option<f64>,
        #[arg(long)]
        fs_eda: Option<f64>,
        #[arg(long)]
        win_sec: Option<f64>,
    },
    /// Write a synthetic window (ecg.txt, ppg.txt, imu.csv, truth.json) to a directory
    Synth {
        #[arg(long)]
        stage: String,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 60.0)]
        win_sec: f64,
    },
}

struct RateOverrides {
    fs_ecg: Option<f64>,
    fs_ppg: Option<f64>,
    fs_imu: Option<f64>,
    fs_eda: Option<f64>,
    win_sec: Option<f64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Demo {
            seed,
            win_sec,
            json,
        } => cmd_demo(seed, win_sec, json)?,
        Commands::Classify {
            ecg,
            ppg,
            imu,
            eda,
            config,
            fs_ecg,
            fs_ppg,
            fs_imu,
            fs_eda,
            win_sec,
        } => {
            let overrides = RateOverrides {
                fs_ecg,
                fs_ppg,
                fs_imu,
                fs_eda,
                win_sec,
            };
            let cfg = load_config(config.as_deref(), &overrides)?;
            cmd_classify(cfg, &ecg, &ppg, &imu, eda.as_deref())?
        }
        Commands::Synth {
            stage,
            out,
            seed,
            win_sec,
        } => cmd_synth(&stage, &out, seed, win_sec)?,
    }
    Ok(())
}

fn load_config(path: Option<&Path>, overrides: &RateOverrides) -> Result<PipelineConfig> {
    let mut cfg = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };
    if let Some(rate) = overrides.fs_ecg {
        cfg.fs_ecg = rate;
    }
    if let Some(rate) = overrides.fs_ppg {
        cfg.fs_ppg = rate;
    }
    if let Some(rate) = overrides.fs_imu {
        cfg.fs_imu = rate;
    }
    if overrides.fs_eda.is_some() {
        cfg.fs_eda = overrides.fs_eda;
    }
    if let Some(win_sec) = overrides.win_sec {
        cfg.win_sec = win_sec;
    }
    Ok(cfg)
}

fn cmd_classify(
    cfg: PipelineConfig,
    ecg: &Path,
    ppg: &Path,
    imu: &Path,
    eda: Option<&Path>,
) -> Result<()> {
    let pipeline = SleepStagePipeline::new(cfg).context("invalid pipeline configuration")?;
    let input = WindowInput {
        ecg: text_io::read_f64_series(ecg)?,
        ppg: text_io::read_f64_series(ppg)?,
        imu: imu_io::read_imu_csv(imu)?,
        eda: eda.map(text_io::read_f64_series).transpose()?,
    };
    let result = pipeline.process_window(&input);
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

#[derive(Serialize)]
struct DemoEntry {
    stage: SynthStage,
    result: WindowResult,
}

fn format_features(features: &FeatureSet) -> String {
    features
        .iter()
        .map(|(key, value)| match value {
            Some(v) => format!("{key}={v:.3}"),
            None => format!("{key}=N/A"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn cmd_demo(seed: u64, win_sec: f64, json: bool) -> Result<()> {
    let synth_cfg = SynthConfig {
        win_sec,
        seed,
        ..SynthConfig::default()
    };
    let pipeline = SleepStagePipeline::new(PipelineConfig {
        fs_ecg: synth_cfg.fs_ecg,
        fs_ppg: synth_cfg.fs_ppg,
        fs_imu: synth_cfg.fs_imu,
        fs_eda: None,
        win_sec,
    })
    .context("invalid pipeline configuration")?;

    let mut entries = Vec::with_capacity(SynthStage::ALL.len());
    for stage in SynthStage::ALL {
        let window = synth_stage_window(stage, &synth_cfg)?;
        let result = pipeline.process_window(&WindowInput {
            ecg: window.ecg,
            ppg: window.ppg,
            imu: window.imu.into(),
            eda: None,
        });
        entries.push(DemoEntry { stage, result });
    }

    if json {
        println!("{}", serde_json::to_string(&entries)?);
    } else {
        for entry in &entries {
            println!(
                "[{}] label={} | {}",
                entry.stage, entry.result.label, entry.result.reason
            );
            println!("    {}", format_features(&entry.result.features));
        }
    }
    Ok(())
}

fn cmd_synth(stage: &str, out: &Path, seed: u64, win_sec: f64) -> Result<()> {
    let stage: SynthStage = stage.parse()?;
    let cfg = SynthConfig {
        win_sec,
        seed,
        ..SynthConfig::default()
    };
    let window = synth_stage_window(stage, &cfg)?;
    fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
    text_io::write_f64_series(&out.join("ecg.txt"), &window.ecg)?;
    text_io::write_f64_series(&out.join("ppg.txt"), &window.ppg)?;
    imu_io::write_imu_csv(&out.join("imu.csv"), &window.imu)?;
    let truth_path = out.join("truth.json");
    fs::write(&truth_path, serde_json::to_string_pretty(&window.truth)?)
        .with_context(|| format!("failed to write {}", truth_path.display()))?;
    info!("wrote {stage} window ({} s, seed {seed}) to {}", win_sec, out.display());
    Ok(())
}
