use somno_lib::{
    classify::SleepStage,
    features::FEATURE_KEYS,
    pipeline::{PipelineConfig, SleepStagePipeline, WindowInput, WindowResult},
};
use somno_synth::{synth_window, SynthConfig};
use std::error::Error;

const WIN_SEC: f64 = 60.0;

fn pipeline() -> SleepStagePipeline {
    SleepStagePipeline::new(PipelineConfig {
        fs_ecg: 128.0,
        fs_ppg: 64.0,
        fs_imu: 32.0,
        fs_eda: None,
        win_sec: WIN_SEC,
    })
    .expect("valid config")
}

fn run_stage(stage: &str) -> Result<WindowResult, Box<dyn Error>> {
    let cfg = SynthConfig {
        win_sec: WIN_SEC,
        seed: 42,
        ..SynthConfig::default()
    };
    let window = synth_window(stage, &cfg)?;
    let input = WindowInput {
        ecg: window.ecg,
        ppg: window.ppg,
        imu: window.imu.into(),
        eda: None,
    };
    Ok(pipeline().process_window(&input))
}

fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected}, got {actual} (tol {tol})"
    );
}

#[test]
fn deep_window_is_deep() -> Result<(), Box<dyn Error>> {
    let result = run_stage("deep")?;
    assert_eq!(result.label, SleepStage::Deep, "reason: {}", result.reason);
    assert!(result.reason.starts_with("HR="));
    assert_close(result.features.hr.expect("HR"), 55.0, 3.0);
    assert!(result.features.act.expect("ACT") < 0.05);
    Ok(())
}

#[test]
fn wake_window_is_wake() -> Result<(), Box<dyn Error>> {
    let result = run_stage("wake")?;
    assert_eq!(result.label, SleepStage::Wake, "reason: {}", result.reason);
    assert_close(result.features.hr.expect("HR"), 100.0, 5.0);
    assert!(result.features.act.expect("ACT") >= 0.15);
    Ok(())
}

#[test]
fn rem_window_follows_rem_rule() -> Result<(), Box<dyn Error>> {
    let result = run_stage("rem")?;
    let f = &result.features;
    let rem_rule = matches!(
        (f.hr, f.rmssd, f.act),
        (Some(hr), Some(rmssd), Some(act)) if hr >= 65.0 && rmssd <= 0.05 && act <= 0.10
    );
    let expected = if rem_rule {
        SleepStage::Rem
    } else {
        SleepStage::Light
    };
    assert_eq!(result.label, expected, "reason: {}", result.reason);
    Ok(())
}

#[test]
fn every_stage_yields_causal_transit_time() -> Result<(), Box<dyn Error>> {
    for stage in ["deep", "light", "rem", "wake"] {
        let result = run_stage(stage)?;
        let ptt = result.features.ptt.expect("PTT");
        assert!(ptt > 0.0 && ptt < 2.0, "{stage}: ptt {ptt}");
        assert!(!result.ppg_peaks.is_empty());
        assert!(result
            .r_peaks
            .indices
            .windows(2)
            .all(|w| w[1] > w[0]));
    }
    Ok(())
}

#[test]
fn silent_window_has_no_cardiac_features() {
    let pipeline = pipeline();
    let sizes = pipeline.window_sizes();
    let input = WindowInput {
        ecg: vec![0.0; sizes.ecg],
        ppg: vec![0.0; sizes.ppg],
        imu: vec![[0.0; 3]; sizes.imu].into(),
        eda: None,
    };
    let result = pipeline.process_window(&input);
    let f = &result.features;
    for value in [f.hr, f.sdnn, f.rmssd, f.lf_hf, f.rsa, f.ptt] {
        assert_eq!(value, None);
    }
    assert_eq!(f.ppg_lf_rel, Some(0.0));
    assert_eq!(f.ppg_hf_rel, Some(0.0));
    assert_eq!(f.act, Some(0.0));
    assert_eq!(result.label, SleepStage::Light);
    assert_eq!(result.reason, "no stage rule matched → Light");
}

#[test]
fn result_serializes_with_fixed_field_names() -> Result<(), Box<dyn Error>> {
    let result = run_stage("deep")?;
    let json = serde_json::to_value(&result)?;
    let obj = json.as_object().expect("object");
    for field in [
        "Label",
        "Reason",
        "Features",
        "Vector",
        "Keys",
        "R_peaks",
        "PPG_peaks",
        "PPG_feet",
        "EDA_tonic",
    ] {
        assert!(obj.contains_key(field), "missing {field}");
    }
    assert_eq!(json["Label"], "Deep");
    assert_eq!(json["Keys"], serde_json::json!(FEATURE_KEYS));
    assert_eq!(json["Vector"].as_array().map(Vec::len), Some(9));
    assert!(json["EDA_tonic"].is_null());
    for (key, value) in result.features.iter() {
        if let Some(v) = value {
            assert!(!v.is_sign_negative(), "{key} = {v}");
        }
    }

    let back: WindowResult = serde_json::from_value(json)?;
    assert_eq!(back.label, result.label);
    assert_eq!(back.r_peaks, result.r_peaks);
    Ok(())
}
