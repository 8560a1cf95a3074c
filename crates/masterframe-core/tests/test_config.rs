use std::path::PathBuf;

use masterframe_core::combine::CombineMethod;
use masterframe_core::error::MasterFrameError;
use masterframe_core::io::loader::StatSection;
use masterframe_core::pipeline::config::{CombineConfig, RejectMethod, StageConfig};
use masterframe_core::pipeline::PipelineStage;
use masterframe_core::reject::RejectionPolicy;
use masterframe_core::scale::ScalingPolicy;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

#[test]
fn test_combine_config_defaults() {
    let c = CombineConfig::default();
    assert_eq!(c.combine_method, CombineMethod::Median);
    assert_eq!(c.reject_method, RejectMethod::None);
    assert_eq!((c.nlow, c.nhigh), (1, 1));
    assert_eq!((c.low_sigma, c.high_sigma), (3.0, 3.0));
    assert_eq!(c.max_iterations, 10);
    assert_eq!((c.low_pct, c.high_pct), (10.0, 90.0));
    assert_eq!(c.scale, ScalingPolicy::None);
    assert_eq!(c.statsec, None);
    assert_eq!(c.blank, 0.0);
    assert!(!c.overwrite);
    assert!(c.validate().is_ok());
}

#[test]
fn test_minimal_toml_uses_defaults() {
    let config = StageConfig::from_toml_str(r#"output = "master_bias.fits""#).unwrap();
    assert_eq!(config.stage, "bias");
    assert!(config.inputs.is_empty());
    assert_eq!(config.output, PathBuf::from("master_bias.fits"));
    assert_eq!(config.combine, CombineConfig::default());
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[test]
fn test_full_toml() {
    let toml = r#"
stage = "flat"
inputs = ["flat_001.fits", "flat_002.fits", "flat_003.fits"]
output = "masters/master_flat.fits"

[combine]
combine_method = "average"
reject_method = "sigclip"
low_sigma = 2.0
high_sigma = 2.5
max_iterations = 4
scale = "mode"
statsec = [10, 90, 20, 80]
blank = -1.0
overwrite = true
"#;
    let config = StageConfig::from_toml_str(toml).unwrap();
    assert_eq!(config.stage, "flat");
    assert_eq!(config.inputs.len(), 3);
    let c = &config.combine;
    assert_eq!(c.combine_method, CombineMethod::Mean);
    assert_eq!(c.scale, ScalingPolicy::Mode);
    assert_eq!(c.statsec, Some(StatSection::from([10, 90, 20, 80])));
    assert_eq!(c.blank, -1.0);
    assert!(c.overwrite);
    assert_eq!(
        c.rejection_policy(),
        RejectionPolicy::SigmaClip {
            low_sigma: 2.0,
            high_sigma: 2.5,
            max_iterations: 4
        }
    );
    let load = c.load_options();
    assert_eq!(load.blank, -1.0);
    assert_eq!(load.statsec, c.statsec);
}

#[test]
fn test_unknown_key_rejected() {
    let result = StageConfig::from_toml_str(
        r#"
output = "m.fits"
[combine]
sigma_low = 2.0
"#,
    );
    assert!(matches!(result, Err(MasterFrameError::InvalidConfig(_))));

    let result = StageConfig::from_toml_str(
        r#"
output = "m.fits"
outptu = "typo.fits"
"#,
    );
    assert!(matches!(result, Err(MasterFrameError::InvalidConfig(_))));
}

#[test]
fn test_unknown_method_rejected() {
    let result = StageConfig::from_toml_str(
        r#"
output = "m.fits"
[combine]
reject_method = "winsorize"
"#,
    );
    assert!(matches!(result, Err(MasterFrameError::InvalidConfig(_))));
}

#[test]
fn test_missing_output_rejected() {
    assert!(StageConfig::from_toml_str(r#"stage = "dark""#).is_err());
}

#[test]
fn test_toml_round_trip() {
    let mut config = StageConfig::new(
        "dark",
        vec!["d1.fits".into(), "d2.fits".into()],
        "master_dark.fits",
    );
    config.combine.reject_method = RejectMethod::Minmax;
    config.combine.nhigh = 2;
    config.combine.statsec = Some(StatSection::from([0, 4, 0, 4]));

    let text = config.to_toml_string().unwrap();
    let parsed = StageConfig::from_toml_str(&text).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_from_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("stage.toml");
    std::fs::write(&path, "stage = \"bias\"\noutput = \"out.fits\"\n").unwrap();
    let config = StageConfig::from_file(&path).unwrap();
    assert_eq!(config.output, PathBuf::from("out.fits"));
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn test_inactive_parameters_ignored() {
    // bad percentiles do not matter while minmax is selected
    let c = CombineConfig {
        reject_method: RejectMethod::Minmax,
        low_pct: 90.0,
        high_pct: 10.0,
        ..CombineConfig::default()
    };
    assert!(c.validate().is_ok());
    assert_eq!(c.rejection_policy(), RejectionPolicy::MinMax { nlow: 1, nhigh: 1 });
}

#[test]
fn test_validation_failures() {
    let bad = [
        CombineConfig {
            reject_method: RejectMethod::Sigclip,
            low_sigma: 0.0,
            ..CombineConfig::default()
        },
        CombineConfig {
            reject_method: RejectMethod::Pclip,
            low_pct: 60.0,
            high_pct: 40.0,
            ..CombineConfig::default()
        },
        CombineConfig {
            statsec: Some(StatSection::from([5, 5, 0, 2])),
            ..CombineConfig::default()
        },
        CombineConfig {
            blank: f32::NAN,
            ..CombineConfig::default()
        },
    ];
    for c in bad {
        assert!(matches!(c.validate(), Err(MasterFrameError::InvalidConfig(_))));
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

#[test]
fn test_display_names() {
    assert_eq!(RejectMethod::Pclip.to_string(), "pclip");
    assert_eq!(CombineMethod::Mean.to_string(), "Average");
    assert_eq!(ScalingPolicy::Mode.to_string(), "Mode");
    assert_eq!(PipelineStage::Combining.to_string(), "Combining");
    assert_eq!(
        RejectionPolicy::MinMax { nlow: 1, nhigh: 2 }.to_string(),
        "MinMax (nlow=1, nhigh=2)"
    );
}
