use assert_cmd::Command;
use std::error::Error;
use tempfile::tempdir;

fn hhgap() -> Result<Command, Box<dyn Error>> {
    Ok(Command::cargo_bin("hhgap")?)
}

#[test]
fn init_then_run_writes_report() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let experiment = dir.path().join("exp.toml");
    let report = dir.path().join("out").join("run.json");

    hhgap()?.arg("init").arg(&experiment).assert().success();
    assert!(experiment.exists());

    // refuses to clobber without --force
    hhgap()?.arg("init").arg(&experiment).assert().failure();

    hhgap()?
        .args(["run", "--duration-ms", "20", "--set", "I_e=2000"])
        .arg("--experiment")
        .arg(&experiment)
        .arg("--output")
        .arg(&report)
        .assert()
        .success();

    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report)?)?;
    assert!(!value["spike_times_ms"].as_array().unwrap().is_empty());
    assert_eq!(value["samples"]["V_m"].as_array().unwrap().len(), 200);
    Ok(())
}

#[test]
fn pair_reports_rounds() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let report = dir.path().join("pair.json");

    hhgap()?
        .args(["pair", "--duration-ms", "5", "--weight", "2.5"])
        .arg("--output")
        .arg(&report)
        .assert()
        .success();

    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report)?)?;
    assert_eq!(value["weight"].as_f64(), Some(2.5));
    assert_eq!(value["rounds_per_slice"].as_array().unwrap().len(), 5);
    Ok(())
}

#[test]
fn bad_override_fails() -> Result<(), Box<dyn Error>> {
    hhgap()?
        .args(["run", "--duration-ms", "1", "--set", "tau_rise_ex=50"])
        .assert()
        .failure();
    Ok(())
}
