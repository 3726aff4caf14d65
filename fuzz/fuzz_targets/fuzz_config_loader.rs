#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validate must reject bad input without panicking.
    let Ok(cfg) = hydro_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_ok() {
        assert!(cfg.water_level.lower_pct < cfg.water_level.upper_pct);
        assert!(cfg.smoothing.tds_window >= 1);
        assert!(cfg.control.cycle_ms > cfg.hardware.echo_timeout_ms);
    }
});
