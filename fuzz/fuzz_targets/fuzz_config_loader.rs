#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation must reject bad input with errors, never panic.
    if let Ok(mut cfg) = toml::from_str::<scale_config::Config>(data) {
        let _ = cfg.validate();
        // Env overrides go through the same list/integer parsing as the file.
        let _ = cfg.apply_env(|_| Some(data.to_string()));
        let _ = cfg.validate();
    }
});
