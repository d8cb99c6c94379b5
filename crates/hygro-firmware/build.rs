//! Bakes the `HYGRO_*` settings from `.env` or the build environment into the
//! firmware. Unset variables fall back to the defaults in `hygro-core`.

const SETTINGS: [&str; 4] = [
    "HYGRO_SAMPLE_INTERVAL_MS",
    "HYGRO_BUSY_POLL_RETRIES",
    "HYGRO_BUSY_POLL_DELAY_MS",
    "HYGRO_CALIBRATION_RETRIES",
];

fn main() {
    // A missing .env is fine, the process environment still applies.
    if let Ok(path) = dotenvy::dotenv() {
        println!("cargo:rerun-if-changed={}", path.display());
    }

    for key in SETTINGS {
        println!("cargo:rerun-if-env-changed={key}");
        if let Ok(value) = std::env::var(key) {
            println!("cargo:rustc-env={key}={value}");
        }
    }
}
