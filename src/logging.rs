use std::io::Write;

use chrono::Local;
use env_logger::Builder;

/// Install the stderr logger for the binaries. Filter defaults to `info`,
/// overridable through `RUST_LOG`.
pub fn init_logger() {
    Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {:<5} {}: {}",
                Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
