use env_logger::Env;

/// `RUST_LOG` when set, otherwise `info`. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_target(true)
        .try_init();
}
