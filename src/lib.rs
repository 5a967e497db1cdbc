pub mod api;
pub mod core;

use once_cell::sync::OnceCell;

static LOGGER: OnceCell<()> = OnceCell::new();

pub fn init_logging() {
    LOGGER.get_or_init(|| {
        #[cfg(target_os = "android")]
        {
            android_logger::init_once(
                android_logger::Config::default()
                    .with_max_level(log::LevelFilter::Debug)
                    .with_tag("ambiguity_shield"),
            );
        }

        #[cfg(not(target_os = "android"))]
        {
            // 宿主可能已经装好了 logger，失败时忽略
            let _ = env_logger::Builder::from_env(
                env_logger::Env::default().default_filter_or("info"),
            )
            .try_init();
        }
    });
}
