use std::io::Write;

use log::LevelFilter;

/// 初始化日志
///
/// 默认 info 级别, `verbose` 打开 debug, `silent` 只保留警告和错误。
/// 设置了 `RUST_LOG` 时以环境变量为准。
pub fn init_logger(verbose: bool, silent: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else if silent {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .try_init();
}
