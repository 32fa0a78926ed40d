use chrono::{DateTime, Local};
use once_cell::sync::Lazy;

static VERSION_INFO: Lazy<String> = Lazy::new(|| {
    format!(
        "chime-voicebot {}\n\
     Build Time: {}\n\
     Git Commit: {}\n\
     Git Status: {}",
        env!("CARGO_PKG_VERSION"),
        build_time("%Y-%m-%d %H:%M:%S %Z"),
        env!("GIT_COMMIT_HASH"),
        env!("GIT_DIRTY"),
    )
});

static SHORT_VERSION: Lazy<String> = Lazy::new(|| {
    let version = env!("CARGO_PKG_VERSION");
    let git_commit = env!("GIT_COMMIT_HASH");
    if env!("GIT_DIRTY") == "dirty" {
        format!("{}-{}-dirty", version, git_commit)
    } else {
        format!("{}-{}", version, git_commit)
    }
});

static USERAGENT: Lazy<String> = Lazy::new(|| {
    format!(
        "chime-voicebot/{} (built {})",
        env!("CARGO_PKG_VERSION"),
        build_time("%Y-%m-%d")
    )
});

fn build_time(format: &str) -> String {
    let build_timestamp: i64 = env!("BUILD_TIME").parse().unwrap_or(0);
    let build_datetime: DateTime<Local> = DateTime::from_timestamp(build_timestamp, 0)
        .map(|utc| utc.with_timezone(&Local))
        .unwrap_or_else(Local::now);
    build_datetime.format(format).to_string()
}

pub fn get_version_info() -> &'static str {
    VERSION_INFO.as_str()
}

pub fn get_short_version() -> &'static str {
    SHORT_VERSION.as_str()
}

pub fn get_useragent() -> &'static str {
    USERAGENT.as_str()
}
