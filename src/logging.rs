use std::fmt::Display;

use colored::Colorize;
use log::{Level, LevelFilter};

/// Dependencies only get to log warnings and errors
const ALLOWED_EXTERNAL_LEVELS: [Level; 2] = [Level::Warn, Level::Error];

pub fn init_logger(level: LevelFilter) -> Result<(), failure::Error> {
    fern::Dispatch::new()
        .format(move |out, message, record| {
            let target = Target::from_str(record.target());
            let now = chrono::Local::now();

            out.finish(format_args!(
                "{:^5} {} {:^8} {}",
                level_to_string(record.level()),
                now.format("%H:%M:%S").to_string().bright_black(),
                target,
                message
            ))
        })
        .filter(move |meta| {
            let target = Target::from_str(meta.target());

            let is_severe = ALLOWED_EXTERNAL_LEVELS.contains(&meta.level());

            target.is_local() && meta.level() <= level || is_severe
        })
        .chain(std::io::stdout())
        .apply()
        .map_err(|e| failure::format_err!("logger: {}", e))
}

enum Target {
    External(String),
    App,
    /// The web server itself, logged at the same level as the app
    Gotham,
}

impl Target {
    fn from_str(target: &str) -> Self {
        let module = target.split("::").next().unwrap_or(target);

        match module {
            "cafes" => Self::App,
            "gotham" => Self::Gotham,
            other => Target::External(other.to_string()),
        }
    }

    fn is_local(&self) -> bool {
        !matches!(self, Self::External(_))
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let result = match self {
            Target::External(x) => x.as_str().clear(),
            Target::App => "CAFES".bright_green(),
            Target::Gotham => "HTTP".blue(),
        };

        Display::fmt(&result, f)
    }
}

fn level_to_string(level: Level) -> String {
    match level {
        Level::Error => " ERR ".black().on_red().bold().to_string(),
        Level::Warn => " WRN ".black().on_yellow().bold().to_string(),
        Level::Info => " INF ".black().on_blue().bold().to_string(),
        Level::Debug => " DBG ".white().on_black().to_string(),
        Level::Trace => " TRC ".to_string(),
    }
}
