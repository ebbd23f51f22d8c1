use std::env;
use std::path::PathBuf;
use std::time::Duration;
use std::{ slice::Iter, iter::Skip };
use url::Url;

// Error messages
const ERR_INVALID_REQUESTS: &str = "Invalid number of requests\nUse --help for more info";
const ERR_INVALID_CONCURRENCY: &str =
    "Invalid number of concurrent requests\nUse --help for more info";
const ERR_INVALID_TIMEOUT: &str = "Invalid value for timeout\nUse --help for more info";
const ERR_INVALID_CONNECTION_TIMEOUT: &str =
    "Invalid value for connection-timeout\nUse --help for more info";
const ERR_INVALID_URL: &str = "Invalid URL\nUse --help for more info";
const ERR_INVALID_INPUT: &str = "Invalid value for input\nUse --help for more info";
const ERR_INVALID_OUTPUT_DIR: &str = "Invalid value for output-dir\nUse --help for more info";
const ERR_INVALID_TRIM_TIME: &str = "Invalid trim time\nUse --help for more info";
const ERR_INVALID_TRIM_WINDOW: &str =
    "Trim end time must be greater than start time\nUse --help for more info";

// The count used when no positional argument is given (or it is not a number)
const DEFAULT_REQUESTS: usize = 100;

// Parsed arguments for the CLI
#[derive(Debug, Clone)]
pub struct Config {
    pub requests: usize, // number of trim requests to send

    pub url: String, // trim endpoint
    pub input: PathBuf, // audio file uploaded on every request
    pub output_dir: PathBuf, // where trimmed_output_<id>.mp3 files are written

    pub start_time: f64, // trim window start in seconds
    pub end_time: f64, // trim window end in seconds

    pub concurrency: Option<usize>, // max requests in flight (None = all at once)
    pub timeout: Option<Duration>, // total time for request/response cycle including DNS resolution
    pub connection_timeout: Option<Duration>, // timeout for establishing connection to the host
}

// Defaults mirror the service's local development setup
impl Default for Config {
    fn default() -> Self {
        Config {
            requests: DEFAULT_REQUESTS,
            url: "http://localhost:8000/api/audios/trim/".to_string(),
            input: PathBuf::from("test_audio.m4a"),
            output_dir: PathBuf::from("."),
            start_time: 5.0,
            end_time: 10.0,
            concurrency: None,
            timeout: None,
            connection_timeout: None,
        }
    }
}

impl Config {
    /*-------------------- Public Functions -------------------*/
    pub fn parse() -> Config {
        let args: Vec<String> = env::args().collect();
        Self::parse_from(&args)
    }

    pub fn print_help() {
        let name = env!("CARGO_PKG_NAME");
        println!("Usage: {} [OPTIONS] [COUNT]", name);
        println!();
        println!("Concurrent load tester for an audio trim endpoint");
        println!();
        println!("Options:");
        println!("  -u, --url                <URL>   Trim endpoint (Default: http://localhost:8000/api/audios/trim/)");
        println!("  -i, --input              <PATH>  Audio file to upload (Default: test_audio.m4a)");
        println!("  -o, --output-dir         <PATH>  Directory for trimmed output files (Default: .)");
        println!("  -c, --concurrency        <N>     Max requests in flight (Default: unlimited)");
        println!("  -S, --start-time         <SECS>  Trim window start (Default: 5)");
        println!("  -E, --end-time           <SECS>  Trim window end (Default: 10)");
        println!("  -T, --timeout            <D>     Request timeout (Default: none)");
        println!("  -C, --connection-timeout <D>     Connection timeout (Default: none)");
        println!("  -h, --help                       Print help (this)");
        println!("  -v, --version                    Print version");
        println!();
        println!("Arguments:");
        println!("  [COUNT]                          Number of requests to send (Default: 100)");
        println!();
        println!("Durations can be specified like: 10s, 1m, 1h");
    }

    /*---------------- Private/Helpers ------------------*/
    fn parse_from(args: &[String]) -> Config {
        let mut parsed_config = Self::default();

        let mut args_iter = args.iter().skip(1); // skip the first argument
        let mut count_provided = false; // so the positional count is not taken more than once

        while let Some(arg) = args_iter.next() {
            if Self::handle_help(arg) || Self::handle_version(arg) {
                // check for -h / --help  and -v / --version flags
                std::process::exit(0);
            }

            if
                Self::handle_url(&mut parsed_config, arg, &mut args_iter) ||
                Self::handle_input(&mut parsed_config, arg, &mut args_iter) ||
                Self::handle_output_dir(&mut parsed_config, arg, &mut args_iter) ||
                Self::handle_concurrency(&mut parsed_config, arg, &mut args_iter) ||
                Self::handle_start_time(&mut parsed_config, arg, &mut args_iter) ||
                Self::handle_end_time(&mut parsed_config, arg, &mut args_iter) ||
                Self::handle_timeout(&mut parsed_config, arg, &mut args_iter) ||
                Self::handle_connection_timeout(&mut parsed_config, arg, &mut args_iter) ||
                Self::handle_count(&mut parsed_config, arg, &mut count_provided)
            {
                continue;
            } else {
                Self::print_help();
                std::process::exit(1);
            }
        }

        if parsed_config.start_time < 0.0 {
            eprintln!("{}", ERR_INVALID_TRIM_TIME);
            std::process::exit(1);
        }

        if parsed_config.end_time <= parsed_config.start_time {
            eprintln!("{}", ERR_INVALID_TRIM_WINDOW);
            std::process::exit(1);
        }

        parsed_config
    }

    fn handle_url(
        parsed_config: &mut Config,
        arg: &str,
        args_iter: &mut Skip<Iter<String>>
    ) -> bool {
        if arg.starts_with("-u") || arg.starts_with("--url") {
            Self::parse_url(parsed_config, arg, args_iter);
            true
        } else {
            false
        }
    }

    fn handle_input(
        parsed_config: &mut Config,
        arg: &str,
        args_iter: &mut Skip<Iter<String>>
    ) -> bool {
        if arg.starts_with("-i") || arg.starts_with("--input") {
            Self::parse_input(parsed_config, arg, args_iter);
            true
        } else {
            false
        }
    }

    fn handle_output_dir(
        parsed_config: &mut Config,
        arg: &str,
        args_iter: &mut Skip<Iter<String>>
    ) -> bool {
        if arg.starts_with("-o") || arg.starts_with("--output-dir") {
            Self::parse_output_dir(parsed_config, arg, args_iter);
            true
        } else {
            false
        }
    }

    fn handle_concurrency(
        parsed_config: &mut Config,
        arg: &str,
        args_iter: &mut Skip<Iter<String>>
    ) -> bool {
        if arg.starts_with("-c") || arg.starts_with("--concurrency") {
            Self::parse_concurrency(parsed_config, arg, args_iter);
            true
        } else {
            false
        }
    }

    fn handle_start_time(
        parsed_config: &mut Config,
        arg: &str,
        args_iter: &mut Skip<Iter<String>>
    ) -> bool {
        if arg.starts_with("-S") || arg.starts_with("--start-time") {
            parsed_config.start_time = Self::parse_seconds(arg, "-S", "--start-time", args_iter);
            true
        } else {
            false
        }
    }

    fn handle_end_time(
        parsed_config: &mut Config,
        arg: &str,
        args_iter: &mut Skip<Iter<String>>
    ) -> bool {
        if arg.starts_with("-E") || arg.starts_with("--end-time") {
            parsed_config.end_time = Self::parse_seconds(arg, "-E", "--end-time", args_iter);
            true
        } else {
            false
        }
    }

    fn handle_timeout(
        parsed_config: &mut Config,
        arg: &str,
        args_iter: &mut Skip<Iter<String>>
    ) -> bool {
        if arg.starts_with("-T") || arg.starts_with("--timeout") {
            Self::parse_timeout(parsed_config, arg, args_iter);
            true
        } else {
            false
        }
    }

    fn handle_connection_timeout(
        parsed_config: &mut Config,
        arg: &str,
        args_iter: &mut Skip<Iter<String>>
    ) -> bool {
        if arg.starts_with("-C") || arg.starts_with("--connection-timeout") {
            Self::parse_connection_timeout(parsed_config, arg, args_iter);
            true
        } else {
            false
        }
    }

    fn handle_help(arg: &str) -> bool {
        if arg == "-h" || arg == "--help" {
            Self::print_help();
            true
        } else {
            false
        }
    }

    fn handle_version(arg: &str) -> bool {
        if arg == "-v" || arg == "--version" {
            let name = env!("CARGO_PKG_NAME");
            let version = env!("CARGO_PKG_VERSION");
            println!("{} {}", name, version);
            true
        } else {
            false
        }
    }

    // Positional request count; "-5" style negatives also land here so they
    // error as a count rather than as an unknown flag
    fn handle_count(parsed_config: &mut Config, arg: &str, count_provided: &mut bool) -> bool {
        if *count_provided {
            return false;
        }
        if arg.starts_with('-') && arg.parse::<i64>().is_err() {
            return false;
        }

        match arg.parse::<i64>() {
            Ok(count) if count <= 0 => {
                eprintln!("{}", ERR_INVALID_REQUESTS);
                std::process::exit(1);
            }
            Ok(count) => {
                parsed_config.requests = count as usize;
            }
            // not a number: fall back to the default count
            Err(_) => {
                parsed_config.requests = DEFAULT_REQUESTS;
            }
        }
        *count_provided = true;
        true
    }

    fn parse_url(parsed_config: &mut Config, arg: &str, args_iter: &mut Skip<Iter<String>>) {
        let url = if let Some(strip) = arg.strip_prefix("--url") {
            Self::parse_with_next_string(args_iter, strip, ERR_INVALID_URL)
        } else if let Some(strip) = arg.strip_prefix("-u") {
            Self::parse_with_next_string(args_iter, strip, ERR_INVALID_URL)
        } else {
            eprintln!("{}", ERR_INVALID_URL);
            std::process::exit(1);
        };

        // Check if the url is correct
        if Url::parse(&url).is_err() {
            println!("\"{}\"\n{}", url, ERR_INVALID_URL);
            std::process::exit(1);
        }
        parsed_config.url = url;
    }

    fn parse_input(parsed_config: &mut Config, arg: &str, args_iter: &mut Skip<Iter<String>>) {
        let input = if let Some(strip) = arg.strip_prefix("--input") {
            Self::parse_with_next_string(args_iter, strip, ERR_INVALID_INPUT)
        } else if let Some(strip) = arg.strip_prefix("-i") {
            Self::parse_with_next_string(args_iter, strip, ERR_INVALID_INPUT)
        } else {
            eprintln!("{}", ERR_INVALID_INPUT);
            std::process::exit(1);
        };
        parsed_config.input = PathBuf::from(input);
    }

    fn parse_output_dir(parsed_config: &mut Config, arg: &str, args_iter: &mut Skip<Iter<String>>) {
        let dir = if let Some(strip) = arg.strip_prefix("--output-dir") {
            Self::parse_with_next_string(args_iter, strip, ERR_INVALID_OUTPUT_DIR)
        } else if let Some(strip) = arg.strip_prefix("-o") {
            Self::parse_with_next_string(args_iter, strip, ERR_INVALID_OUTPUT_DIR)
        } else {
            eprintln!("{}", ERR_INVALID_OUTPUT_DIR);
            std::process::exit(1);
        };
        parsed_config.output_dir = PathBuf::from(dir);
    }

    fn parse_concurrency(
        parsed_config: &mut Config,
        arg: &str,
        args_iter: &mut Skip<Iter<String>>
    ) {
        let concurrency: usize = if let Some(strip) = arg.strip_prefix("--concurrency") {
            strip
                .parse()
                .unwrap_or_else(|_|
                    Self::parse_with_next_usize(args_iter, strip, ERR_INVALID_CONCURRENCY)
                )
        } else if let Some(strip) = arg.strip_prefix("-c") {
            strip
                .parse()
                .unwrap_or_else(|_|
                    Self::parse_with_next_usize(args_iter, strip, ERR_INVALID_CONCURRENCY)
                )
        } else {
            eprintln!("{}", ERR_INVALID_CONCURRENCY);
            std::process::exit(1);
        };

        if concurrency == 0 {
            eprintln!("{}", ERR_INVALID_CONCURRENCY);
            std::process::exit(1);
        }
        parsed_config.concurrency = Some(concurrency);
    }

    fn parse_seconds(
        arg: &str,
        short: &str,
        long: &str,
        args_iter: &mut Skip<Iter<String>>
    ) -> f64 {
        let seconds: f64 = if let Some(strip) = arg.strip_prefix(long) {
            strip
                .parse()
                .unwrap_or_else(|_|
                    Self::parse_with_next_f64(args_iter, strip, ERR_INVALID_TRIM_TIME)
                )
        } else if let Some(strip) = arg.strip_prefix(short) {
            strip
                .parse()
                .unwrap_or_else(|_|
                    Self::parse_with_next_f64(args_iter, strip, ERR_INVALID_TRIM_TIME)
                )
        } else {
            eprintln!("{}", ERR_INVALID_TRIM_TIME);
            std::process::exit(1);
        };

        if !seconds.is_finite() {
            eprintln!("{}", ERR_INVALID_TRIM_TIME);
            std::process::exit(1);
        }
        seconds
    }

    // for -c 10 (space between flag and value)
    fn parse_with_next_usize(
        args_iter: &mut Skip<Iter<String>>,
        strip: &str,
        error_msg: &str
    ) -> usize {
        if !strip.is_empty() {
            eprintln!("{}", error_msg); // other (invalid) characters were written after the flag
            std::process::exit(1);
        }
        args_iter
            .next()
            .and_then(|next| next.parse().ok())
            .unwrap_or_else(|| {
                eprintln!("{}", error_msg);
                std::process::exit(1);
            })
    }

    fn parse_with_next_f64(
        args_iter: &mut Skip<Iter<String>>,
        strip: &str,
        error_msg: &str
    ) -> f64 {
        if !strip.is_empty() {
            eprintln!("{}", error_msg); // other (invalid) characters were written after the flag
            std::process::exit(1);
        }
        args_iter
            .next()
            .and_then(|next| next.parse().ok())
            .unwrap_or_else(|| {
                eprintln!("{}", error_msg);
                std::process::exit(1);
            })
    }

    fn parse_with_next_string(
        args_iter: &mut Skip<Iter<String>>,
        strip: &str,
        error_msg: &str
    ) -> String {
        if !strip.is_empty() {
            // value was attached to the flag, e.g. -oresults
            return strip.to_string();
        }
        args_iter
            .next()
            .cloned()
            .unwrap_or_else(|| {
                eprintln!("{}", error_msg);
                std::process::exit(1);
            })
    }

    /* ----Durations ----*/
    fn parse_timeout(parsed_config: &mut Config, arg: &str, args_iter: &mut Skip<Iter<String>>) {
        let duration_str = if let Some(strip) = arg.strip_prefix("--timeout") {
            Self::parse_with_next_string(args_iter, strip, ERR_INVALID_TIMEOUT)
        } else if let Some(strip) = arg.strip_prefix("-T") {
            Self::parse_with_next_string(args_iter, strip, ERR_INVALID_TIMEOUT)
        } else {
            eprintln!("{}", ERR_INVALID_TIMEOUT);
            std::process::exit(1);
        };
        let timeout = Self::parse_duration_string(&duration_str, ERR_INVALID_TIMEOUT);
        if timeout.as_secs() == 0 {
            eprintln!("{}", ERR_INVALID_TIMEOUT);
            std::process::exit(1);
        }
        parsed_config.timeout = Some(timeout);
    }

    fn parse_connection_timeout(
        parsed_config: &mut Config,
        arg: &str,
        args_iter: &mut Skip<Iter<String>>
    ) {
        let duration_str = if let Some(strip) = arg.strip_prefix("--connection-timeout") {
            Self::parse_with_next_string(args_iter, strip, ERR_INVALID_CONNECTION_TIMEOUT)
        } else if let Some(strip) = arg.strip_prefix("-C") {
            Self::parse_with_next_string(args_iter, strip, ERR_INVALID_CONNECTION_TIMEOUT)
        } else {
            eprintln!("{}", ERR_INVALID_CONNECTION_TIMEOUT);
            std::process::exit(1);
        };
        let timeout = Self::parse_duration_string(&duration_str, ERR_INVALID_CONNECTION_TIMEOUT);
        if timeout.as_secs() == 0 {
            eprintln!("{}", ERR_INVALID_CONNECTION_TIMEOUT);
            std::process::exit(1);
        }
        parsed_config.connection_timeout = Some(timeout);
    }

    // Parses the duration string and returns Duration struct
    fn parse_duration_string(duration_str: &str, error_msg: &str) -> Duration {
        // nothing specified after -T or --timeout
        if duration_str.is_empty() {
            eprintln!("{}", error_msg);
            std::process::exit(1);
        }

        // if no unit is provided use seconds "s"
        let duration_str: String = if
            duration_str.ends_with('s') ||
            duration_str.ends_with('m') ||
            duration_str.ends_with('h')
        {
            duration_str.to_string()
        } else {
            format!("{}s", duration_str)
        };

        // split into value and unit for (s, m, h)
        let (value_str, unit) = duration_str.split_at(duration_str.len() - 1);
        let value: u64 = value_str.parse().unwrap_or_else(|_| {
            eprintln!("{}", error_msg);
            std::process::exit(1);
        });

        match unit {
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value * 60),
            "h" => Duration::from_secs(value * 60 * 60),
            _ => Duration::from_secs(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut full: Vec<String> = vec!["trimbench".to_string()];
        full.extend(args.iter().map(|a| a.to_string()));
        Config::parse_from(&full)
    }

    #[test]
    fn defaults_when_no_arguments() {
        let config = parse(&[]);
        assert_eq!(config.requests, 100);
        assert_eq!(config.url, "http://localhost:8000/api/audios/trim/");
        assert_eq!(config.input, PathBuf::from("test_audio.m4a"));
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.start_time, 5.0);
        assert_eq!(config.end_time, 10.0);
        assert_eq!(config.concurrency, None);
        assert_eq!(config.timeout, None);
        assert_eq!(config.connection_timeout, None);
    }

    #[test]
    fn positional_count_is_parsed() {
        let config = parse(&["25"]);
        assert_eq!(config.requests, 25);
    }

    #[test]
    fn non_numeric_count_falls_back_to_default() {
        let config = parse(&["lots"]);
        assert_eq!(config.requests, 100);
    }

    #[test]
    fn concurrency_attached_and_spaced_forms() {
        assert_eq!(parse(&["-c5"]).concurrency, Some(5));
        assert_eq!(parse(&["-c", "8"]).concurrency, Some(8));
        assert_eq!(parse(&["--concurrency", "3"]).concurrency, Some(3));
    }

    #[test]
    fn trim_window_flags() {
        let config = parse(&["-S", "2.5", "-E", "7"]);
        assert_eq!(config.start_time, 2.5);
        assert_eq!(config.end_time, 7.0);
    }

    #[test]
    fn timeout_duration_units() {
        assert_eq!(parse(&["-T", "10s"]).timeout, Some(Duration::from_secs(10)));
        assert_eq!(parse(&["--timeout", "1m"]).timeout, Some(Duration::from_secs(60)));
        assert_eq!(parse(&["-C", "30"]).connection_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn url_and_paths() {
        let config = parse(&["-u", "http://127.0.0.1:9000/trim/", "-i", "clip.m4a", "-o", "out"]);
        assert_eq!(config.url, "http://127.0.0.1:9000/trim/");
        assert_eq!(config.input, PathBuf::from("clip.m4a"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn count_mixes_with_flags() {
        let config = parse(&["-c", "4", "12", "-T", "5s"]);
        assert_eq!(config.requests, 12);
        assert_eq!(config.concurrency, Some(4));
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }
}
