use trimbench::config::Config;
use trimbench::runner::Runner;

fn main() {
    let config = Config::parse();

    let runner = Runner::new(config);

    let runner_clone = runner.clone();

    ctrlc
        ::set_handler(move || {
            runner_clone.print_report();
            std::process::exit(0);
        })
        .expect("Error setting Ctrl+C handler");

    let runner = runner.run();
    runner.print_report();
}
