use crate::config::Config;
use crate::multipart::{ format_seconds, Form };
use crate::report::{ Report, StatsSummary, TrialResult };

use std::path::PathBuf;
use std::sync::{ Arc, Mutex, atomic::{ AtomicBool, Ordering } };
use std::thread::JoinHandle;
use std::time::Duration;
use isahc::{
    HttpClient,
    HttpClientBuilder,
    Request,
    config::Configurable,
    http::StatusCode,
    AsyncReadResponseExt,
};
use thiserror::Error;
use tokio::{ runtime::{ Builder, Runtime }, sync::Semaphore, time::Instant };

const FIELD_WIDTH: usize = 24; //  width of each field for formatting print

/// Failure of a single trial. Trials never abort the batch; an error here
/// is logged and the trial simply contributes no result.
#[derive(Debug, Error)]
pub enum TrialError {
    #[error("test audio file '{}' not found", .0.display())]
    MissingInput(PathBuf),
    #[error(transparent)] Io(#[from] std::io::Error),
    #[error(transparent)] Http(#[from] isahc::Error),
    #[error(transparent)] Request(#[from] isahc::http::Error),
    #[error("server responded with status {0}")] Status(StatusCode),
}

/// Runner structure with configuration and a shared report.
#[derive(Debug, Clone)]
pub struct Runner {
    config: Config,
    report: Arc<Mutex<Report>>, // final report
    client: HttpClient, // client for sending requests
}

impl Runner {
    /*------------------==| Public Functions |==-------------------------*/
    /// Create a new Runner instance
    pub fn new(config: Config) -> Self {
        let mut builder = HttpClientBuilder::new();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connection_timeout) = config.connection_timeout {
            builder = builder.connect_timeout(connection_timeout);
        }
        let client = builder.build().unwrap();

        let report = Report::new(config.requests);

        Self {
            config,
            report: Arc::new(Mutex::new(report)),
            client,
        }
    }

    /// Run the whole batch: fan out every trial at once, then wait for all
    /// of them to settle. One trial's failure never cancels the others.
    pub fn run(self) -> Self {
        let runtime = Self::get_runtime();

        // To share runner across different async tasks
        let runner = Arc::new(self);

        // to stop the timer thread when all of the requests are finished
        let stop_flag = Arc::new(AtomicBool::new(false));

        // Keeps report.duration current so the Ctrl+C report is accurate
        let timer_thread = Self::spawn_timer_thread(Arc::clone(&runner), stop_flag.clone());

        println!(
            "Sending {} concurrent request(s) to {}",
            runner.config.requests,
            runner.config.url
        );
        match runner.config.concurrency {
            Some(limit) => println!("using at most {} connection(s)\nPlease be patient..", limit),
            None => println!("with no concurrency limit\nPlease be patient.."),
        }

        runtime.block_on(async {
            // Optional cap on in-flight requests; the default is full fan-out
            let limiter = runner.config.concurrency.map(|limit| Arc::new(Semaphore::new(limit)));

            let mut handles = Vec::with_capacity(runner.config.requests);
            for trial_id in 0..runner.config.requests {
                let runner = Arc::clone(&runner);
                let limiter = limiter.clone();
                handles.push(
                    tokio::spawn(async move {
                        let _permit = match limiter.as_ref() {
                            Some(semaphore) => {
                                Some(semaphore.acquire().await.expect("semaphore closed"))
                            }
                            None => None,
                        };
                        runner.run_trial(trial_id).await;
                    })
                );
            }

            // join-all barrier with no short-circuit
            for handle in handles {
                let _ = handle.await;
            }
        });

        stop_flag.store(true, Ordering::Relaxed);
        let _ = timer_thread.join();

        // drop the runtime to release any references to runner
        drop(runtime);

        Arc::try_unwrap(runner).unwrap_or_else(|_|
            panic!("Runner instance still has active references.")
        )
    }

    /// Print the batch report. Nothing is printed when every trial failed.
    pub fn print_report(&self) {
        let report = self.report.lock().unwrap();
        let successes = report.successes();

        if successes.is_empty() {
            return;
        }

        let server_times: Vec<f64> = successes
            .iter()
            .map(|result| result.server_time)
            .collect();
        let total_times: Vec<f64> = successes
            .iter()
            .map(|result| result.total_time)
            .collect();

        print!("\n\n");
        println!("Processing statistics:");
        println!(
            "{:<field_width$}{:.2}s",
            "Total time taken:",
            report.duration.as_secs_f64(),
            field_width = FIELD_WIDTH
        );

        println!("\nServer processing time:");
        if let Some(stats) = StatsSummary::from_series(&server_times) {
            Self::print_stats_summary(&stats);
        }

        println!("\nTotal time per request (including network):");
        if let Some(stats) = StatsSummary::from_series(&total_times) {
            Self::print_stats_summary(&stats);
        }

        println!(
            "\n{:<field_width$}{}/{}",
            "Successful requests:",
            successes.len(),
            report.requested,
            field_width = FIELD_WIDTH
        );
    }

    /// Snapshot of the report collected so far.
    pub fn report(&self) -> Report {
        self.report.lock().unwrap().clone()
    }

    /*-------------------==| Private/Helpers |==----------------------- */

    /// Run one trial and record its outcome. Any failure is logged and
    /// swallowed here; the slot for this trial id simply stays empty.
    async fn run_trial(&self, trial_id: usize) {
        match self.execute_trial(trial_id).await {
            Ok(result) => {
                println!(
                    "Request {}: Total time: {:.2}s, Server processing: {:.2}s",
                    trial_id,
                    result.total_time,
                    result.server_time
                );
                let mut report = self.report.lock().unwrap();
                report.results[trial_id] = Some(result);
            }
            Err(err) => {
                eprintln!("Error in request {}: {}", trial_id, err);
            }
        }
    }

    /// One request/response/measurement cycle against the trim endpoint.
    async fn execute_trial(&self, trial_id: usize) -> Result<TrialResult, TrialError> {
        let input = &self.config.input;

        // checked per trial, not once per batch
        if !input.exists() {
            return Err(TrialError::MissingInput(input.clone()));
        }
        let audio = std::fs::read(input)?;
        let file_name = input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        let form = Form::new()
            .file("audio", &file_name, "audio/mpeg", &audio)
            .text("start_time", &format_seconds(self.config.start_time))
            .text("end_time", &format_seconds(self.config.end_time));

        let request = Request::post(self.config.url.as_str())
            .header("content-type", form.content_type())
            .body(form.into_body())?;

        let start = Instant::now();
        let mut response = self.client.send_async(request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrialError::Status(status));
        }

        // the round trip includes receiving the full trimmed audio
        let mut body = Vec::new();
        response.copy_to(&mut body).await?;
        let total_time = start.elapsed().as_secs_f64();

        let server_time = response
            .headers()
            .get("x-process-time")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<f64>().ok())
            .unwrap_or(0.0);

        let output_path = self.config.output_dir.join(format!("trimmed_output_{}.mp3", trial_id));
        std::fs::write(&output_path, &body)?;

        Ok(TrialResult { total_time, server_time })
    }

    /// To keep the elapsed time in the report current while trials run
    fn spawn_timer_thread(runner: Arc<Runner>, stop_flag: Arc<AtomicBool>) -> JoinHandle<()> {
        std::thread::spawn(move || {
            let start = Instant::now();

            loop {
                runner.report.lock().unwrap().duration = start.elapsed();
                if stop_flag.load(Ordering::Relaxed) {
                    return;
                }
                std::thread::sleep(Duration::from_millis(10));
            }
        })
    }

    /// Helper function to create the tokio runtime
    fn get_runtime() -> Runtime {
        Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("Failed to create tokio runtime")
    }

    fn print_stats_summary(stats: &StatsSummary) {
        println!("{:<field_width$}{:.2}s", "Average:", stats.average, field_width = FIELD_WIDTH);
        println!("{:<field_width$}{:.2}s", "Median:", stats.median, field_width = FIELD_WIDTH);
        println!("{:<field_width$}{:.2}s", "Min:", stats.min, field_width = FIELD_WIDTH);
        println!("{:<field_width$}{:.2}s", "Max:", stats.max, field_width = FIELD_WIDTH);
    }
}
