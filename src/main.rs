use salesline::cli::run;
use salesline::engine::{ErrorKind, PipelineError};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("SALESLINE_LOG", "warn")).init();
    let _ = enable_ansi_support::enable_ansi_support();

    if let Err(e) = run() {
        let rejected_write = matches!(
            e.downcast_ref::<PipelineError>().map(PipelineError::kind),
            Some(ErrorKind::Reconciliation)
        );
        let error_str: String = e.to_string();
        if rejected_write || error_str.contains("database") || error_str.contains("SQLite")
            || error_str.contains("Failed to") {
            eprintln!("Internal error: {}", e);
            // Show error chain if available
            let mut source = e.source();
            if source.is_some() {
                eprintln!("\nCaused by:");
                let mut indent = 1;
                while let Some(err) = source {
                    eprintln!("{:indent$}  {}", "", err);
                    source = err.source();
                    indent += 1;
                }
            }
            std::process::exit(2);
        } else {
            // User error
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
