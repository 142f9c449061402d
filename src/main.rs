use gantry::cli::run;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    #[cfg(windows)]
    if let Err(code) = enable_ansi_support::enable_ansi_support() {
        log::debug!("ANSI support unavailable (error {})", code);
    }

    if let Err(e) = run() {
        // Anything that reaches here was not reported as a user error
        let error_str = e.to_string();
        if error_str.contains("database")
            || error_str.contains("SQLite")
            || error_str.contains("Failed to")
        {
            eprintln!("Internal error: {}", e);
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
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
