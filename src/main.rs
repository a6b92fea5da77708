use std::io::Read;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "tellsweep",
    about = "Score prose for detector-tell patterns and suggest edits",
    version
)]
struct Cli {
    /// File paths to analyze (reads stdin if none provided)
    files: Vec<String>,
    /// Reference sample of the author's own writing
    #[arg(long, value_name = "PATH")]
    style_sample: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let sample = cli.style_sample.as_deref().map(|path| {
        std::fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("Error reading {path}: {e}");
            std::process::exit(1);
        })
    });

    if cli.files.is_empty() {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .expect("Failed to read stdin");
        report(&input, sample.as_deref());
    } else {
        for path in &cli.files {
            let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("Error reading {path}: {e}");
                std::process::exit(1);
            });
            report(&text, sample.as_deref());
        }
    }
}

fn report(text: &str, sample: Option<&str>) {
    match tellsweep::analyze(text, sample) {
        Ok(result) => println!("{}", serde_json::to_string_pretty(&result).unwrap()),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
