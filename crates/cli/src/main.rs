fn main() {
    if let Err(e) = modulizer_cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
