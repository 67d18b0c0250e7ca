fn main() {
    if let Err(err) = sleepmate_lib::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
