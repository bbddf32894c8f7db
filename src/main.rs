fn main() {
    if let Err(e) = tamil_thulir_lib::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
