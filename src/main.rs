fn main() {
    if let Err(err) = flow_diagram_rs::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
