fn main() {
    let args: Vec<String> = std::env::args().collect();
    if let Err(err) = l2unity::run(&args) {
        eprintln!("l2unity: {}", err);
        std::process::exit(1);
    }
}
