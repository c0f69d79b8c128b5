fn main() {
    if let Err(err) = techdemo::run() {
        eprintln!("Application error: {err}");
    }
}
