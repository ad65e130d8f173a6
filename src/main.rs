fn main() {
    if let Err(err) = ledger_typer::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
