fn main() {
    let exit_code = match sbuild::run() {
        Ok(code) => code,
        Err(err) => {
            println!("sbuild: error: {:#}", err);
            1
        }
    };
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}
