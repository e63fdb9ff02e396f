use std::{error::Error, io::Write};

use kkp_core::resources::crd::all_crds;

fn main() -> Result<(), Box<dyn Error>> {
    let mut stdout = std::io::stdout().lock();

    for crd in all_crds() {
        writeln!(stdout, "---")?;
        write!(stdout, "{}", serde_yaml::to_string(&crd)?)?;
    }

    Ok(())
}
